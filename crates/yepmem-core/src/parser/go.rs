//! Go symbol extraction.
//!
//! Functions, methods (named `Receiver.method`), type declarations
//! (struct/interface/alias), and package-level const/var specs. Visibility
//! follows the exported-identifier convention: an uppercase first letter is
//! public.

use tree_sitter::Node;

use crate::model::{Symbol, SymbolMetadata, SymbolType};

use super::{doc_comment, line_span, node_text, push_unique, referenced_imports};

pub(crate) fn extract(path: &str, source: &str, root: Node) -> Vec<Symbol> {
    let file_imports = collect_file_imports(root, source);
    let mut symbols = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "function_declaration" => {
                if let Some(symbol) = function_symbol(path, source, child, None, &file_imports) {
                    symbols.push(symbol);
                }
            }
            "method_declaration" => {
                let receiver = receiver_type(child, source);
                if let Some(symbol) =
                    function_symbol(path, source, child, receiver.as_deref(), &file_imports)
                {
                    symbols.push(symbol);
                }
            }
            "type_declaration" => {
                extract_type_specs(path, source, child, &file_imports, &mut symbols);
            }
            "const_declaration" | "var_declaration" => {
                extract_value_specs(path, source, child, &file_imports, &mut symbols);
            }
            _ => {}
        }
    }

    symbols
}

fn function_symbol(
    path: &str,
    source: &str,
    node: Node,
    receiver: Option<&str>,
    file_imports: &[String],
) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let base_name = node_text(name_node, source).to_string();
    let name = match receiver {
        Some(recv) => format!("{}.{}", recv, base_name),
        None => base_name.clone(),
    };

    let mut metadata = metadata_from_name(&base_name);
    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        let list: Vec<String> = params
            .named_children(&mut cursor)
            .map(|p| node_text(p, source).to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !list.is_empty() {
            metadata.parameters = Some(list);
        }
    }
    if let Some(result) = node.child_by_field_name("result") {
        metadata.return_type = Some(node_text(result, source).to_string());
    }
    if let Some(type_params) = node.child_by_field_name("type_parameters") {
        let mut cursor = type_params.walk();
        let list: Vec<String> = type_params
            .named_children(&mut cursor)
            .map(|p| node_text(p, source).to_string())
            .collect();
        if !list.is_empty() {
            metadata.generic_params = Some(list);
        }
    }

    let (start_line, end_line) = line_span(node);
    Some(Symbol {
        name,
        symbol_type: if receiver.is_some() {
            SymbolType::Method
        } else {
            SymbolType::Function
        },
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(node, source).to_string(),
        doc: doc_comment(node, source),
        calls: collect_calls(node, source),
        imports: referenced_imports(node, source, file_imports),
        metadata,
    })
}

/// Receiver base type (`(s *Server)` -> `Server`).
fn receiver_type(method: Node, source: &str) -> Option<String> {
    let receiver = method.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    for param in receiver.named_children(&mut cursor) {
        if let Some(type_node) = param.child_by_field_name("type") {
            let text = node_text(type_node, source).trim_start_matches('*');
            // Generic receivers like Stack[T] keep only the base name
            let base = text.split('[').next().unwrap_or(text);
            if !base.is_empty() {
                return Some(base.to_string());
            }
        }
    }
    None
}

fn extract_type_specs(
    path: &str,
    source: &str,
    decl: Node,
    file_imports: &[String],
    out: &mut Vec<Symbol>,
) {
    let mut cursor = decl.walk();
    for spec in decl.named_children(&mut cursor) {
        if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let symbol_type = match spec.child_by_field_name("type").map(|t| t.kind()) {
            Some("struct_type") => SymbolType::Class,
            Some("interface_type") => SymbolType::Interface,
            _ => SymbolType::TypeAlias,
        };

        let (start_line, end_line) = line_span(decl);
        out.push(Symbol {
            name: name.clone(),
            symbol_type,
            path: path.to_string(),
            start_line,
            end_line,
            body: node_text(decl, source).to_string(),
            doc: doc_comment(decl, source),
            calls: Vec::new(),
            imports: referenced_imports(spec, source, file_imports),
            metadata: metadata_from_name(&name),
        });
    }
}

fn extract_value_specs(
    path: &str,
    source: &str,
    decl: Node,
    file_imports: &[String],
    out: &mut Vec<Symbol>,
) {
    let is_const = decl.kind() == "const_declaration";
    let mut cursor = decl.walk();
    for spec in decl.named_children(&mut cursor) {
        if spec.kind() != "const_spec" && spec.kind() != "var_spec" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let (start_line, end_line) = line_span(decl);
        out.push(Symbol {
            name: name.clone(),
            symbol_type: if is_const {
                SymbolType::Constant
            } else {
                SymbolType::Variable
            },
            path: path.to_string(),
            start_line,
            end_line,
            body: node_text(decl, source).to_string(),
            doc: doc_comment(decl, source),
            calls: collect_calls(spec, source),
            imports: referenced_imports(spec, source, file_imports),
            metadata: metadata_from_name(&name),
        });
    }
}

fn metadata_from_name(name: &str) -> SymbolMetadata {
    let exported = name.chars().next().is_some_and(|c| c.is_uppercase());
    SymbolMetadata {
        visibility: Some(if exported { "public" } else { "private" }.to_string()),
        is_exported: Some(exported),
        ..SymbolMetadata::default()
    }
}

fn collect_calls(node: Node, source: &str) -> Vec<String> {
    let mut calls = Vec::new();
    collect_calls_into(node, source, &mut calls);
    calls
}

fn collect_calls_into(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "call_expression" {
        if let Some(func) = node.child_by_field_name("function") {
            match func.kind() {
                "identifier" => push_unique(out, node_text(func, source).to_string()),
                "selector_expression" => {
                    if let Some(field) = func.child_by_field_name("field") {
                        push_unique(out, node_text(field, source).to_string());
                    }
                }
                _ => {}
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls_into(child, source, out);
    }
}

/// Package names bound by the import block (`"net/http"` binds `http`).
fn collect_file_imports(root: Node, source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "import_declaration" {
            continue;
        }
        collect_import_specs(child, source, &mut imports);
    }
    imports
}

fn collect_import_specs(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "import_spec" {
        if let Some(alias) = node.child_by_field_name("name") {
            push_unique(out, node_text(alias, source).to_string());
            return;
        }
        if let Some(path_node) = node.child_by_field_name("path") {
            let path = node_text(path_node, source).trim_matches('"');
            if let Some(package) = path.rsplit('/').next() {
                push_unique(out, package.to_string());
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_import_specs(child, source, out);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::SymbolType;
    use crate::parser::{ParserRegistry, SupportedLanguage};

    fn parse(source: &str) -> Vec<crate::model::Symbol> {
        ParserRegistry::new().parse_source("pkg/server.go", source, SupportedLanguage::Go)
    }

    #[test]
    fn function_and_method() {
        let source = r#"
package pkg

func Run() error { return start() }

func (s *Server) Handle(w io.Writer) { s.log(w) }
"#;
        let symbols = parse(source);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Run", "Server.Handle"]);
        assert_eq!(symbols[0].calls, vec!["start"]);
        assert_eq!(symbols[1].symbol_type, SymbolType::Method);
        assert_eq!(symbols[1].calls, vec!["log"]);
    }

    #[test]
    fn struct_and_interface() {
        let source = r#"
package pkg

type Server struct { addr string }

type Handler interface { Serve() }

type ID = string
"#;
        let symbols = parse(source);
        let kinds: Vec<_> = symbols.iter().map(|s| s.symbol_type).collect();
        assert_eq!(
            kinds,
            vec![SymbolType::Class, SymbolType::Interface, SymbolType::TypeAlias]
        );
    }

    #[test]
    fn exported_convention() {
        let symbols = parse("package pkg\n\nfunc Public() {}\n\nfunc private() {}\n");
        assert_eq!(symbols[0].metadata.is_exported, Some(true));
        assert_eq!(symbols[1].metadata.is_exported, Some(false));
    }

    #[test]
    fn doc_comment_above_declaration() {
        let source = "package pkg\n\n// Run starts the server.\nfunc Run() {}\n";
        let symbols = parse(source);
        assert_eq!(symbols[0].doc.as_deref(), Some("Run starts the server."));
    }

    #[test]
    fn consts_and_vars() {
        let source = "package pkg\n\nconst Limit = 10\n\nvar counter int\n";
        let symbols = parse(source);
        assert_eq!(symbols[0].symbol_type, SymbolType::Constant);
        assert_eq!(symbols[1].symbol_type, SymbolType::Variable);
    }

    #[test]
    fn imports_use_package_name() {
        let source = r#"
package pkg

import (
    "fmt"
    "net/http"
)

func Serve() { http.ListenAndServe(":80", nil) }
"#;
        let symbols = parse(source);
        assert_eq!(symbols[0].imports, vec!["http"]);
    }
}
