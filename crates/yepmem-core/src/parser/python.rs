//! Python symbol extraction.
//!
//! Emits module-level functions, classes with their `Class.method` members,
//! and module-level assignments. Docstrings stand in for doc comments, and
//! visibility follows the underscore naming convention.

use tree_sitter::Node;

use crate::model::{Symbol, SymbolMetadata, SymbolType};

use super::{doc_comment, line_span, node_text, push_unique, referenced_imports};

pub(crate) fn extract(path: &str, source: &str, root: Node) -> Vec<Symbol> {
    let file_imports = collect_file_imports(root, source);
    let mut symbols = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        extract_statement(path, source, child, child, &file_imports, None, &mut symbols);
    }

    symbols
}

/// Extract one statement; `class_name` is set when walking a class body.
fn extract_statement(
    path: &str,
    source: &str,
    node: Node,
    anchor: Node,
    file_imports: &[String],
    class_name: Option<&str>,
    out: &mut Vec<Symbol>,
) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                extract_statement(path, source, definition, anchor, file_imports, class_name, out);
            }
        }
        "function_definition" => {
            if let Some(symbol) =
                function_symbol(path, source, node, anchor, file_imports, class_name)
            {
                out.push(symbol);
            }
        }
        "class_definition" => {
            extract_class(path, source, node, anchor, file_imports, out);
        }
        "expression_statement" if class_name.is_none() => {
            let Some(assignment) = node.named_child(0).filter(|c| c.kind() == "assignment") else {
                return;
            };
            let Some(left) = assignment.child_by_field_name("left") else {
                return;
            };
            if left.kind() != "identifier" {
                return;
            }
            let name = node_text(left, source).to_string();
            let symbol_type = if name.chars().all(|c| !c.is_ascii_lowercase()) {
                SymbolType::Constant
            } else {
                SymbolType::Variable
            };
            let (start_line, end_line) = line_span(anchor);
            out.push(Symbol {
                name: name.clone(),
                symbol_type,
                path: path.to_string(),
                start_line,
                end_line,
                body: node_text(anchor, source).to_string(),
                doc: doc_comment(anchor, source),
                calls: collect_calls(assignment, source),
                imports: referenced_imports(assignment, source, file_imports),
                metadata: metadata_from_name(&name),
            });
        }
        _ => {}
    }
}

fn function_symbol(
    path: &str,
    source: &str,
    func: Node,
    anchor: Node,
    file_imports: &[String],
    class_name: Option<&str>,
) -> Option<Symbol> {
    let name_node = func.child_by_field_name("name")?;
    let base_name = node_text(name_node, source).to_string();
    let name = match class_name {
        Some(class) => format!("{}.{}", class, base_name),
        None => base_name.clone(),
    };

    let mut metadata = metadata_from_name(&base_name);
    if let Some(params) = func.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        let list: Vec<String> = params
            .named_children(&mut cursor)
            .map(|p| node_text(p, source).to_string())
            .filter(|p| !p.is_empty() && p != "self" && p != "cls")
            .collect();
        if !list.is_empty() {
            metadata.parameters = Some(list);
        }
    }
    if let Some(ret) = func.child_by_field_name("return_type") {
        metadata.return_type = Some(node_text(ret, source).to_string());
    }
    let mut cursor = func.walk();
    if func
        .children(&mut cursor)
        .any(|c| node_text(c, source) == "async" && !c.is_named())
    {
        metadata.is_async = Some(true);
    }

    let (start_line, end_line) = line_span(anchor);
    Some(Symbol {
        name,
        symbol_type: if class_name.is_some() {
            SymbolType::Method
        } else {
            SymbolType::Function
        },
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(anchor, source).to_string(),
        doc: docstring(func, source).or_else(|| doc_comment(anchor, source)),
        calls: collect_calls(func, source),
        imports: referenced_imports(func, source, file_imports),
        metadata,
    })
}

fn extract_class(
    path: &str,
    source: &str,
    class: Node,
    anchor: Node,
    file_imports: &[String],
    out: &mut Vec<Symbol>,
) {
    let Some(name_node) = class.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(name_node, source).to_string();
    let (start_line, end_line) = line_span(anchor);

    out.push(Symbol {
        name: class_name.clone(),
        symbol_type: SymbolType::Class,
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(anchor, source).to_string(),
        doc: docstring(class, source).or_else(|| doc_comment(anchor, source)),
        calls: Vec::new(),
        imports: referenced_imports(class, source, file_imports),
        metadata: metadata_from_name(&class_name),
    });

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        extract_statement(
            path,
            source,
            member,
            member,
            file_imports,
            Some(&class_name),
            out,
        );
    }
}

/// Underscore naming convention: `__x` private, `_x` protected, dunders and
/// the rest public.
fn metadata_from_name(name: &str) -> SymbolMetadata {
    let visibility = if name.starts_with("__") && !name.ends_with("__") {
        "private"
    } else if name.starts_with('_') && !name.starts_with("__") {
        "protected"
    } else {
        "public"
    };
    SymbolMetadata {
        visibility: Some(visibility.to_string()),
        ..SymbolMetadata::default()
    }
}

/// First statement of the body when it is a bare string literal.
fn docstring(definition: Node, source: &str) -> Option<String> {
    let body = definition.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|c| c.kind() == "string")?;
    let text = node_text(string, source)
        .trim_start_matches(['r', 'f', 'b', 'u'])
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect_calls(node: Node, source: &str) -> Vec<String> {
    let mut calls = Vec::new();
    collect_calls_into(node, source, &mut calls);
    calls
}

fn collect_calls_into(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "call" {
        if let Some(func) = node.child_by_field_name("function") {
            match func.kind() {
                "identifier" => push_unique(out, node_text(func, source).to_string()),
                "attribute" => {
                    if let Some(attr) = func.child_by_field_name("attribute") {
                        push_unique(out, node_text(attr, source).to_string());
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

/// Names bound by `import` / `from .. import` statements.
fn collect_file_imports(root: Node, source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" | "import_from_statement" => {
                let mut inner = child.walk();
                for item in child.named_children(&mut inner) {
                    match item.kind() {
                        "dotted_name" => {
                            // `from a.b import c` names the module a.b; the
                            // bound identifier is the last segment
                            if let Some(last) = item.named_children(&mut item.walk()).last() {
                                push_unique(&mut imports, node_text(last, source).to_string());
                            }
                        }
                        "aliased_import" => {
                            if let Some(alias) = item.child_by_field_name("alias") {
                                push_unique(&mut imports, node_text(alias, source).to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use crate::model::SymbolType;
    use crate::parser::{ParserRegistry, SupportedLanguage};

    fn parse(source: &str) -> Vec<crate::model::Symbol> {
        ParserRegistry::new().parse_source("pkg/mod.py", source, SupportedLanguage::Python)
    }

    #[test]
    fn module_function_with_docstring() {
        let source = r#"
def greet(name):
    """Say hello."""
    return format(name)
"#;
        let symbols = parse(source);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "greet");
        assert_eq!(symbols[0].symbol_type, SymbolType::Function);
        assert_eq!(symbols[0].doc.as_deref(), Some("Say hello."));
        assert_eq!(symbols[0].calls, vec!["format"]);
    }

    #[test]
    fn class_methods_are_prefixed() {
        let source = r#"
class User:
    def get_name(self):
        return self.name

    def _internal(self):
        pass
"#;
        let symbols = parse(source);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["User", "User.get_name", "User._internal"]);
        assert_eq!(
            symbols[2].metadata.visibility.as_deref(),
            Some("protected")
        );
    }

    #[test]
    fn async_def_is_flagged() {
        let symbols = parse("async def fetch():\n    pass\n");
        assert_eq!(symbols[0].metadata.is_async, Some(true));
    }

    #[test]
    fn decorated_definition_unwraps() {
        let source = "@cached\ndef compute():\n    return 1\n";
        let symbols = parse(source);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "compute");
    }

    #[test]
    fn module_constant_vs_variable() {
        let symbols = parse("LIMIT = 10\ncounter = 0\n");
        assert_eq!(symbols[0].symbol_type, SymbolType::Constant);
        assert_eq!(symbols[1].symbol_type, SymbolType::Variable);
    }

    #[test]
    fn imports_filtered_by_use() {
        let source = r#"
from json import dumps, loads

def encode(value):
    return dumps(value)
"#;
        let symbols = parse(source);
        assert_eq!(symbols[0].imports, vec!["dumps"]);
    }
}
