//! Rust symbol extraction.
//!
//! Free functions, structs/enums/traits/type aliases, impl-block methods
//! (named `Type.method`), consts/statics, and inline modules. `pub` items
//! are exported; method resolution inside `impl Trait for Type` attaches to
//! the implementing type.

use tree_sitter::Node;

use crate::model::{Symbol, SymbolMetadata, SymbolType};

use super::{doc_comment, line_span, node_text, push_unique, referenced_imports};

pub(crate) fn extract(path: &str, source: &str, root: Node) -> Vec<Symbol> {
    let file_imports = collect_file_imports(root, source);
    let mut symbols = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        extract_item(path, source, child, &file_imports, None, &mut symbols);
    }

    symbols
}

fn extract_item(
    path: &str,
    source: &str,
    node: Node,
    file_imports: &[String],
    impl_target: Option<&str>,
    out: &mut Vec<Symbol>,
) {
    match node.kind() {
        "function_item" => {
            if let Some(symbol) = function_symbol(path, source, node, file_imports, impl_target) {
                out.push(symbol);
            }
        }
        "struct_item" => {
            if let Some(symbol) =
                named_item(path, source, node, SymbolType::Class, file_imports)
            {
                out.push(symbol);
            }
        }
        "enum_item" => {
            if let Some(symbol) = named_item(path, source, node, SymbolType::Enum, file_imports) {
                out.push(symbol);
            }
        }
        "trait_item" => {
            if let Some(symbol) =
                named_item(path, source, node, SymbolType::Interface, file_imports)
            {
                out.push(symbol);
            }
        }
        "type_item" => {
            if let Some(symbol) =
                named_item(path, source, node, SymbolType::TypeAlias, file_imports)
            {
                out.push(symbol);
            }
        }
        "const_item" | "static_item" => {
            if let Some(symbol) =
                named_item(path, source, node, SymbolType::Constant, file_imports)
            {
                out.push(symbol);
            }
        }
        "mod_item" => {
            if let Some(symbol) = named_item(path, source, node, SymbolType::Module, file_imports)
            {
                out.push(symbol);
            }
            // Inline module bodies contribute their own items
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for item in body.named_children(&mut cursor) {
                    extract_item(path, source, item, file_imports, None, out);
                }
            }
        }
        "impl_item" => {
            let target = impl_type_name(node, source);
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for item in body.named_children(&mut cursor) {
                    extract_item(path, source, item, file_imports, target.as_deref(), out);
                }
            }
        }
        _ => {}
    }
}

fn function_symbol(
    path: &str,
    source: &str,
    func: Node,
    file_imports: &[String],
    impl_target: Option<&str>,
) -> Option<Symbol> {
    let name_node = func.child_by_field_name("name")?;
    let base_name = node_text(name_node, source).to_string();
    let name = match impl_target {
        Some(target) => format!("{}.{}", target, base_name),
        None => base_name,
    };

    let mut metadata = item_metadata(func);
    if let Some(params) = func.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        let list: Vec<String> = params
            .named_children(&mut cursor)
            .map(|p| node_text(p, source).to_string())
            .filter(|p| !p.is_empty() && !p.starts_with('&') && p != "self")
            .collect();
        if !list.is_empty() {
            metadata.parameters = Some(list);
        }
    }
    if let Some(ret) = func.child_by_field_name("return_type") {
        metadata.return_type = Some(node_text(ret, source).to_string());
    }
    if let Some(type_params) = func.child_by_field_name("type_parameters") {
        let mut cursor = type_params.walk();
        let list: Vec<String> = type_params
            .named_children(&mut cursor)
            .map(|p| node_text(p, source).to_string())
            .collect();
        if !list.is_empty() {
            metadata.generic_params = Some(list);
        }
    }
    // `async fn` sits inside function_modifiers
    if node_text(func, source).trim_start().contains("async fn") {
        metadata.is_async = Some(true);
    }

    let (start_line, end_line) = line_span(func);
    Some(Symbol {
        name,
        symbol_type: if impl_target.is_some() {
            SymbolType::Method
        } else {
            SymbolType::Function
        },
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(func, source).to_string(),
        doc: doc_comment(func, source),
        calls: collect_calls(func, source),
        imports: referenced_imports(func, source, file_imports),
        metadata,
    })
}

fn named_item(
    path: &str,
    source: &str,
    node: Node,
    symbol_type: SymbolType,
    file_imports: &[String],
) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let (start_line, end_line) = line_span(node);

    let mut metadata = item_metadata(node);
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

    Some(Symbol {
        name,
        symbol_type,
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(node, source).to_string(),
        doc: doc_comment(node, source),
        calls: Vec::new(),
        imports: referenced_imports(node, source, file_imports),
        metadata,
    })
}

/// Visibility and export flag from the `pub` modifier.
fn item_metadata(node: Node) -> SymbolMetadata {
    let mut cursor = node.walk();
    let is_pub = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier");
    SymbolMetadata {
        visibility: Some(if is_pub { "public" } else { "private" }.to_string()),
        is_exported: Some(is_pub),
        ..SymbolMetadata::default()
    }
}

/// The implementing type of an impl block.
///
/// For `impl Trait for Type` this is `Type`; generic types keep only the
/// base identifier (`Foo<T>` -> `Foo`).
fn impl_type_name(impl_node: Node, source: &str) -> Option<String> {
    let type_node = impl_node.child_by_field_name("type")?;
    if type_node.kind() == "generic_type" {
        let mut cursor = type_node.walk();
        for child in type_node.children(&mut cursor) {
            if child.kind() == "type_identifier" {
                return Some(node_text(child, source).to_string());
            }
        }
    }
    Some(node_text(type_node, source).to_string())
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
                "field_expression" => {
                    if let Some(field) = func.child_by_field_name("field") {
                        push_unique(out, node_text(field, source).to_string());
                    }
                }
                "scoped_identifier" => {
                    if let Some(name) = func.child_by_field_name("name") {
                        push_unique(out, node_text(name, source).to_string());
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

/// Leaf identifiers bound by `use` declarations.
fn collect_file_imports(root: Node, source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "use_declaration" {
            continue;
        }
        if let Some(argument) = child.child_by_field_name("argument") {
            collect_use_leaves(argument, source, &mut imports);
        }
    }
    imports
}

fn collect_use_leaves(node: Node, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => push_unique(out, node_text(node, source).to_string()),
        "scoped_identifier" => {
            if let Some(name) = node.child_by_field_name("name") {
                push_unique(out, node_text(name, source).to_string());
            }
        }
        "use_as_clause" => {
            if let Some(alias) = node.child_by_field_name("alias") {
                push_unique(out, node_text(alias, source).to_string());
            }
        }
        "use_list" | "scoped_use_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                // The path prefix of a scoped list is not a binding
                if node.kind() == "scoped_use_list"
                    && node.child_by_field_name("path") == Some(child)
                {
                    continue;
                }
                collect_use_leaves(child, source, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::model::SymbolType;
    use crate::parser::{ParserRegistry, SupportedLanguage};

    fn parse(source: &str) -> Vec<crate::model::Symbol> {
        ParserRegistry::new().parse_source("src/lib.rs", source, SupportedLanguage::Rust)
    }

    #[test]
    fn free_function() {
        let symbols = parse("pub fn run() { setup(); }\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "run");
        assert_eq!(symbols[0].calls, vec!["setup"]);
        assert_eq!(symbols[0].metadata.is_exported, Some(true));
    }

    #[test]
    fn impl_methods_use_type_prefix() {
        let source = r#"
struct Server;

impl Server {
    pub fn start(&self) { self.bind(); }
}

impl Drop for Server {
    fn drop(&mut self) {}
}
"#;
        let symbols = parse(source);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Server", "Server.start", "Server.drop"]);
        assert_eq!(symbols[1].symbol_type, SymbolType::Method);
    }

    #[test]
    fn generic_impl_target_keeps_base_name() {
        let source = "struct Stack<T>(Vec<T>);\n\nimpl<T> Stack<T> {\n    fn push(&mut self, v: T) {}\n}\n";
        let symbols = parse(source);
        assert!(symbols.iter().any(|s| s.name == "Stack.push"));
    }

    #[test]
    fn item_kinds() {
        let source = r#"
pub struct A;
enum B { X }
trait C {}
type D = u32;
const E: u32 = 1;
mod f {}
"#;
        let symbols = parse(source);
        let kinds: Vec<_> = symbols.iter().map(|s| s.symbol_type).collect();
        assert_eq!(
            kinds,
            vec![
                SymbolType::Class,
                SymbolType::Enum,
                SymbolType::Interface,
                SymbolType::TypeAlias,
                SymbolType::Constant,
                SymbolType::Module,
            ]
        );
    }

    #[test]
    fn doc_comments_are_collected() {
        let source = "/// Starts the server.\n/// Binds first.\npub fn start() {}\n";
        let symbols = parse(source);
        assert_eq!(
            symbols[0].doc.as_deref(),
            Some("Starts the server.\nBinds first.")
        );
    }

    #[test]
    fn async_fn_flag() {
        let symbols = parse("async fn fetch() {}\n");
        assert_eq!(symbols[0].metadata.is_async, Some(true));
    }

    #[test]
    fn use_imports_filtered() {
        let source = r#"
use std::collections::HashMap;
use serde::{Serialize, Deserialize};

fn build() -> HashMap<String, u32> { HashMap::new() }
"#;
        let symbols = parse(source);
        assert_eq!(symbols[0].imports, vec!["HashMap"]);
    }

    #[test]
    fn scoped_calls_record_last_segment() {
        let symbols = parse("fn f() { Vec::with_capacity(4); item.push(1); }\n");
        assert_eq!(symbols[0].calls, vec!["with_capacity", "push"]);
    }
}
