//! TypeScript / JavaScript symbol extraction (with TSX/JSX dialects).
//!
//! Walks the tree-sitter CST and emits symbols for functions, classes and
//! their methods, interfaces, type aliases, enums, and top-level variable
//! bindings. Arrow and function-expression bindings collapse to plain
//! functions; in the TSX/JSX dialects a PascalCase function whose body
//! contains markup is classified as a component.

use tree_sitter::Node;

use crate::model::{Symbol, SymbolMetadata, SymbolType};

use super::{
    contains_jsx, doc_comment, is_pascal_case, line_span, node_text, push_unique,
    referenced_imports, SupportedLanguage,
};

pub(crate) fn extract(
    path: &str,
    source: &str,
    root: Node,
    language: SupportedLanguage,
) -> Vec<Symbol> {
    let file_imports = collect_file_imports(root, source);
    let mut symbols = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        extract_statement(
            path,
            source,
            child,
            child,
            language,
            &file_imports,
            false,
            &mut symbols,
        );
    }

    symbols
}

/// Extract symbols from one top-level statement.
///
/// `anchor` is the outermost statement node: body text, line spans, and doc
/// comments use it, so comments above `export function f()` attach to `f`.
#[allow(clippy::too_many_arguments)]
fn extract_statement(
    path: &str,
    source: &str,
    node: Node,
    anchor: Node,
    language: SupportedLanguage,
    file_imports: &[String],
    exported: bool,
    out: &mut Vec<Symbol>,
) {
    match node.kind() {
        "export_statement" => {
            if let Some(decl) = node.child_by_field_name("declaration") {
                extract_statement(path, source, decl, anchor, language, file_imports, true, out);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(symbol) = function_symbol(
                path,
                source,
                anchor,
                node,
                language,
                file_imports,
                exported,
                None,
            ) {
                out.push(symbol);
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            extract_class(path, source, node, anchor, file_imports, exported, out);
        }
        "interface_declaration" => {
            if let Some(symbol) = named_container(
                path,
                source,
                node,
                anchor,
                SymbolType::Interface,
                file_imports,
                exported,
            ) {
                out.push(symbol);
            }
        }
        "type_alias_declaration" => {
            if let Some(symbol) = named_container(
                path,
                source,
                node,
                anchor,
                SymbolType::TypeAlias,
                file_imports,
                exported,
            ) {
                out.push(symbol);
            }
        }
        "enum_declaration" => {
            if let Some(symbol) = named_container(
                path,
                source,
                node,
                anchor,
                SymbolType::Enum,
                file_imports,
                exported,
            ) {
                out.push(symbol);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let is_const = node
                .child(0)
                .map(|c| node_text(c, source) == "const")
                .unwrap_or(false);
            let mut cursor = node.walk();
            for declarator in node.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                extract_declarator(
                    path,
                    source,
                    anchor,
                    declarator,
                    is_const,
                    language,
                    file_imports,
                    exported,
                    out,
                );
            }
        }
        _ => {}
    }
}

/// A `const x = ...` binding: function-valued declarators collapse to
/// functions (or components), everything else becomes a variable/constant.
#[allow(clippy::too_many_arguments)]
fn extract_declarator(
    path: &str,
    source: &str,
    anchor: Node,
    declarator: Node,
    is_const: bool,
    language: SupportedLanguage,
    file_imports: &[String],
    exported: bool,
    out: &mut Vec<Symbol>,
) {
    let Some(name_node) = declarator.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    if name.is_empty() {
        return;
    }

    if let Some(func) = declarator
        .child_by_field_name("value")
        .and_then(|value| function_value(value))
    {
        if let Some(symbol) = function_symbol(
            path,
            source,
            anchor,
            func,
            language,
            file_imports,
            exported,
            Some(name),
        ) {
            out.push(symbol);
        }
        return;
    }

    let (start_line, end_line) = line_span(anchor);
    let mut metadata = SymbolMetadata::default();
    if exported {
        metadata.is_exported = Some(true);
    }
    out.push(Symbol {
        name,
        symbol_type: if is_const {
            SymbolType::Constant
        } else {
            SymbolType::Variable
        },
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(anchor, source).to_string(),
        doc: doc_comment(anchor, source),
        calls: collect_calls(declarator, source),
        imports: referenced_imports(declarator, source, file_imports),
        metadata,
    });
}

/// Resolve a declarator value to its function node, unwrapping one level of
/// higher-order call (`memo(() => ...)`, `forwardRef(function ...)`).
fn function_value(value: Node) -> Option<Node> {
    match value.kind() {
        "arrow_function" | "function_expression" | "generator_function" | "function" => Some(value),
        "call_expression" => {
            let args = value.child_by_field_name("arguments")?;
            let mut cursor = args.walk();
            let found = args.named_children(&mut cursor).find(|arg| {
                matches!(
                    arg.kind(),
                    "arrow_function" | "function_expression" | "generator_function" | "function"
                )
            });
            found
        }
        _ => None,
    }
}

/// Build a function (or component) symbol.
///
/// `outer` spans the whole statement (for body text and doc anchoring);
/// `func` is the function node itself (for parameters and async detection).
#[allow(clippy::too_many_arguments)]
fn function_symbol(
    path: &str,
    source: &str,
    outer: Node,
    func: Node,
    language: SupportedLanguage,
    file_imports: &[String],
    exported: bool,
    binding_name: Option<String>,
) -> Option<Symbol> {
    let name = match binding_name {
        Some(name) => name,
        None => func
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())?,
    };
    if name.is_empty() {
        return None;
    }

    let symbol_type = if language.has_jsx() && is_pascal_case(&name) && contains_jsx(func) {
        SymbolType::Component
    } else {
        SymbolType::Function
    };

    let (start_line, end_line) = line_span(outer);
    Some(Symbol {
        name,
        symbol_type,
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(outer, source).to_string(),
        doc: doc_comment(outer, source),
        calls: collect_calls(func, source),
        imports: referenced_imports(func, source, file_imports),
        metadata: function_metadata(func, source, exported),
    })
}

/// Emit the class symbol plus one `Class.method` symbol per member.
#[allow(clippy::too_many_arguments)]
fn extract_class(
    path: &str,
    source: &str,
    class: Node,
    anchor: Node,
    file_imports: &[String],
    exported: bool,
    out: &mut Vec<Symbol>,
) {
    let Some(name_node) = class.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(name_node, source).to_string();
    let (start_line, end_line) = line_span(anchor);

    let mut metadata = SymbolMetadata::default();
    if exported {
        metadata.is_exported = Some(true);
    }
    if let Some(params) = class.child_by_field_name("type_parameters") {
        metadata.generic_params = Some(generic_params(params, source));
    }

    out.push(Symbol {
        name: class_name.clone(),
        symbol_type: SymbolType::Class,
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(anchor, source).to_string(),
        doc: doc_comment(anchor, source),
        calls: Vec::new(),
        imports: referenced_imports(class, source, file_imports),
        metadata,
    });

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let (method_name, func_node) = match member.kind() {
            "method_definition" => {
                let Some(name) = member.child_by_field_name("name") else {
                    continue;
                };
                (node_text(name, source).to_string(), member)
            }
            // Arrow-valued class fields collapse to methods
            "public_field_definition" | "field_definition" => {
                let Some(value) = member.child_by_field_name("value") else {
                    continue;
                };
                if !matches!(value.kind(), "arrow_function" | "function_expression") {
                    continue;
                }
                let Some(name) = member.child_by_field_name("name") else {
                    continue;
                };
                (node_text(name, source).to_string(), value)
            }
            _ => continue,
        };
        if method_name.is_empty() {
            continue;
        }

        let (m_start, m_end) = line_span(member);
        let mut metadata = function_metadata(func_node, source, false);
        metadata.visibility = member_visibility(member, source);

        out.push(Symbol {
            name: format!("{}.{}", class_name, method_name),
            symbol_type: SymbolType::Method,
            path: path.to_string(),
            start_line: m_start,
            end_line: m_end,
            body: node_text(member, source).to_string(),
            doc: doc_comment(member, source),
            calls: collect_calls(func_node, source),
            imports: referenced_imports(func_node, source, file_imports),
            metadata,
        });
    }
}

/// Interface / type alias / enum: a named container with no members of its
/// own in the symbol table.
#[allow(clippy::too_many_arguments)]
fn named_container(
    path: &str,
    source: &str,
    node: Node,
    anchor: Node,
    symbol_type: SymbolType,
    file_imports: &[String],
    exported: bool,
) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let (start_line, end_line) = line_span(anchor);

    let mut metadata = SymbolMetadata::default();
    if exported {
        metadata.is_exported = Some(true);
    }
    if let Some(params) = node.child_by_field_name("type_parameters") {
        metadata.generic_params = Some(generic_params(params, source));
    }

    Some(Symbol {
        name,
        symbol_type,
        path: path.to_string(),
        start_line,
        end_line,
        body: node_text(anchor, source).to_string(),
        doc: doc_comment(anchor, source),
        calls: Vec::new(),
        imports: referenced_imports(node, source, file_imports),
        metadata,
    })
}

// ============================================================================
// Metadata helpers
// ============================================================================

fn function_metadata(func: Node, source: &str, exported: bool) -> SymbolMetadata {
    let mut metadata = SymbolMetadata::default();

    if let Some(params) = func.child_by_field_name("parameters") {
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

    if let Some(ret) = func.child_by_field_name("return_type") {
        let text = node_text(ret, source).trim_start_matches(':').trim();
        if !text.is_empty() {
            metadata.return_type = Some(text.to_string());
        }
    }

    if let Some(params) = func.child_by_field_name("type_parameters") {
        metadata.generic_params = Some(generic_params(params, source));
    }

    let mut cursor = func.walk();
    if func
        .children(&mut cursor)
        .any(|c| node_text(c, source) == "async")
    {
        metadata.is_async = Some(true);
    }

    if exported {
        metadata.is_exported = Some(true);
    }

    metadata
}

fn member_visibility(member: Node, source: &str) -> Option<String> {
    let mut cursor = member.walk();
    for child in member.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return Some(node_text(child, source).to_string());
        }
    }
    None
}

fn generic_params(params: Node, source: &str) -> Vec<String> {
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .map(|p| node_text(p, source).to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

// ============================================================================
// Calls and imports
// ============================================================================

/// Identifiers used in call position, deduplicated and in source order.
/// Member calls record the method name.
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
                "member_expression" => {
                    if let Some(prop) = func.child_by_field_name("property") {
                        push_unique(out, node_text(prop, source).to_string());
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

/// Identifiers bound by the file's import declarations.
fn collect_file_imports(root: Node, source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "import_statement" {
            continue;
        }
        collect_import_bindings(child, source, &mut imports);
    }
    imports
}

fn collect_import_bindings(node: Node, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        // `import Foo from` / `import { a as b }` local binding names
        "identifier" => push_unique(out, node_text(node, source).to_string()),
        "import_specifier" => {
            let binding = node
                .child_by_field_name("alias")
                .or_else(|| node.child_by_field_name("name"));
            if let Some(binding) = binding {
                push_unique(out, node_text(binding, source).to_string());
            }
            return;
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_import_bindings(child, source, out);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::model::SymbolType;
    use crate::parser::{ParserRegistry, SupportedLanguage};

    fn parse(source: &str, language: SupportedLanguage) -> Vec<crate::model::Symbol> {
        ParserRegistry::new().parse_source("src/app.ts", source, language)
    }

    #[test]
    fn exported_function() {
        let symbols = parse(
            r#"export function greet(name: string) { return "hi " + name; }"#,
            SupportedLanguage::TypeScript,
        );
        assert_eq!(symbols.len(), 1);
        let sym = &symbols[0];
        assert_eq!(sym.name, "greet");
        assert_eq!(sym.symbol_type, SymbolType::Function);
        assert!(sym.calls.is_empty());
        assert_eq!(sym.metadata.is_exported, Some(true));
        assert_eq!(sym.start_line, 1);
    }

    #[test]
    fn class_with_method() {
        let symbols = parse(
            "export class U { getName(){return this.n;} }",
            SupportedLanguage::TypeScript,
        );
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["U", "U.getName"]);
        assert_eq!(symbols[0].symbol_type, SymbolType::Class);
        assert_eq!(symbols[1].symbol_type, SymbolType::Method);
    }

    #[test]
    fn arrow_const_collapses_to_function() {
        let symbols = parse(
            "const add = async (a: number, b: number) => a + b;",
            SupportedLanguage::TypeScript,
        );
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "add");
        assert_eq!(symbols[0].symbol_type, SymbolType::Function);
        assert_eq!(symbols[0].metadata.is_async, Some(true));
    }

    #[test]
    fn tsx_component_classification() {
        let symbols = parse(
            "export function Button() { return <button>ok</button>; }",
            SupportedLanguage::Tsx,
        );
        assert_eq!(symbols[0].symbol_type, SymbolType::Component);

        // lowercase name is a plain function even with markup
        let symbols = parse(
            "function row() { return <tr />; }",
            SupportedLanguage::Tsx,
        );
        assert_eq!(symbols[0].symbol_type, SymbolType::Function);

        // no markup: not a component
        let symbols = parse(
            "export function Helper() { return 1; }",
            SupportedLanguage::Tsx,
        );
        assert_eq!(symbols[0].symbol_type, SymbolType::Function);
    }

    #[test]
    fn wrapped_component_unwraps_once() {
        let symbols = parse(
            "const Card = memo(() => <div>hi</div>);",
            SupportedLanguage::Tsx,
        );
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Card");
        assert_eq!(symbols[0].symbol_type, SymbolType::Component);
    }

    #[test]
    fn calls_are_deduped_in_order() {
        let symbols = parse(
            "function run() { setup(); work(); setup(); log.info(1); }",
            SupportedLanguage::TypeScript,
        );
        assert_eq!(symbols[0].calls, vec!["setup", "work", "info"]);
    }

    #[test]
    fn imports_filtered_by_reference() {
        let source = r#"
import { used, unused } from "./dep";

function f() { return used(); }
"#;
        let symbols = parse(source, SupportedLanguage::TypeScript);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].imports, vec!["used"]);
    }

    #[test]
    fn jsdoc_attaches_to_declaration() {
        let source = "/**\n * Greets a user.\n */\nexport function greet() {}";
        let symbols = parse(source, SupportedLanguage::TypeScript);
        assert_eq!(symbols[0].doc.as_deref(), Some("Greets a user."));
    }

    #[test]
    fn interface_type_enum_and_consts() {
        let source = r#"
export interface Shape { area(): number; }
type Alias = string;
enum Color { Red, Green }
const LIMIT = 10;
let counter = 0;
"#;
        let symbols = parse(source, SupportedLanguage::TypeScript);
        let kinds: Vec<_> = symbols.iter().map(|s| s.symbol_type).collect();
        assert_eq!(
            kinds,
            vec![
                SymbolType::Interface,
                SymbolType::TypeAlias,
                SymbolType::Enum,
                SymbolType::Constant,
                SymbolType::Variable,
            ]
        );
    }

    #[test]
    fn javascript_dialect() {
        let symbols = parse(
            "function hello(name) { return greet(name); }",
            SupportedLanguage::JavaScript,
        );
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].calls, vec!["greet"]);
    }

    #[test]
    fn method_return_type_and_params() {
        let symbols = parse(
            "export function area(w: number, h: number): number { return w * h; }",
            SupportedLanguage::TypeScript,
        );
        let meta = &symbols[0].metadata;
        assert_eq!(meta.return_type.as_deref(), Some("number"));
        assert_eq!(
            meta.parameters.as_deref(),
            Some(&["w: number".to_string(), "h: number".to_string()][..])
        );
    }
}
