//! Public symbol index built from tree-sitter parses of project sources.

use std::collections::BTreeMap;
use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::Error;
use crate::grammar::{self, SourceLanguage};
use crate::patterns::ExcludeSet;
use crate::types::{Symbol, SymbolKind};

/// Maximum source file size (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Accumulates public declarations for one file.
struct Collector<'a> {
    /// Project-relative path of the file being walked.
    file: &'a str,
    /// Full source text.
    source: &'a str,
    /// Declarations collected so far.
    symbols: Vec<Symbol>,
}

/// Bare name → every public declaration with that name.
/// Private declarations never enter the index.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    /// Symbols grouped by bare name; each group is in walk order.
    by_name: BTreeMap<String, Vec<Symbol>>,
}

impl Collector<'_> {
    /// Record `node` as a symbol called `name` unless the name is private.
    /// Returns whether the symbol was recorded.
    fn push(&mut self, node: Node<'_>, name: &str, kind: SymbolKind, scope: Option<&str>) -> bool {
        if is_underscore_private(name) {
            return false;
        }

        let start = node.start_position();
        let signature = node
            .utf8_text(self.source.as_bytes())
            .ok()
            .and_then(|text| return text.lines().next())
            .unwrap_or("")
            .trim()
            .to_string();

        self.symbols.push(Symbol {
            column: u32::try_from(start.column).unwrap_or(u32::MAX),
            file: self.file.to_string(),
            kind,
            line: u32::try_from(start.row.saturating_add(1)).unwrap_or(u32::MAX),
            name: name.to_string(),
            scope: scope.map(String::from),
            signature,
        });
        return true;
    }

    /// Text of a node's field, if present and valid UTF-8.
    fn field_text(&self, node: Node<'_>, field: &str) -> Option<&str> {
        let source = self.source;
        return node.child_by_field_name(field)?.utf8_text(source.as_bytes()).ok();
    }
}

impl FromIterator<Symbol> for SymbolIndex {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut index = Self::default();
        for symbol in iter {
            index.insert(symbol);
        }
        return index;
    }
}

impl SymbolIndex {
    /// Add one symbol under its bare name. Underscore-private names are dropped.
    pub fn insert(&mut self, symbol: Symbol) {
        if is_underscore_private(&symbol.name) {
            return;
        }
        self.by_name.entry(symbol.name.clone()).or_default().push(symbol);
    }

    /// Whether no symbol was indexed.
    pub fn is_empty(&self) -> bool {
        return self.by_name.is_empty();
    }

    /// Total number of indexed symbols.
    pub fn len(&self) -> usize {
        return self.by_name.values().map(Vec::len).sum();
    }

    /// Every symbol with this exact bare name.
    pub fn lookup(&self, name: &str) -> &[Symbol] {
        return self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[]);
    }

    /// Symbols named `name` declared directly inside `scope`.
    pub fn lookup_qualified(&self, scope: &str, name: &str) -> Vec<&Symbol> {
        return self
            .lookup(name)
            .iter()
            .filter(|s| return s.scope.as_deref() == Some(scope))
            .collect();
    }

    /// All indexed symbols, ordered by name.
    pub fn public_symbols(&self) -> impl Iterator<Item = &Symbol> {
        return self.by_name.values().flatten();
    }
}

/// Walk every supported source file under `root` and index its public symbols.
/// Unreadable, oversized or unparsable files are skipped.
pub fn build_index(root: &Path, excludes: &ExcludeSet) -> SymbolIndex {
    let mut index = SymbolIndex::default();

    for file in excludes.walk(root, root) {
        let Ok(language) = SourceLanguage::for_path(&file.path) else {
            continue;
        };
        let too_large = std::fs::metadata(&file.path).is_ok_and(|m| return m.len() > MAX_FILE_SIZE);
        if too_large {
            log::debug!("skipping oversized source {}", file.relative);
            continue;
        }
        let source = match std::fs::read_to_string(&file.path) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("skipping unreadable source {}: {e}", file.relative);
                continue;
            },
        };
        match extract_symbols(&file.relative, &source, language) {
            Ok(symbols) => {
                for symbol in symbols {
                    index.insert(symbol);
                }
            },
            Err(e) => log::debug!("skipping {}: {e}", file.relative),
        }
    }

    return index;
}

/// Public declarations of one source file.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the source,
/// or `Error::UnsupportedLanguage` if the path has no grammar.
pub fn extract_symbols(
    relative: &str,
    source: &str,
    language: SourceLanguage,
) -> Result<Vec<Symbol>, Error> {
    let path = Path::new(relative);
    let tree = parse_source(path, source, &grammar::language_for_path(path)?)?;
    let mut collector = Collector {
        file: relative,
        source,
        symbols: Vec::new(),
    };

    let root = tree.root_node();
    match language {
        SourceLanguage::Go => collect_go_declarations(root, &mut collector),
        SourceLanguage::JavaScript | SourceLanguage::TypeScript => {
            collect_ts_declarations(root, &mut collector);
        },
        SourceLanguage::Python => collect_python_block(root, None, &mut collector),
        SourceLanguage::Rust => collect_rust_items(root, &mut collector),
    }

    return Ok(collector.symbols);
}

/// Leading underscore (dunder names included) or a `#` private-field marker.
fn is_underscore_private(name: &str) -> bool {
    return name.starts_with('_') || name.starts_with('#');
}

/// Parse source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
fn parse_source(file_path: &Path, source: &str, language: &tree_sitter::Language) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| return Error::ParseFailed {
        file: file_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    return parser.parse(source, None).ok_or_else(|| return Error::ParseFailed {
        file: file_path.to_path_buf(),
        reason: "tree-sitter returned None".to_string(),
    });
}

/// Strip generic arguments and reference/pointer sigils from a type name.
fn bare_type_name(text: &str) -> &str {
    let trimmed = text.trim().trim_start_matches(['&', '*']).trim_start();
    let end = trimmed.find(['<', '[', ' ']).unwrap_or(trimmed.len());
    return trimmed.get(..end).unwrap_or(trimmed);
}

// ── Python ─────────────────────────────────────────────────────────────

/// Collect functions and classes from a module or class body.
/// Functions inside a class become methods scoped to it; function bodies are not entered.
fn collect_python_block(block: Node<'_>, class_scope: Option<&str>, collector: &mut Collector<'_>) {
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        let definition = if child.kind() == "decorated_definition" {
            child.child_by_field_name("definition")
        } else {
            Some(child)
        };
        let Some(definition) = definition else {
            continue;
        };
        let Some(name) = collector.field_text(definition, "name").map(String::from) else {
            continue;
        };

        match definition.kind() {
            "function_definition" => {
                let kind = if class_scope.is_some() { SymbolKind::Method } else { SymbolKind::Function };
                collector.push(definition, &name, kind, class_scope);
            },
            "class_definition" => {
                if !collector.push(definition, &name, SymbolKind::Class, class_scope) {
                    continue;
                }
                if let Some(body) = definition.child_by_field_name("body") {
                    collect_python_block(body, Some(&name), collector);
                }
            },
            _ => {},
        }
    }
}

// ── Rust ───────────────────────────────────────────────────────────────

/// Collect `pub` items from a source file or inline module body.
fn collect_rust_items(node: Node<'_>, collector: &mut Collector<'_>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "enum_item" | "struct_item" | "union_item" => {
                push_rust_item(child, SymbolKind::Class, None, collector);
            },
            "function_item" => {
                push_rust_item(child, SymbolKind::Function, None, collector);
            },
            "impl_item" => collect_rust_impl_methods(child, collector),
            "mod_item" if rust_is_pub(child) => {
                if let Some(body) = child.child_by_field_name("body") {
                    collect_rust_items(body, collector);
                }
            },
            "trait_item" => collect_rust_trait(child, collector),
            _ => {},
        }
    }
}

/// Collect methods from a Rust impl block, scoped to the implementing type.
/// Trait impl methods are public through the trait; inherent ones need `pub`.
fn collect_rust_impl_methods(impl_node: Node<'_>, collector: &mut Collector<'_>) {
    let Some(type_name) = collector.field_text(impl_node, "type").map(|t| return bare_type_name(t).to_string())
    else {
        return;
    };
    let is_trait_impl = impl_node.child_by_field_name("trait").is_some();
    let Some(body) = impl_node.child_by_field_name("body") else {
        return;
    };

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() != "function_item" || !(is_trait_impl || rust_is_pub(child)) {
            continue;
        }
        if let Some(name) = collector.field_text(child, "name").map(String::from) {
            collector.push(child, &name, SymbolKind::Method, Some(&type_name));
        }
    }
}

/// Collect a `pub trait` and its method declarations.
fn collect_rust_trait(trait_node: Node<'_>, collector: &mut Collector<'_>) {
    if !rust_is_pub(trait_node) {
        return;
    }
    let Some(trait_name) = collector.field_text(trait_node, "name").map(String::from) else {
        return;
    };
    if !collector.push(trait_node, &trait_name, SymbolKind::Class, None) {
        return;
    }
    let Some(body) = trait_node.child_by_field_name("body") else {
        return;
    };

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if !matches!(child.kind(), "function_item" | "function_signature_item") {
            continue;
        }
        if let Some(name) = collector.field_text(child, "name").map(String::from) {
            collector.push(child, &name, SymbolKind::Method, Some(&trait_name));
        }
    }
}

/// Push a top-level Rust item when it carries a plain `pub`.
fn push_rust_item(node: Node<'_>, kind: SymbolKind, scope: Option<&str>, collector: &mut Collector<'_>) {
    if !rust_is_pub(node) {
        return;
    }
    if let Some(name) = collector.field_text(node, "name").map(String::from) {
        collector.push(node, &name, kind, scope);
    }
}

/// Whether an item has a bare `pub` visibility modifier.
fn rust_is_pub(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    return node
        .children(&mut cursor)
        .any(|c| return c.kind() == "visibility_modifier" && c.end_byte().saturating_sub(c.start_byte()) == 3);
}

// ── TypeScript / JavaScript ────────────────────────────────────────────

/// Collect top-level functions, classes, interfaces and function-valued constants.
fn collect_ts_declarations(root: Node<'_>, collector: &mut Collector<'_>) {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let declaration = if child.kind() == "export_statement" {
            child.child_by_field_name("declaration")
        } else {
            Some(child)
        };
        let Some(declaration) = declaration else {
            continue;
        };

        match declaration.kind() {
            "abstract_class_declaration" | "class_declaration" => {
                collect_ts_class(declaration, collector);
            },
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = collector.field_text(declaration, "name").map(String::from) {
                    collector.push(declaration, &name, SymbolKind::Function, None);
                }
            },
            "interface_declaration" => {
                if let Some(name) = collector.field_text(declaration, "name").map(String::from) {
                    collector.push(declaration, &name, SymbolKind::Class, None);
                }
            },
            "lexical_declaration" | "variable_declaration" => {
                collect_ts_function_constants(declaration, collector);
            },
            _ => {},
        }
    }
}

/// Collect a class and its named methods (constructors excluded).
fn collect_ts_class(class_node: Node<'_>, collector: &mut Collector<'_>) {
    let Some(class_name) = collector.field_text(class_node, "name").map(String::from) else {
        return;
    };
    if !collector.push(class_node, &class_name, SymbolKind::Class, None) {
        return;
    }
    let Some(body) = class_node.child_by_field_name("body") else {
        return;
    };

    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if !matches!(member.kind(), "abstract_method_signature" | "method_definition" | "method_signature") {
            continue;
        }
        if ts_member_is_private(member) {
            continue;
        }
        let Some(name) = collector.field_text(member, "name").map(String::from) else {
            continue;
        };
        if name == "constructor" {
            continue;
        }
        collector.push(member, &name, SymbolKind::Method, Some(&class_name));
    }
}

/// `const x = () => ...` and `const x = function ...` declare functions.
fn collect_ts_function_constants(declaration: Node<'_>, collector: &mut Collector<'_>) {
    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let is_function = declarator.child_by_field_name("value").is_some_and(|v| {
            return matches!(v.kind(), "arrow_function" | "function" | "function_expression");
        });
        if !is_function {
            continue;
        }
        if let Some(name) = collector.field_text(declarator, "name").map(String::from) {
            collector.push(declaration, &name, SymbolKind::Function, None);
        }
    }
}

/// TypeScript `private` accessibility modifier on a class member.
fn ts_member_is_private(member: Node<'_>) -> bool {
    let mut cursor = member.walk();
    return member.children(&mut cursor).any(|c| {
        return c.kind() == "accessibility_modifier" && c.end_byte().saturating_sub(c.start_byte()) == 7;
    });
}

// ── Go ─────────────────────────────────────────────────────────────────

/// Collect exported functions, methods and struct/interface types.
fn collect_go_declarations(root: Node<'_>, collector: &mut Collector<'_>) {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "function_declaration" => {
                if let Some(name) = collector.field_text(child, "name").map(String::from)
                    && go_is_exported(&name)
                {
                    collector.push(child, &name, SymbolKind::Function, None);
                }
            },
            "method_declaration" => collect_go_method(child, collector),
            "type_declaration" => collect_go_types(child, collector),
            _ => {},
        }
    }
}

/// Collect an exported method on an exported receiver type.
fn collect_go_method(method: Node<'_>, collector: &mut Collector<'_>) {
    let Some(name) = collector.field_text(method, "name").map(String::from) else {
        return;
    };
    let Some(receiver) = collector.field_text(method, "receiver") else {
        return;
    };
    let receiver_type = receiver
        .trim_matches(|c| return c == '(' || c == ')')
        .split_whitespace()
        .last()
        .map(|t| return bare_type_name(t).to_string())
        .unwrap_or_default();

    if go_is_exported(&name) && go_is_exported(&receiver_type) {
        collector.push(method, &name, SymbolKind::Method, Some(&receiver_type));
    }
}

/// Collect exported struct and interface types from a `type` declaration.
fn collect_go_types(declaration: Node<'_>, collector: &mut Collector<'_>) {
    let mut cursor = declaration.walk();
    for spec in declaration.named_children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let is_class_like = spec
            .child_by_field_name("type")
            .is_some_and(|t| return matches!(t.kind(), "interface_type" | "struct_type"));
        let Some(name) = collector.field_text(spec, "name").map(String::from) else {
            continue;
        };
        if is_class_like && go_is_exported(&name) {
            collector.push(spec, &name, SymbolKind::Class, None);
        }
    }
}

/// Go exports identifiers that start with an uppercase letter.
fn go_is_exported(name: &str) -> bool {
    return name.chars().next().is_some_and(char::is_uppercase);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[Symbol]) -> Vec<String> {
        return symbols
            .iter()
            .map(|s| match &s.scope {
                Some(scope) => format!("{scope}.{}", s.name),
                None => s.name.clone(),
            })
            .collect();
    }

    #[test]
    fn python_classes_methods_and_privacy() {
        let source = "\
class Widget:
    def __init__(self):
        pass

    def render(self):
        pass

    def _layout(self):
        pass

class _Hidden:
    def visible(self):
        pass

@decorator
def build():
    def inner():
        pass

def _helper():
    pass
";
        let symbols = extract_symbols("app.py", source, SourceLanguage::Python).unwrap();
        assert_eq!(names(&symbols), vec!["Widget", "Widget.render", "build"]);

        let render = &symbols[1];
        assert_eq!(render.kind, SymbolKind::Method);
        assert_eq!(render.line, 5);
        assert_eq!(render.column, 4);
        assert_eq!(render.signature, "def render(self):");
    }

    #[test]
    fn rust_visibility_and_impl_scope() {
        let source = "\
pub struct Config;
struct Private;
pub fn load() {}
fn helper() {}
impl Config {
    pub fn validate(&self) {}
    fn check(&self) {}
}
impl Default for Config {
    fn default() -> Self { Config }
}
pub trait Store {
    fn get(&self);
}
";
        let symbols = extract_symbols("src/lib.rs", source, SourceLanguage::Rust).unwrap();
        assert_eq!(
            names(&symbols),
            vec!["Config", "load", "Config.validate", "Config.default", "Store", "Store.get"]
        );
    }

    #[test]
    fn typescript_exports_and_arrow_functions() {
        let source = "\
export class Client {
  connect() {}
  private reset() {}
  constructor() {}
}
export function createClient() {}
export const handler = () => {};
const value = 3;
interface Options {}
";
        let symbols = extract_symbols("src/client.ts", source, SourceLanguage::TypeScript).unwrap();
        assert_eq!(
            names(&symbols),
            vec!["Client", "Client.connect", "createClient", "handler", "Options"]
        );
    }

    #[test]
    fn go_exported_identifiers_only() {
        let source = "\
package server

type Server struct{}
type config struct{}

func New() *Server { return nil }
func helper() {}
func (s *Server) Start() {}
func (s *Server) stop() {}
";
        let symbols = extract_symbols("server.go", source, SourceLanguage::Go).unwrap();
        assert_eq!(names(&symbols), vec!["Server", "New", "Server.Start"]);
    }

    #[test]
    fn index_lookup_and_scope() {
        let symbols = extract_symbols(
            "a.py",
            "class A:\n    def run(self):\n        pass\n\ndef run():\n    pass\n",
            SourceLanguage::Python,
        )
        .unwrap();
        let index: SymbolIndex = symbols.into_iter().collect();
        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup("run").len(), 2);
        assert_eq!(index.lookup_qualified("A", "run").len(), 1);
        assert!(index.lookup_qualified("B", "run").is_empty());
        assert!(index.lookup("missing").is_empty());
    }

    #[test]
    fn build_index_walks_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/save.py"), "def save():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "def nope(): pass").unwrap();
        let index = build_index(dir.path(), &ExcludeSet::defaults_only());
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("save")[0].file, "pkg/save.py");
    }
}
