//! Tree-sitter front end for C headers (parsed with the C++ grammar).
//!
//! Builds a [`TranslationUnit`] the way libclang would present it: a flat
//! token stream (comments included), a tree of declaration cursors with
//! USR-style identities, and diagnostics for syntax errors and unresolved
//! quoted includes. No preprocessing happens; conditional blocks are walked
//! as if every branch were active.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use tree_sitter::Node;

use super::eval::ConstEvaluator;
use super::usr::{self, TagKind};
use super::{
    Cursor, CursorDetail, CursorId, CursorKind, Diagnostic, FrontEnd, Severity, SourceLocation,
    SourceRange, StorageClass, Token, TokenKind, TranslationUnit, TypeInfo,
};
use crate::error::{DocError, Result};

const C_KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "char", "const", "continue", "default", "do", "double",
    "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "true", "false",
];

pub struct CppFrontEnd;

impl CppFrontEnd {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CppFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontEnd for CppFrontEnd {
    fn name(&self) -> &'static str {
        "tree-sitter-cpp"
    }

    fn parse_source(&self, path: &Path, source: &str, args: &[String]) -> Result<TranslationUnit> {
        let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| DocError::Parse(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| DocError::Parse(format!("Failed to parse {}", path.display())))?;

        let file: Arc<str> = Arc::from(path.to_string_lossy().as_ref());
        let mut unit = TranslationUnit::new(file.clone(), source.to_string());

        let root = tree.root_node();
        let mut builder = UnitBuilder::new(&mut unit, source, file, path, CompilerArgs::parse(args));
        builder.tokenize(root);
        builder.visit_items(root, CursorId::ROOT, "");
        builder.report_syntax_errors(root);
        unit.index_tokens();

        debug!(
            "Parsed {}: {} tokens, {} diagnostics",
            path.display(),
            unit.tokens().len(),
            unit.diagnostics().len()
        );
        Ok(unit)
    }
}

// =====================================================
// Compiler arguments
// =====================================================

/// The subset of compiler arguments the front end understands.
#[derive(Debug, Default, Clone)]
pub struct CompilerArgs {
    pub include_dirs: Vec<PathBuf>,
}

impl CompilerArgs {
    pub fn parse(args: &[String]) -> Self {
        let mut include_dirs = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            for flag in ["-I", "-iquote", "-isystem"] {
                if arg == flag {
                    if let Some(dir) = iter.next() {
                        include_dirs.push(PathBuf::from(dir));
                    }
                    break;
                }
                if let Some(dir) = arg.strip_prefix(flag) {
                    include_dirs.push(PathBuf::from(dir));
                    break;
                }
            }
        }
        Self { include_dirs }
    }
}

// =====================================================
// Builder
// =====================================================

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|start| *start <= offset).max(1) - 1;
        let column = offset - self.starts[line] + 1;
        (line as u32 + 1, column as u32)
    }
}

struct UnitBuilder<'a> {
    unit: &'a mut TranslationUnit,
    source: &'a str,
    file: Arc<str>,
    file_name: String,
    path: &'a Path,
    args: CompilerArgs,
    lines: LineIndex,
    /// Typedef name -> USR, for resolving `typedef a_t b_t;`.
    typedefs: HashMap<String, String>,
    /// Enumerator values seen so far.
    constants: HashMap<String, i64>,
}

impl<'a> UnitBuilder<'a> {
    fn new(
        unit: &'a mut TranslationUnit,
        source: &'a str,
        file: Arc<str>,
        path: &'a Path,
        args: CompilerArgs,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string());
        Self {
            unit,
            source,
            file,
            file_name,
            path,
            args,
            lines: LineIndex::new(source),
            typedefs: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    fn text(&self, node: Node) -> &'a str {
        self.source.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let (line, column) = self.lines.position(offset);
        SourceLocation {
            file: self.file.clone(),
            line,
            column,
            offset,
        }
    }

    fn range(&self, start: usize, end: usize) -> SourceRange {
        SourceRange {
            start: self.location(start),
            end: self.location(end),
        }
    }

    fn node_range(&self, node: Node) -> SourceRange {
        self.range(node.start_byte(), node.end_byte())
    }

    fn diagnostic(&mut self, severity: Severity, offset: usize, message: String) {
        let location = self.location(offset);
        self.unit.push_diagnostic(Diagnostic {
            severity,
            location,
            message,
        });
    }

    // -------------------------------------------------
    // Tokens
    // -------------------------------------------------

    fn tokenize(&mut self, root: Node) {
        for leaf in leaves(root) {
            let start = leaf.start_byte();
            if start >= leaf.end_byte() || leaf.is_missing() {
                continue;
            }
            let text = self.text(leaf);
            if text.trim().is_empty() {
                continue;
            }

            // Macro bodies arrive as one opaque leaf, trailing comment included.
            if leaf.kind() == "preproc_arg" {
                for (offset, kind, spelling) in lex_fragment(text) {
                    let location = self.location(start + offset);
                    self.unit.push_token(Token {
                        kind,
                        location,
                        spelling: spelling.to_string(),
                    });
                }
                continue;
            }

            let kind = classify_leaf(leaf, text);
            let location = self.location(start);
            self.unit.push_token(Token {
                kind,
                location,
                spelling: text.to_string(),
            });
        }
    }

    // -------------------------------------------------
    // Top-level items
    // -------------------------------------------------

    fn visit_items(&mut self, node: Node, parent: CursorId, scope: &str) {
        for child in named_children(node) {
            self.visit_item(child, parent, scope);
        }
    }

    fn visit_item(&mut self, node: Node, parent: CursorId, scope: &str) {
        match node.kind() {
            "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "declaration_list" => self.visit_items(node, parent, scope),
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_item(body, parent, scope);
                }
            }
            "preproc_def" => self.macro_definition(node, parent, false),
            "preproc_function_def" => self.macro_definition(node, parent, true),
            "preproc_include" => self.check_include(node),
            "declaration" => self.declaration(node, parent, scope),
            "function_definition" => self.function_definition(node, parent, scope),
            "type_definition" => self.type_definition(node, parent, scope),
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                self.tag(node, parent, scope, None);
            }
            "namespace_definition" => self.namespace(node, parent, scope),
            _ => {}
        }
    }

    fn namespace(&mut self, node: Node, parent: CursorId, scope: &str) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let inner_scope = usr::namespace(scope, &name);
        let location = node
            .child_by_field_name("name")
            .map(|n| self.location(n.start_byte()))
            .unwrap_or_else(|| self.location(node.start_byte()));

        let id = self.unit.push_cursor(
            parent,
            Cursor {
                kind: CursorKind::Namespace,
                spelling: name,
                usr: format!("c:{}", inner_scope),
                location,
                extent: self.node_range(node),
                parent: None,
                children: Vec::new(),
                detail: CursorDetail::None,
            },
        );

        if let Some(body) = node.child_by_field_name("body") {
            self.visit_items(body, id, &inner_scope);
        }
    }

    fn declaration(&mut self, node: Node, parent: CursorId, scope: &str) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let declarators = field_nodes(node, "declarator");

        if TagKind::from_node_kind(ty.kind()).is_some()
            && (ty.child_by_field_name("body").is_some() || declarators.is_empty())
        {
            self.tag(ty, parent, scope, None);
        }

        let base = self.base_type(node, ty);
        for declarator in declarators {
            match self.split_function(declarator, &base) {
                Some((result_type, function)) => {
                    self.function(node, function, result_type, parent, scope);
                }
                None => self.variable(node, declarator, &base, parent, scope),
            }
        }
    }

    fn function_definition(&mut self, node: Node, parent: CursorId, scope: &str) {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        let base = match node.child_by_field_name("type") {
            Some(ty) => self.base_type(node, ty),
            None => String::new(),
        };
        if let Some((result_type, function)) = self.split_function(declarator, &base) {
            self.function(node, function, result_type, parent, scope);
        }
    }

    fn function(
        &mut self,
        node: Node,
        declarator: Node,
        result_type: String,
        parent: CursorId,
        scope: &str,
    ) {
        let Some(name_node) = declarator.child_by_field_name("declarator") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let storage_class = self.storage_class(node);
        let inlined = self.is_inline(node);
        let usr = usr::function(
            scope,
            &self.file_name,
            &name,
            storage_class == StorageClass::Static,
        );

        let id = self.unit.push_cursor(
            parent,
            Cursor {
                kind: CursorKind::FunctionDecl,
                spelling: name.clone(),
                usr,
                location: self.location(name_node.start_byte()),
                extent: self.node_range(node),
                parent: None,
                children: Vec::new(),
                detail: CursorDetail::Function {
                    result_type,
                    storage_class,
                    inlined,
                },
            },
        );

        if let Some(params) = declarator.child_by_field_name("parameters") {
            self.parameters(params, id, &name);
        }
    }

    fn parameters(&mut self, list: Node, function: CursorId, function_name: &str) {
        for param in named_children(list) {
            if !matches!(
                param.kind(),
                "parameter_declaration" | "optional_parameter_declaration"
            ) {
                continue;
            }
            let Some(ty) = param.child_by_field_name("type") else {
                continue;
            };
            let declarator = param.child_by_field_name("declarator");
            if declarator.is_none() && self.text(ty) == "void" {
                continue;
            }

            let base = self.base_type(param, ty);
            let (name_node, ctype) = match declarator {
                Some(declarator) => self.declarator_type(declarator, base),
                None => (None, base),
            };
            let name = name_node
                .map(|n| self.text(n).to_string())
                .unwrap_or_default();
            let location = self.location(
                name_node
                    .map(|n| n.start_byte())
                    .unwrap_or_else(|| param.start_byte()),
            );

            self.unit.push_cursor(
                function,
                Cursor {
                    kind: CursorKind::ParmDecl,
                    usr: usr::param(&self.file_name, param.start_byte(), function_name, &name),
                    spelling: name,
                    location,
                    extent: self.node_range(param),
                    parent: None,
                    children: Vec::new(),
                    detail: CursorDetail::Typed {
                        ctype,
                        storage_class: StorageClass::None,
                    },
                },
            );
        }
    }

    fn variable(&mut self, node: Node, declarator: Node, base: &str, parent: CursorId, scope: &str) {
        let (name_node, ctype) = self.declarator_type(declarator, base.to_string());
        let Some(name_node) = name_node else {
            return;
        };
        let name = self.text(name_node).to_string();
        let storage_class = self.storage_class(node);
        let usr = usr::variable(
            scope,
            &self.file_name,
            &name,
            storage_class == StorageClass::Static,
        );

        self.unit.push_cursor(
            parent,
            Cursor {
                kind: CursorKind::VarDecl,
                spelling: name,
                usr,
                location: self.location(name_node.start_byte()),
                extent: self.node_range(node),
                parent: None,
                children: Vec::new(),
                detail: CursorDetail::Typed {
                    ctype,
                    storage_class,
                },
            },
        );
    }

    fn type_definition(&mut self, node: Node, parent: CursorId, scope: &str) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let declarators = field_nodes(node, "declarator");
        let first_name = declarators
            .first()
            .and_then(|d| self.declarator_type(*d, String::new()).0)
            .map(|n| self.text(n));

        let tag_usr = TagKind::from_node_kind(ty.kind())
            .map(|kind| self.tag_usr(ty, kind, scope, first_name));
        if tag_usr.is_some() && ty.child_by_field_name("body").is_some() {
            self.tag(ty, parent, scope, first_name);
        }

        let base = self.base_type(node, ty);
        for declarator in declarators {
            let (name_node, spelling) = self.declarator_type(declarator, base.clone());
            let Some(name_node) = name_node else {
                continue;
            };
            let name = self.text(name_node).to_string();

            // Only a plain `typedef T name;` keeps a link to T's declaration.
            let declaration_usr = if declarator.kind() == "type_identifier" {
                tag_usr
                    .clone()
                    .or_else(|| self.typedefs.get(self.text(ty)).cloned())
                    .unwrap_or_default()
            } else {
                String::new()
            };

            let usr = usr::typedef(&self.file_name, &name);
            self.typedefs.insert(name.clone(), usr.clone());

            self.unit.push_cursor(
                parent,
                Cursor {
                    kind: CursorKind::TypedefDecl,
                    spelling: name,
                    usr,
                    location: self.location(name_node.start_byte()),
                    extent: self.node_range(node),
                    parent: None,
                    children: Vec::new(),
                    detail: CursorDetail::Typedef {
                        underlying: TypeInfo {
                            spelling,
                            declaration_usr,
                        },
                    },
                },
            );
        }
    }

    // -------------------------------------------------
    // Tags: struct, union, enum, class
    // -------------------------------------------------

    fn tag_usr(&self, node: Node, kind: TagKind, scope: &str, typedef_name: Option<&str>) -> String {
        match node.child_by_field_name("name") {
            Some(name) => usr::tag(scope, kind, self.text(name)),
            None => match typedef_name {
                Some(typedef) => usr::typedef_named_tag(scope, kind, typedef),
                None => usr::unnamed_tag(&self.file_name, node.start_byte(), kind),
            },
        }
    }

    fn tag(
        &mut self,
        node: Node,
        parent: CursorId,
        scope: &str,
        typedef_name: Option<&str>,
    ) -> Option<CursorId> {
        let kind = TagKind::from_node_kind(node.kind())?;
        let name_node = node.child_by_field_name("name");
        let body = node.child_by_field_name("body");
        if name_node.is_none() && body.is_none() {
            return None;
        }

        let usr = self.tag_usr(node, kind, scope, typedef_name);
        let (spelling, location) = match name_node {
            Some(name) => (
                self.text(name).to_string(),
                self.location(name.start_byte()),
            ),
            // Anonymous tags sit on their keyword.
            None => (String::new(), self.location(node.start_byte())),
        };
        let cursor_kind = match kind {
            TagKind::Struct => CursorKind::StructDecl,
            TagKind::Union => CursorKind::UnionDecl,
            TagKind::Enum => CursorKind::EnumDecl,
            TagKind::Class => CursorKind::ClassDecl,
        };

        let id = self.unit.push_cursor(
            parent,
            Cursor {
                kind: cursor_kind,
                spelling,
                usr: usr.clone(),
                location,
                extent: self.node_range(node),
                parent: None,
                children: Vec::new(),
                detail: CursorDetail::None,
            },
        );

        if let Some(body) = body {
            match kind {
                TagKind::Enum => self.enumerators(body, id, &usr),
                _ => self.fields(body, id, &usr, scope),
            }
        }
        Some(id)
    }

    fn fields(&mut self, body: Node, parent: CursorId, parent_usr: &str, scope: &str) {
        for child in named_children(body) {
            match child.kind() {
                "field_declaration" => self.field(child, parent, parent_usr, scope),
                "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif" => {
                    self.fields(child, parent, parent_usr, scope)
                }
                _ => {}
            }
        }
    }

    fn field(&mut self, node: Node, parent: CursorId, parent_usr: &str, scope: &str) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        if TagKind::from_node_kind(ty.kind()).is_some() && ty.child_by_field_name("body").is_some() {
            self.tag(ty, parent, scope, None);
        }

        let base = self.base_type(node, ty);
        for declarator in field_nodes(node, "declarator") {
            // Member function declarations inside C++ classes.
            if self.split_function(declarator, &base).is_some() {
                continue;
            }
            let (name_node, ctype) = self.declarator_type(declarator, base.clone());
            let Some(name_node) = name_node else {
                continue;
            };
            let name = self.text(name_node).to_string();

            self.unit.push_cursor(
                parent,
                Cursor {
                    kind: CursorKind::FieldDecl,
                    usr: usr::field(parent_usr, &name),
                    spelling: name,
                    location: self.location(name_node.start_byte()),
                    extent: self.node_range(node),
                    parent: None,
                    children: Vec::new(),
                    detail: CursorDetail::Typed {
                        ctype,
                        storage_class: StorageClass::None,
                    },
                },
            );
        }
    }

    fn enumerators(&mut self, body: Node, parent: CursorId, parent_usr: &str) {
        let mut next: i64 = 0;
        for child in named_children(body) {
            if child.kind() != "enumerator" {
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node).to_string();

            let value = match child.child_by_field_name("value") {
                Some(expr) => {
                    let evaluated = ConstEvaluator::new(self.source, &self.constants).evaluate(expr);
                    match evaluated {
                        Some(value) => value,
                        None => {
                            self.diagnostic(
                                Severity::Warning,
                                expr.start_byte(),
                                format!("cannot evaluate value of enumerator '{}'", name),
                            );
                            next
                        }
                    }
                }
                None => next,
            };
            next = value.wrapping_add(1);
            self.constants.insert(name.clone(), value);

            self.unit.push_cursor(
                parent,
                Cursor {
                    kind: CursorKind::EnumConstantDecl,
                    usr: usr::enum_constant(parent_usr, &name),
                    spelling: name,
                    location: self.location(name_node.start_byte()),
                    extent: self.node_range(child),
                    parent: None,
                    children: Vec::new(),
                    detail: CursorDetail::EnumConstant { value },
                },
            );
        }
    }

    // -------------------------------------------------
    // Preprocessor
    // -------------------------------------------------

    fn macro_definition(&mut self, node: Node, parent: CursorId, function_like: bool) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let start = name_node.start_byte();

        // The extent runs from the name to the last token of the body.
        let mut end = name_node.end_byte();
        if function_like {
            if let Some(params) = node.child_by_field_name("parameters") {
                end = params.end_byte();
            }
        }
        if let Some(value) = node.child_by_field_name("value") {
            let text = self.text(value);
            if let Some((offset, _, spelling)) = lex_fragment(text)
                .into_iter()
                .filter(|(_, kind, _)| *kind != TokenKind::Comment)
                .last()
            {
                end = value.start_byte() + offset + spelling.len();
            }
        }

        self.unit.push_cursor(
            parent,
            Cursor {
                kind: CursorKind::MacroDefinition,
                usr: usr::macro_definition(&self.file_name, start, &name),
                spelling: name,
                location: self.location(start),
                extent: self.range(start, end),
                parent: None,
                children: Vec::new(),
                detail: CursorDetail::Macro { function_like },
            },
        );
    }

    fn check_include(&mut self, node: Node) {
        let Some(path) = node.child_by_field_name("path") else {
            return;
        };
        // System headers are not searched.
        if path.kind() != "string_literal" {
            return;
        }
        let target = self.text(path).trim_matches('"');

        let mut candidates = Vec::new();
        if let Some(dir) = self.path.parent() {
            candidates.push(dir.join(target));
        }
        candidates.extend(self.args.include_dirs.iter().map(|dir| dir.join(target)));

        if !candidates.iter().any(|candidate| candidate.is_file()) {
            self.diagnostic(
                Severity::Error,
                path.start_byte(),
                format!("'{}' file not found", target),
            );
        }
    }

    fn report_syntax_errors(&mut self, node: Node) {
        if node.is_error() {
            let snippet: String = self.text(node).chars().take(24).collect();
            self.diagnostic(
                Severity::Error,
                node.start_byte(),
                format!("syntax error near '{}'", snippet.trim()),
            );
            return;
        }
        if node.is_missing() {
            // `extern "C" {` guards open a block inside one conditional and
            // close it in another, which the grammar cannot nest.
            if node.kind() == "#endif" {
                debug!("Ignoring unterminated conditional at byte {}", node.start_byte());
                return;
            }
            self.diagnostic(
                Severity::Error,
                node.start_byte(),
                format!("expected '{}'", node.kind()),
            );
            return;
        }
        if !node.has_error() {
            return;
        }
        for child in children(node) {
            self.report_syntax_errors(child);
        }
    }

    // -------------------------------------------------
    // Types
    // -------------------------------------------------

    fn storage_class(&self, node: Node) -> StorageClass {
        children(node)
            .into_iter()
            .filter(|c| c.kind() == "storage_class_specifier")
            .find_map(|c| StorageClass::from_keyword(self.text(c)))
            .unwrap_or(StorageClass::None)
    }

    fn is_inline(&self, node: Node) -> bool {
        children(node).into_iter().any(|c| {
            matches!(
                self.text(c),
                "inline" | "__inline" | "__inline__" | "__forceinline"
            )
        })
    }

    /// Qualifiers plus the type specifier of a declaration, e.g. `const test_t`.
    fn base_type(&self, declaration: Node, ty: Node) -> String {
        let mut parts: Vec<String> = children(declaration)
            .into_iter()
            .filter(|c| c.kind() == "type_qualifier")
            .map(|c| normalize(self.text(c)))
            .collect();
        parts.push(self.specifier_spelling(ty));
        parts.join(" ")
    }

    fn specifier_spelling(&self, ty: Node) -> String {
        match TagKind::from_node_kind(ty.kind()) {
            Some(kind) => match ty.child_by_field_name("name") {
                Some(name) => format!("{} {}", kind.keyword(), normalize(self.text(name))),
                None => format!(
                    "{} (anonymous at {})",
                    kind.keyword(),
                    self.location(ty.start_byte())
                ),
            },
            None => normalize(self.text(ty)),
        }
    }

    /// Peels pointer declarators off a function declarator, returning the
    /// result type and the `function_declarator` node. Function pointers
    /// (parenthesized declarators) are not functions.
    fn split_function<'t>(&self, declarator: Node<'t>, base: &str) -> Option<(String, Node<'t>)> {
        let mut result = base.to_string();
        let mut current = declarator;
        loop {
            match current.kind() {
                "pointer_declarator" => {
                    result = self.pointer_to(&result, current, "*");
                    current = current.child_by_field_name("declarator")?;
                }
                "reference_declarator" => {
                    result = self.pointer_to(&result, current, "&");
                    current = first_declarator_child(current)?;
                }
                "attributed_declarator" => {
                    current = first_declarator_child(current)?;
                }
                "function_declarator" => {
                    let inner = current.child_by_field_name("declarator")?;
                    return is_name_node(inner.kind()).then_some((result, current));
                }
                _ => return None,
            }
        }
    }

    /// Resolves a declarator to its name node and the full type spelling.
    fn declarator_type<'t>(&self, declarator: Node<'t>, base: String) -> (Option<Node<'t>>, String) {
        let mut base = base;
        let mut suffix = String::new();
        let mut current = Some(declarator);

        while let Some(node) = current {
            match node.kind() {
                "pointer_declarator" | "abstract_pointer_declarator" => {
                    base = self.pointer_to(&base, node, "*");
                    current = node.child_by_field_name("declarator");
                }
                "reference_declarator" => {
                    base = self.pointer_to(&base, node, "&");
                    current = first_declarator_child(node);
                }
                "array_declarator" | "abstract_array_declarator" => {
                    let size = node
                        .child_by_field_name("size")
                        .map(|s| normalize(self.text(s)))
                        .unwrap_or_default();
                    suffix = format!("[{}]{}", size, suffix);
                    current = node.child_by_field_name("declarator");
                }
                "function_declarator" | "abstract_function_declarator" => {
                    let (name, inner) = node
                        .child_by_field_name("declarator")
                        .map(|d| self.abstract_declarator(d))
                        .unwrap_or_default();
                    let params = self.parameter_spelling(node.child_by_field_name("parameters"));
                    let spelling = if inner.is_empty() {
                        format!("{} {}", base, params)
                    } else {
                        format!("{} {}{}", base, inner, params)
                    };
                    return (name, spelling);
                }
                "parenthesized_declarator" | "init_declarator" | "attributed_declarator" => {
                    current = node
                        .child_by_field_name("declarator")
                        .or_else(|| first_declarator_child(node));
                }
                kind if is_name_node(kind) => return (Some(node), with_suffix(base, &suffix)),
                _ => break,
            }
        }
        (None, with_suffix(base, &suffix))
    }

    /// Renders a declarator with its name removed, e.g. `(*)` for `(*cb)`.
    fn abstract_declarator<'t>(&self, node: Node<'t>) -> (Option<Node<'t>>, String) {
        match node.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let qualifiers = self.qualifiers(node);
                let (name, inner) = node
                    .child_by_field_name("declarator")
                    .map(|d| self.abstract_declarator(d))
                    .unwrap_or_default();
                if qualifiers.is_empty() {
                    (name, format!("*{}", inner))
                } else {
                    (name, format!("*{} {}", qualifiers, inner).trim_end().to_string())
                }
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| normalize(self.text(s)))
                    .unwrap_or_default();
                let (name, inner) = node
                    .child_by_field_name("declarator")
                    .map(|d| self.abstract_declarator(d))
                    .unwrap_or_default();
                (name, format!("{}[{}]", inner, size))
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" => {
                let (name, inner) = first_declarator_child(node)
                    .map(|d| self.abstract_declarator(d))
                    .unwrap_or_default();
                (name, format!("({})", inner))
            }
            "function_declarator" | "abstract_function_declarator" => {
                let (name, inner) = node
                    .child_by_field_name("declarator")
                    .map(|d| self.abstract_declarator(d))
                    .unwrap_or_default();
                let params = self.parameter_spelling(node.child_by_field_name("parameters"));
                (name, format!("{}{}", inner, params))
            }
            kind if is_name_node(kind) => (Some(node), String::new()),
            _ => (None, String::new()),
        }
    }

    fn parameter_spelling(&self, list: Option<Node>) -> String {
        let Some(list) = list else {
            return "()".to_string();
        };
        let params: Vec<String> = named_children(list)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "variadic_parameter" => Some("...".to_string()),
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let ty = param.child_by_field_name("type")?;
                    let base = self.base_type(param, ty);
                    Some(match param.child_by_field_name("declarator") {
                        Some(declarator) => self.declarator_type(declarator, base).1,
                        None => base,
                    })
                }
                _ => None,
            })
            .collect();
        format!("({})", params.join(", "))
    }

    fn qualifiers(&self, node: Node) -> String {
        children(node)
            .into_iter()
            .filter(|c| c.kind() == "type_qualifier")
            .map(|c| self.text(c))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn pointer_to(&self, base: &str, declarator: Node, symbol: &str) -> String {
        let mut spelling = if base.ends_with('*') || base.ends_with('&') {
            format!("{}{}", base, symbol)
        } else {
            format!("{} {}", base, symbol)
        };
        let qualifiers = self.qualifiers(declarator);
        if !qualifiers.is_empty() {
            spelling.push_str(&qualifiers);
        }
        spelling
    }
}

// =====================================================
// Helpers
// =====================================================

fn leaves(root: Node) -> Vec<Node> {
    let mut leaves = Vec::new();
    let mut cursor = root.walk();
    loop {
        if cursor.goto_first_child() {
            continue;
        }
        leaves.push(cursor.node());
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return leaves;
            }
        }
    }
}

fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn field_nodes<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn first_declarator_child(node: Node) -> Option<Node> {
    named_children(node).into_iter().find(|c| {
        !matches!(
            c.kind(),
            "ms_call_modifier" | "attribute_declaration" | "attribute_specifier" | "type_qualifier"
        )
    })
}

fn is_name_node(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "field_identifier"
            | "type_identifier"
            | "qualified_identifier"
            | "operator_name"
            | "destructor_name"
            | "template_function"
    )
}

fn with_suffix(base: String, suffix: &str) -> String {
    if suffix.is_empty() {
        base
    } else {
        format!("{} {}", base, suffix)
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn classify_leaf(node: Node, text: &str) -> TokenKind {
    match node.kind() {
        "comment" => TokenKind::Comment,
        "identifier" | "field_identifier" | "type_identifier" | "statement_identifier"
        | "namespace_identifier" => TokenKind::Identifier,
        "primitive_type" | "true" | "false" | "null" | "nullptr" => TokenKind::Keyword,
        _ if node.is_named() => TokenKind::Literal,
        _ if text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '#') => {
            TokenKind::Keyword
        }
        _ => TokenKind::Punctuation,
    }
}

/// Splits a raw source fragment (a macro body) into tokens. Returns byte
/// offsets relative to the fragment.
fn lex_fragment(text: &str) -> Vec<(usize, TokenKind, &str)> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        let start = i;
        let rest = &text[i..];

        if c.is_whitespace() || c == '\\' {
            i += c.len_utf8();
            continue;
        }

        let kind = if rest.starts_with("//") {
            i = text.len();
            TokenKind::Comment
        } else if rest.starts_with("/*") {
            i += rest.find("*/").map(|p| p + 2).unwrap_or(rest.len());
            TokenKind::Comment
        } else if c.is_alphabetic() || c == '_' {
            i += rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            if C_KEYWORDS.contains(&&text[start..i]) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        } else if c.is_ascii_digit() {
            i += rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '.'))
                .unwrap_or(rest.len());
            TokenKind::Literal
        } else if c == '"' || c == '\'' {
            i += quoted_len(rest, c);
            TokenKind::Literal
        } else {
            i += c.len_utf8();
            TokenKind::Punctuation
        };

        tokens.push((start, kind, &text[start..i]));
    }
    tokens
}

fn quoted_len(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (index, ch) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return index + ch.len_utf8();
        }
    }
    rest.len()
}
