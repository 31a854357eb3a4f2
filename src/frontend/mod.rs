//! Front-end abstraction: tokens, cursors and the translation unit that owns them.
//!
//! A [`TranslationUnit`] is the per-extraction context. It is produced by a
//! [`FrontEnd`], borrowed by the comment index and the model builder, and
//! dropped once extraction finishes.

pub mod cpp;
mod eval;
mod usr;

pub use cpp::CppFrontEnd;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result};

// =====================================================
// Locations and tokens
// =====================================================

/// A position inside a source file. Lines and columns are 1-based, columns
/// count bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn contains(&self, location: &SourceLocation) -> bool {
        self.start.file == location.file
            && self.start.offset <= location.offset
            && location.offset < self.end.offset
    }

    fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

impl TokenKind {
    pub fn spelling(&self) -> &'static str {
        match self {
            TokenKind::Punctuation => "Punctuation",
            TokenKind::Keyword => "Keyword",
            TokenKind::Identifier => "Identifier",
            TokenKind::Literal => "Literal",
            TokenKind::Comment => "Comment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub spelling: String,
}

// =====================================================
// Cursors
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(usize);

impl CursorId {
    pub const ROOT: CursorId = CursorId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    TranslationUnit,
    StructDecl,
    UnionDecl,
    ClassDecl,
    EnumDecl,
    FieldDecl,
    EnumConstantDecl,
    FunctionDecl,
    VarDecl,
    ParmDecl,
    TypedefDecl,
    MacroDefinition,
    Namespace,
}

impl CursorKind {
    pub fn spelling(&self) -> &'static str {
        match self {
            CursorKind::TranslationUnit => "TranslationUnit",
            CursorKind::StructDecl => "StructDecl",
            CursorKind::UnionDecl => "UnionDecl",
            CursorKind::ClassDecl => "ClassDecl",
            CursorKind::EnumDecl => "EnumDecl",
            CursorKind::FieldDecl => "FieldDecl",
            CursorKind::EnumConstantDecl => "EnumConstantDecl",
            CursorKind::FunctionDecl => "FunctionDecl",
            CursorKind::VarDecl => "VarDecl",
            CursorKind::ParmDecl => "ParmDecl",
            CursorKind::TypedefDecl => "TypedefDecl",
            CursorKind::MacroDefinition => "macro definition",
            CursorKind::Namespace => "Namespace",
        }
    }

    /// Declaration kinds a free-standing comment may document. Typedefs and
    /// namespaces are deliberately absent.
    pub fn is_interesting(&self) -> bool {
        matches!(
            self,
            CursorKind::StructDecl
                | CursorKind::UnionDecl
                | CursorKind::ClassDecl
                | CursorKind::EnumDecl
                | CursorKind::FieldDecl
                | CursorKind::EnumConstantDecl
                | CursorKind::FunctionDecl
                | CursorKind::VarDecl
                | CursorKind::ParmDecl
                | CursorKind::MacroDefinition
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Invalid,
    #[default]
    None,
    Extern,
    Static,
    PrivateExtern,
    OpenClWorkGroupLocal,
    Auto,
    Register,
}

impl StorageClass {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "extern" => Some(StorageClass::Extern),
            "static" => Some(StorageClass::Static),
            "auto" => Some(StorageClass::Auto),
            "register" => Some(StorageClass::Register),
            "__private_extern__" => Some(StorageClass::PrivateExtern),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Invalid => "invalid",
            StorageClass::None => "none",
            StorageClass::Extern => "extern",
            StorageClass::Static => "static",
            StorageClass::PrivateExtern => "private_extern",
            StorageClass::OpenClWorkGroupLocal => "open_cl_work_group_local",
            StorageClass::Auto => "auto",
            StorageClass::Register => "register",
        }
    }
}

/// A type as seen from a declaration: its spelling and the USR of the
/// declaration that introduced it (empty for builtin and derived types).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    pub spelling: String,
    pub declaration_usr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorDetail {
    None,
    Typed {
        ctype: String,
        storage_class: StorageClass,
    },
    Function {
        result_type: String,
        storage_class: StorageClass,
        inlined: bool,
    },
    EnumConstant {
        value: i64,
    },
    Typedef {
        underlying: TypeInfo,
    },
    Macro {
        function_like: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Cursor {
    pub kind: CursorKind,
    pub spelling: String,
    pub usr: String,
    pub location: SourceLocation,
    pub extent: SourceRange,
    pub parent: Option<CursorId>,
    pub children: Vec<CursorId>,
    pub detail: CursorDetail,
}

impl Cursor {
    pub fn type_spelling(&self) -> &str {
        match &self.detail {
            CursorDetail::Typed { ctype, .. } => ctype,
            _ => "",
        }
    }

    pub fn storage_class(&self) -> StorageClass {
        match &self.detail {
            CursorDetail::Typed { storage_class, .. }
            | CursorDetail::Function { storage_class, .. } => *storage_class,
            _ => StorageClass::Invalid,
        }
    }

    pub fn result_type(&self) -> &str {
        match &self.detail {
            CursorDetail::Function { result_type, .. } => result_type,
            _ => "",
        }
    }

    pub fn is_function_inlined(&self) -> bool {
        matches!(&self.detail, CursorDetail::Function { inlined: true, .. })
    }

    pub fn enum_constant_value(&self) -> i64 {
        match &self.detail {
            CursorDetail::EnumConstant { value } => *value,
            _ => 0,
        }
    }

    pub fn typedef_underlying_type(&self) -> TypeInfo {
        match &self.detail {
            CursorDetail::Typedef { underlying } => underlying.clone(),
            _ => TypeInfo::default(),
        }
    }

    pub fn is_macro_function_like(&self) -> bool {
        matches!(&self.detail, CursorDetail::Macro { function_like: true })
    }
}

// =====================================================
// Diagnostics
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", self.location, severity, self.message)
    }
}

// =====================================================
// Translation unit
// =====================================================

/// Everything a front end knows about one parsed file.
pub struct TranslationUnit {
    main_file: Arc<str>,
    tokens: Vec<Token>,
    cursors: Vec<Cursor>,
    by_location: HashMap<SourceLocation, CursorId>,
    /// Token offset -> innermost covering cursor, filled by `index_tokens`.
    token_owners: HashMap<usize, CursorId>,
    canonical: HashMap<String, CursorId>,
    diagnostics: Vec<Diagnostic>,
    sources: HashMap<Arc<str>, String>,
}

impl TranslationUnit {
    pub(crate) fn new(main_file: Arc<str>, source: String) -> Self {
        let start = SourceLocation {
            file: main_file.clone(),
            line: 1,
            column: 1,
            offset: 0,
        };
        let (line, column) = end_position(&source);
        let end = SourceLocation {
            file: main_file.clone(),
            line,
            column,
            offset: source.len(),
        };
        let root = Cursor {
            kind: CursorKind::TranslationUnit,
            spelling: main_file.to_string(),
            usr: String::new(),
            location: start.clone(),
            extent: SourceRange { start, end },
            parent: None,
            children: Vec::new(),
            detail: CursorDetail::None,
        };

        let mut sources = HashMap::new();
        sources.insert(main_file.clone(), source);

        Self {
            main_file,
            tokens: Vec::new(),
            cursors: vec![root],
            by_location: HashMap::new(),
            token_owners: HashMap::new(),
            canonical: HashMap::new(),
            diagnostics: Vec::new(),
            sources,
        }
    }

    pub(crate) fn push_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Appends `cursor` as the last child of `parent`.
    pub(crate) fn push_cursor(&mut self, parent: CursorId, mut cursor: Cursor) -> CursorId {
        let id = CursorId(self.cursors.len());
        cursor.parent = Some(parent);
        self.token_owners.clear();
        self.by_location.entry(cursor.location.clone()).or_insert(id);
        if !cursor.usr.is_empty() {
            self.canonical.entry(cursor.usr.clone()).or_insert(id);
        }
        self.cursors.push(cursor);
        self.cursors[parent.0].children.push(id);
        id
    }

    /// Records the innermost cursor covering every token of the main file.
    /// Must run after the last `push_cursor`.
    pub(crate) fn index_tokens(&mut self) {
        let mut offsets: Vec<usize> = self
            .tokens
            .iter()
            .filter(|token| token.location.file == self.main_file)
            .map(|token| token.location.offset)
            .collect();
        offsets.sort_unstable();
        offsets.dedup();

        // Widest first so that narrower extents overwrite them. The sort is
        // stable: among equal widths the later cursor wins, as in the scan.
        let mut order: Vec<usize> = (1..self.cursors.len()).collect();
        order.sort_by_key(|&index| std::cmp::Reverse(self.cursors[index].extent.len()));

        let mut owners = vec![CursorId::ROOT; offsets.len()];
        for index in order {
            let extent = &self.cursors[index].extent;
            if extent.start.file != self.main_file {
                continue;
            }
            let first = offsets.partition_point(|&offset| offset < extent.start.offset);
            let last = offsets.partition_point(|&offset| offset < extent.end.offset);
            if first < last {
                owners[first..last].fill(CursorId(index));
            }
        }

        self.token_owners = offsets.into_iter().zip(owners).collect();
    }

    pub fn main_file(&self) -> &str {
        &self.main_file
    }

    pub fn root(&self) -> CursorId {
        CursorId::ROOT
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_location<'a>(&self, token: &'a Token) -> &'a SourceLocation {
        &token.location
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn cursor(&self, id: CursorId) -> &Cursor {
        &self.cursors[id.0]
    }

    pub fn children(&self, id: CursorId) -> &[CursorId] {
        &self.cursors[id.0].children
    }

    /// The cursor occupying `location`: a declaration whose own location is
    /// exactly `location` if one exists, otherwise the innermost cursor whose
    /// extent covers it.
    pub fn cursor_at(&self, location: &SourceLocation) -> CursorId {
        if let Some(id) = self.by_location.get(location) {
            return *id;
        }
        if location.file == self.main_file {
            if let Some(id) = self.token_owners.get(&location.offset) {
                return *id;
            }
        }
        self.innermost_covering(location)
    }

    fn innermost_covering(&self, location: &SourceLocation) -> CursorId {
        let mut best = CursorId::ROOT;
        let mut best_len = usize::MAX;
        for (index, cursor) in self.cursors.iter().enumerate().skip(1) {
            if cursor.extent.contains(location) && cursor.extent.len() <= best_len {
                best = CursorId(index);
                best_len = cursor.extent.len();
            }
        }
        best
    }

    /// The first cursor that declared the same entity as `id`.
    pub fn canonical(&self, id: CursorId) -> CursorId {
        let usr = &self.cursors[id.0].usr;
        if usr.is_empty() {
            return id;
        }
        self.canonical.get(usr).copied().unwrap_or(id)
    }

    pub fn is_from_main_file(&self, id: CursorId) -> bool {
        self.cursors[id.0].location.file == self.main_file
    }

    /// Raw source text covered by the cursor's extent.
    pub fn extent_contents(&self, id: CursorId) -> Result<String> {
        let extent = &self.cursors[id.0].extent;
        if extent.start.file != extent.end.file {
            return Err(DocError::ExtentSpansFiles {
                start: extent.start.file.to_string(),
                end: extent.end.file.to_string(),
            });
        }

        let range = extent.start.offset..extent.end.offset;
        match self.sources.get(&extent.start.file) {
            Some(source) => Ok(slice_lossy(source.as_bytes(), range)),
            None => {
                let bytes = std::fs::read(Path::new(&*extent.start.file))?;
                Ok(slice_lossy(&bytes, range))
            }
        }
    }
}

fn slice_lossy(bytes: &[u8], range: std::ops::Range<usize>) -> String {
    let end = range.end.min(bytes.len());
    let start = range.start.min(end);
    String::from_utf8_lossy(&bytes[start..end]).into_owned()
}

fn end_position(source: &str) -> (u32, u32) {
    let line = source.matches('\n').count() as u32 + 1;
    let last_line = source.rsplit('\n').next().unwrap_or("");
    (line, last_line.len() as u32 + 1)
}

// =====================================================
// Front end
// =====================================================

/// Something that can turn a C/C++ file into a [`TranslationUnit`].
pub trait FrontEnd {
    fn name(&self) -> &'static str;

    /// Parse `source` as if it were the contents of `path`.
    fn parse_source(&self, path: &Path, source: &str, args: &[String]) -> Result<TranslationUnit>;

    fn parse(&self, path: &Path, args: &[String]) -> Result<TranslationUnit> {
        if !path.is_file() {
            return Err(DocError::FileNotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(path)?;
        self.parse_source(path, &source, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(offset: usize, line: u32, column: u32) -> SourceLocation {
        SourceLocation {
            file: Arc::from("unit.h"),
            line,
            column,
            offset,
        }
    }

    fn leaf(kind: CursorKind, usr: &str, start: usize, end: usize) -> Cursor {
        Cursor {
            kind,
            spelling: usr.to_string(),
            usr: usr.to_string(),
            location: location(start, 1, start as u32 + 1),
            extent: SourceRange {
                start: location(start, 1, start as u32 + 1),
                end: location(end, 1, end as u32 + 1),
            },
            parent: None,
            children: Vec::new(),
            detail: CursorDetail::None,
        }
    }

    #[test]
    fn test_cursor_at_prefers_exact_location() {
        let mut unit = TranslationUnit::new(Arc::from("unit.h"), "x".repeat(40));
        let outer = unit.push_cursor(CursorId::ROOT, leaf(CursorKind::StructDecl, "outer", 0, 30));
        let inner = unit.push_cursor(outer, leaf(CursorKind::FieldDecl, "inner", 10, 20));

        assert_eq!(unit.cursor_at(&location(0, 1, 1)), outer);
        assert_eq!(unit.cursor_at(&location(10, 1, 11)), inner);
        assert_eq!(unit.cursor_at(&location(15, 1, 16)), inner);
        assert_eq!(unit.cursor_at(&location(25, 1, 26)), outer);
        assert_eq!(unit.cursor_at(&location(35, 1, 36)), CursorId::ROOT);
    }

    #[test]
    fn test_indexed_tokens_match_extent_scan() {
        let mut unit = TranslationUnit::new(Arc::from("unit.h"), "x".repeat(40));
        for offset in 0..40 {
            unit.push_token(Token {
                kind: TokenKind::Identifier,
                location: location(offset, 1, offset as u32 + 1),
                spelling: "x".to_string(),
            });
        }
        let outer = unit.push_cursor(CursorId::ROOT, leaf(CursorKind::StructDecl, "outer", 0, 30));
        let inner = unit.push_cursor(outer, leaf(CursorKind::FieldDecl, "inner", 10, 20));
        unit.push_cursor(outer, leaf(CursorKind::FieldDecl, "a", 22, 26));
        // Same extent as `a`: the later one wins.
        let b = unit.push_cursor(outer, leaf(CursorKind::FieldDecl, "b", 22, 26));
        unit.index_tokens();

        for offset in 0..40 {
            let at = location(offset, 1, offset as u32 + 1);
            let scanned = unit
                .by_location
                .get(&at)
                .copied()
                .unwrap_or_else(|| unit.innermost_covering(&at));
            assert_eq!(unit.cursor_at(&at), scanned);
        }
        assert_eq!(unit.cursor_at(&location(15, 1, 16)), inner);
        assert_eq!(unit.cursor_at(&location(24, 1, 25)), b);
        assert_eq!(unit.cursor_at(&location(28, 1, 29)), outer);
        assert_eq!(unit.cursor_at(&location(35, 1, 36)), CursorId::ROOT);
    }

    #[test]
    fn test_canonical_is_first_declaration() {
        let mut unit = TranslationUnit::new(Arc::from("unit.h"), "x".repeat(40));
        let first = unit.push_cursor(CursorId::ROOT, leaf(CursorKind::FunctionDecl, "c:@F@f", 0, 5));
        let second = unit.push_cursor(CursorId::ROOT, leaf(CursorKind::FunctionDecl, "c:@F@f", 10, 15));

        assert_eq!(unit.canonical(second), first);
        assert_eq!(unit.canonical(first), first);
        assert_eq!(unit.children(CursorId::ROOT), &[first, second]);
    }

    #[test]
    fn test_extent_contents_reads_cached_source() {
        let mut unit = TranslationUnit::new(Arc::from("unit.h"), "#define FOO 1\n".to_string());
        let id = unit.push_cursor(CursorId::ROOT, leaf(CursorKind::MacroDefinition, "m", 8, 13));
        assert_eq!(unit.extent_contents(id).unwrap(), "FOO 1");
    }

    #[test]
    fn test_extent_spanning_files_is_an_error() {
        let mut unit = TranslationUnit::new(Arc::from("unit.h"), "x".repeat(10));
        let mut cursor = leaf(CursorKind::MacroDefinition, "m", 0, 5);
        cursor.extent.end.file = Arc::from("other.h");
        let id = unit.push_cursor(CursorId::ROOT, cursor);

        assert!(matches!(
            unit.extent_contents(id),
            Err(DocError::ExtentSpansFiles { .. })
        ));
    }

    #[test]
    fn test_storage_class_strings() {
        assert_eq!(StorageClass::OpenClWorkGroupLocal.as_str(), "open_cl_work_group_local");
        assert_eq!(StorageClass::from_keyword("static"), Some(StorageClass::Static));
        assert_eq!(StorageClass::from_keyword("inline"), None);
        assert_eq!(
            serde_json::to_string(&StorageClass::PrivateExtern).unwrap(),
            "\"private_extern\""
        );
    }
}
