pub mod comments;
pub mod config;
pub mod error;
pub mod extract;
pub mod frontend;
pub mod model;
pub mod render;

pub use comments::{CommentIndex, ParsedComment};
pub use config::Config;
pub use error::{DocError, Result};
pub use extract::{extract, extract_source, Extraction, Extractor};
pub use frontend::cpp::CompilerArgs;
pub use frontend::{
    CppFrontEnd, Cursor, CursorId, CursorKind, Diagnostic, FrontEnd, Severity,
    SourceLocation, StorageClass, Token, TokenKind, TranslationUnit,
};
pub use model::{Entity, ModelBuilder, ModelGraph, Module, ObjectType, Usr};
pub use render::{render_index, render_module, IndexEntry, PageView};
