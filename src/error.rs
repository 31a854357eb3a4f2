use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A field, parameter or enum constant showed up without a parent entity
    /// of the expected kind.
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    #[error("Malformed function-like macro '{name}': {text}")]
    MalformedMacro { name: String, text: String },

    #[error("Start and end files differ: {start} != {end}")]
    ExtentSpansFiles { start: String, end: String },

    #[error("{first} and {second} would both be rendered to {page}")]
    DuplicatePage {
        page: String,
        first: String,
        second: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, DocError>;
