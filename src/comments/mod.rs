//! Comment attachment and comment markup.
//!
//! [`CommentIndex`] decides which declaration each comment documents, using
//! nothing but line adjacency. [`ParsedComment`] splits a comment into the
//! "Title / blank line / `Args:` block / body" convention.

pub mod index;
pub mod parser;

pub use index::CommentIndex;
pub use parser::{strip_comment_markers, ParsedComment};
