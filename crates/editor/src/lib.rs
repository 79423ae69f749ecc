//! R-Droid Editor
//! 
//! Document text storage for build script rewriting:
//! - Rope-based text buffer addressed by byte offsets
//! - Undo/redo history
//! - Transactions that either apply every edit or none

pub mod buffer;

pub use buffer::{BufferError, EditOperation, TextBuffer, Transaction};
