//! Text Buffer
//!
//! Rope-backed document text with byte-addressed edits, undo/redo and
//! all-or-nothing transactions.

use ropey::Rope;
use std::ops::Range;
use std::path::PathBuf;
use tracing::debug;

/// Buffer errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("Byte range {start}..{end} is outside the document (length {len})")]
    OutOfRange { start: usize, end: usize, len: usize },
    #[error("Byte offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// Edit operation for undo/redo, positions are char indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    Insert {
        position: usize,
        text: String,
    },
    Delete {
        position: usize,
        text: String,
    },
    Replace {
        position: usize,
        old_text: String,
        new_text: String,
    },
    /// Operations applied together by one transaction
    Batch(Vec<EditOperation>),
}

impl EditOperation {
    /// Get the inverse operation for undo
    pub fn inverse(&self) -> Self {
        match self {
            EditOperation::Insert { position, text } => EditOperation::Delete {
                position: *position,
                text: text.clone(),
            },
            EditOperation::Delete { position, text } => EditOperation::Insert {
                position: *position,
                text: text.clone(),
            },
            EditOperation::Replace { position, old_text, new_text } => EditOperation::Replace {
                position: *position,
                old_text: new_text.clone(),
                new_text: old_text.clone(),
            },
            EditOperation::Batch(ops) => {
                EditOperation::Batch(ops.iter().rev().map(EditOperation::inverse).collect())
            }
        }
    }
}

/// Rope-backed text buffer
pub struct TextBuffer {
    /// The rope containing the text
    rope: Rope,
    /// File path (if loaded from file)
    path: Option<PathBuf>,
    /// Whether the buffer has been modified
    dirty: bool,
    /// Undo stack
    undo_stack: Vec<EditOperation>,
    /// Redo stack
    redo_stack: Vec<EditOperation>,
    /// Maximum undo history size
    max_undo_history: usize,
}

impl TextBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::from_str("")
    }

    /// Create a buffer from a string
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            path: None,
            dirty: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo_history: 1000,
        }
    }

    /// Load a buffer from a file
    pub async fn from_file(path: PathBuf) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(&path).await?;
        let mut buffer = Self::from_str(&content);
        buffer.path = Some(path);
        buffer.dirty = false;
        Ok(buffer)
    }

    /// Save the buffer to its file
    pub async fn save(&mut self) -> anyhow::Result<()> {
        if let Some(path) = &self.path {
            tokio::fs::write(path, self.rope.to_string()).await?;
            self.dirty = false;
            Ok(())
        } else {
            Err(anyhow::anyhow!("No file path set"))
        }
    }

    /// Save the buffer to a new file
    pub async fn save_as(&mut self, path: PathBuf) -> anyhow::Result<()> {
        tokio::fs::write(&path, self.rope.to_string()).await?;
        self.path = Some(path);
        self.dirty = false;
        Ok(())
    }

    /// Get the full text content
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Get the text in a byte range
    pub fn slice_bytes(&self, range: Range<usize>) -> Result<String, BufferError> {
        let chars = self.byte_range_to_chars(range)?;
        Ok(self.rope.slice(chars).to_string())
    }

    /// Get the number of lines
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the byte length
    pub fn byte_len(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Check if the buffer has been modified
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Get the file path
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Set the file path without touching the contents
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    fn byte_to_char(&self, offset: usize) -> Result<usize, BufferError> {
        let len = self.rope.len_bytes();
        if offset > len {
            return Err(BufferError::OutOfRange { start: offset, end: offset, len });
        }
        let char_idx = self.rope.byte_to_char(offset);
        if self.rope.char_to_byte(char_idx) != offset {
            return Err(BufferError::NotCharBoundary(offset));
        }
        Ok(char_idx)
    }

    fn byte_range_to_chars(&self, range: Range<usize>) -> Result<Range<usize>, BufferError> {
        let len = self.rope.len_bytes();
        if range.start > range.end || range.end > len {
            return Err(BufferError::OutOfRange { start: range.start, end: range.end, len });
        }
        Ok(self.byte_to_char(range.start)?..self.byte_to_char(range.end)?)
    }

    /// Replace the text in a byte range, recording one undo step
    pub fn replace_bytes(&mut self, range: Range<usize>, text: &str) -> Result<(), BufferError> {
        let op = self.apply_bytes(range, text)?;
        self.push_undo(op);
        Ok(())
    }

    /// Run `edits` as one transaction; on error every applied edit is reverted
    pub fn transaction<T, E, F>(&mut self, edits: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    {
        let was_dirty = self.dirty;
        let mut tx = Transaction { buffer: self, applied: Vec::new(), was_dirty };
        match edits(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    fn apply_bytes(&mut self, range: Range<usize>, text: &str) -> Result<EditOperation, BufferError> {
        let chars = self.byte_range_to_chars(range)?;
        let op = if chars.start == chars.end {
            EditOperation::Insert { position: chars.start, text: text.to_string() }
        } else if text.is_empty() {
            EditOperation::Delete {
                position: chars.start,
                text: self.rope.slice(chars.clone()).to_string(),
            }
        } else {
            EditOperation::Replace {
                position: chars.start,
                old_text: self.rope.slice(chars.clone()).to_string(),
                new_text: text.to_string(),
            }
        };
        self.apply_operation(&op);
        Ok(op)
    }

    /// Push an operation to the undo stack
    fn push_undo(&mut self, op: EditOperation) {
        self.undo_stack.push(op);
        self.redo_stack.clear();

        // Trim undo history if needed
        if self.undo_stack.len() > self.max_undo_history {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last operation
    pub fn undo(&mut self) -> bool {
        if let Some(op) = self.undo_stack.pop() {
            self.apply_operation(&op.inverse());
            self.redo_stack.push(op);
            true
        } else {
            false
        }
    }

    /// Redo the last undone operation
    pub fn redo(&mut self) -> bool {
        if let Some(op) = self.redo_stack.pop() {
            self.apply_operation(&op);
            self.undo_stack.push(op);
            true
        } else {
            false
        }
    }

    /// Apply an edit operation without recording it
    fn apply_operation(&mut self, op: &EditOperation) {
        match op {
            EditOperation::Insert { position, text } => {
                let pos = (*position).min(self.rope.len_chars());
                self.rope.insert(pos, text);
            }
            EditOperation::Delete { position, text } => {
                let pos = (*position).min(self.rope.len_chars());
                let end = (pos + text.chars().count()).min(self.rope.len_chars());
                self.rope.remove(pos..end);
            }
            EditOperation::Replace { position, old_text, new_text } => {
                let pos = (*position).min(self.rope.len_chars());
                let end = (pos + old_text.chars().count()).min(self.rope.len_chars());
                self.rope.remove(pos..end);
                self.rope.insert(pos, new_text);
            }
            EditOperation::Batch(ops) => {
                for op in ops {
                    self.apply_operation(op);
                }
            }
        }
        self.dirty = true;
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Edits applied through [`TextBuffer::transaction`]
pub struct Transaction<'a> {
    buffer: &'a mut TextBuffer,
    applied: Vec<EditOperation>,
    was_dirty: bool,
}

impl Transaction<'_> {
    /// Replace a byte range of the current text
    pub fn replace_bytes(&mut self, range: Range<usize>, text: &str) -> Result<(), BufferError> {
        let op = self.buffer.apply_bytes(range, text)?;
        self.applied.push(op);
        Ok(())
    }

    /// Insert text at a byte offset
    pub fn insert_bytes(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        self.replace_bytes(offset..offset, text)
    }

    /// Delete a byte range
    pub fn delete_bytes(&mut self, range: Range<usize>) -> Result<(), BufferError> {
        self.replace_bytes(range, "")
    }

    /// Number of edits applied so far
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Current text, including the edits applied so far
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    fn commit(self) {
        if self.applied.is_empty() {
            return;
        }
        debug!("Committing transaction with {} edits", self.applied.len());
        self.buffer.push_undo(EditOperation::Batch(self.applied));
    }

    fn rollback(self) {
        if self.applied.is_empty() {
            return;
        }
        debug!("Rolling back transaction with {} edits", self.applied.len());
        self.buffer.apply_operation(&EditOperation::Batch(self.applied).inverse());
        self.buffer.dirty = self.was_dirty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let buffer = TextBuffer::from_str("Hello, World!");
        assert_eq!(buffer.text(), "Hello, World!");
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.byte_len(), 13);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_replace_bytes() {
        let mut buffer = TextBuffer::from_str("minSdk 21");
        buffer.replace_bytes(7..9, "24").unwrap();
        assert_eq!(buffer.text(), "minSdk 24");
        assert!(buffer.is_dirty());
    }

    #[test]
    fn test_multibyte_offsets() {
        let mut buffer = TextBuffer::from_str("name 'héllo'\nx 1");
        // 'é' is two bytes, so the second line starts at byte 14
        assert_eq!(buffer.slice_bytes(14..17).unwrap(), "x 1");
        assert_eq!(buffer.replace_bytes(7..8, ""), Err(BufferError::NotCharBoundary(8)));
        buffer.replace_bytes(16..17, "2").unwrap();
        assert_eq!(buffer.text(), "name 'héllo'\nx 2");
    }

    #[test]
    fn test_out_of_range() {
        let mut buffer = TextBuffer::from_str("abc");
        assert!(matches!(
            buffer.replace_bytes(2..10, "x"),
            Err(BufferError::OutOfRange { len: 3, .. })
        ));
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_undo_redo() {
        let mut buffer = TextBuffer::from_str("Hello");
        buffer.replace_bytes(5..5, " World").unwrap();
        assert_eq!(buffer.text(), "Hello World");

        buffer.undo();
        assert_eq!(buffer.text(), "Hello");

        buffer.redo();
        assert_eq!(buffer.text(), "Hello World");
    }

    #[test]
    fn test_transaction_commits_as_one_undo_step() {
        let mut buffer = TextBuffer::from_str("a = 1\nb = 2\n");
        let result: Result<(), BufferError> = buffer.transaction(|tx| {
            tx.replace_bytes(10..11, "3")?;
            tx.replace_bytes(4..5, "9")?;
            tx.insert_bytes(12, "c = 4\n")?;
            Ok(())
        });
        result.unwrap();
        assert_eq!(buffer.text(), "a = 9\nb = 3\nc = 4\n");

        buffer.undo();
        assert_eq!(buffer.text(), "a = 1\nb = 2\n");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut buffer = TextBuffer::from_str("a = 1\nb = 2\n");
        let result = buffer.transaction(|tx| {
            tx.delete_bytes(0..6)?;
            tx.replace_bytes(100..101, "x")
        });
        assert!(result.is_err());
        assert_eq!(buffer.text(), "a = 1\nb = 2\n");
        assert!(!buffer.is_dirty());
        assert!(!buffer.undo());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.gradle");
        tokio::fs::write(&path, "plugins {}\n").await.unwrap();

        let mut buffer = TextBuffer::from_file(path.clone()).await.unwrap();
        buffer.replace_bytes(9..9, "\n").unwrap();
        buffer.save().await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "plugins {\n}\n");
        assert!(!buffer.is_dirty());
    }
}
