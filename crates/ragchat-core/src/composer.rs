//! Composer input reducer
//!
//! Free-text input and a selected file are mutually exclusive. Selecting a
//! file replaces the text with a read-only placeholder. The reducer refuses
//! edits while that placeholder is shown, so the rule holds whatever UI
//! drives it.

use crate::error::ComposerError;
use crate::model::FileHandle;

pub const FILE_PLACEHOLDER_PREFIX: &str = "Selected file: ";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerAction {
    SelectFile(FileHandle),
    Edit(EditOp),
    Cancel,
    Submitted,
    Errored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    input: String,
    cursor: usize, // char position in input
    selected_file: Option<FileHandle>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_file(&self) -> Option<&FileHandle> {
        self.selected_file.as_ref()
    }

    pub fn can_submit(&self) -> bool {
        self.selected_file.is_some() || !self.input.trim().is_empty()
    }

    pub fn apply(&mut self, action: ComposerAction) -> Result<(), ComposerError> {
        match action {
            ComposerAction::SelectFile(file) => {
                self.input = format!("{}{}", FILE_PLACEHOLDER_PREFIX, file.name);
                self.cursor = self.input.chars().count();
                self.selected_file = Some(file);
            }
            ComposerAction::Edit(op) => {
                if self.selected_file.is_some() {
                    return Err(ComposerError::FileSelected);
                }
                self.edit(op);
            }
            ComposerAction::Cancel | ComposerAction::Submitted | ComposerAction::Errored => {
                self.reset();
            }
        }
        Ok(())
    }

    /// Clear the typed text only, leaving any selected file in place.
    pub(crate) fn take_input(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }

    fn reset(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.selected_file = None;
    }

    fn edit(&mut self, op: EditOp) {
        let char_count = self.input.chars().count();
        match op {
            EditOp::Insert(c) => {
                let byte_pos = char_to_byte_index(&self.input, self.cursor);
                self.input.insert(byte_pos, c);
                self.cursor += 1;
            }
            EditOp::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let byte_pos = char_to_byte_index(&self.input, self.cursor);
                    self.input.remove(byte_pos);
                }
            }
            EditOp::Delete => {
                if self.cursor < char_count {
                    let byte_pos = char_to_byte_index(&self.input, self.cursor);
                    self.input.remove(byte_pos);
                }
            }
            EditOp::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            EditOp::Right => {
                self.cursor = (self.cursor + 1).min(char_count);
            }
            EditOp::Home => {
                self.cursor = 0;
            }
            EditOp::End => {
                self.cursor = char_count;
            }
            EditOp::Clear => {
                self.input.clear();
                self.cursor = 0;
            }
        }
    }
}
