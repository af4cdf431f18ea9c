//! Input field handling for the terminal user interface.

/// A text input field with cursor position and active state management.
#[derive(Clone, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
    /// Display-only: the field ignores edits while set.
    pub read_only: bool,
}

impl InputField {
    /// Create a new empty input field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
            ..Self::default()
        }
    }

    /// Replace the field text, moving the cursor to the end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.len();
    }

    /// Insert a character at the current cursor position.
    /// The cursor is a byte index and always sits on a char boundary.
    pub fn handle_char(&mut self, c: char) {
        if self.read_only {
            return;
        }
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.read_only {
            return;
        }
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.read_only {
            return;
        }
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    /// Move cursor one character to the left.
    pub fn move_cursor_left(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    /// Move cursor one character to the right.
    pub fn move_cursor_right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multibyte_editing_keeps_cursor_on_char_boundaries() {
        let mut f = InputField::new();
        f.handle_char('é');
        f.handle_char('◆');
        assert_eq!(f.value, "é◆");
        f.move_cursor_left();
        f.handle_char('x');
        assert_eq!(f.value, "éx◆");
        f.handle_backspace();
        assert_eq!(f.value, "é◆");
        f.handle_delete();
        assert_eq!(f.value, "é");
        assert_eq!(f.cursor, "é".len());
    }

    #[test]
    fn test_backspace_at_start_and_delete_at_end_are_noops() {
        let mut f = InputField::with_value("ab");
        f.handle_delete();
        assert_eq!(f.value, "ab");
        f.move_cursor_left();
        f.move_cursor_left();
        f.handle_backspace();
        assert_eq!(f.value, "ab");
        assert_eq!(f.cursor, 0);
    }
}
