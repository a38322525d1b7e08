//! Multi-line text buffer behind the editor pane.

use crate::utils::unicode::{char_count, char_to_byte_index};

const TAB: &str = "    ";

#[derive(Debug, Clone)]
pub struct Editor {
    lines: Vec<String>,
    /// Cursor row (line index).
    row: usize,
    /// Cursor column in characters, not bytes.
    col: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl Editor {
    pub fn from_text(text: &str) -> Self {
        let mut editor = Self::default();
        editor.set_text(text);
        editor
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace the whole buffer; the cursor moves to the end.
    pub fn set_text(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n");
        self.lines = normalized.split('\n').map(str::to_string).collect();
        self.row = self.lines.len() - 1;
        self.col = char_count(&self.lines[self.row]);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.insert_newline();
            return;
        }
        let line = &mut self.lines[self.row];
        let at = char_to_byte_index(line, self.col);
        line.insert(at, c);
        self.col += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.replace("\r\n", "\n").chars() {
            match c {
                '\t' => self.insert_tab(),
                '\r' => self.insert_newline(),
                c => self.insert_char(c),
            }
        }
    }

    pub fn insert_tab(&mut self) {
        for c in TAB.chars() {
            self.insert_char(c);
        }
    }

    /// Split the line at the cursor, carrying the current indentation over.
    pub fn insert_newline(&mut self) {
        let line = &mut self.lines[self.row];
        let at = char_to_byte_index(line, self.col);
        let rest = line.split_off(at);
        let indent: String = line.chars().take_while(|c| *c == ' ').collect();
        let indent_len = indent.chars().count();
        self.row += 1;
        self.lines.insert(self.row, indent + &rest);
        self.col = indent_len;
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let line = &mut self.lines[self.row];
            let at = char_to_byte_index(line, self.col - 1);
            line.remove(at);
            self.col -= 1;
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_count(&self.lines[self.row]);
            self.lines[self.row].push_str(&current);
        }
    }

    pub fn delete(&mut self) {
        let len = char_count(&self.lines[self.row]);
        if self.col < len {
            let line = &mut self.lines[self.row];
            let at = char_to_byte_index(line, self.col);
            line.remove(at);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_count(&self.lines[self.row]);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < char_count(&self.lines[self.row]) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.clamp_col();
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = char_count(&self.lines[self.row]);
    }

    fn clamp_col(&mut self) {
        self.col = self.col.min(char_count(&self.lines[self.row]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_and_read_back() {
        let editor = Editor::from_text("a = 1\r\nprint(a)\n");
        assert_eq!(editor.text(), "a = 1\nprint(a)\n");
        assert_eq!(editor.lines().len(), 3);
        assert_eq!(editor.cursor(), (2, 0));
    }

    #[test]
    fn newline_keeps_indentation() {
        let mut editor = Editor::from_text("for i in range(3):");
        editor.insert_newline();
        editor.insert_str("    print(i)");
        editor.insert_newline();
        editor.insert_char('x');
        assert_eq!(editor.text(), "for i in range(3):\n    print(i)\n    x");
    }

    #[test]
    fn backspace_joins_lines() {
        let mut editor = Editor::from_text("ab\ncd");
        editor.move_home();
        editor.backspace();
        assert_eq!(editor.text(), "abcd");
        assert_eq!(editor.cursor(), (0, 2));
    }

    #[test]
    fn delete_at_line_end_joins_next() {
        let mut editor = Editor::from_text("ab\ncd");
        editor.move_up();
        editor.move_end();
        editor.delete();
        assert_eq!(editor.text(), "abcd");
    }

    #[test]
    fn multibyte_editing() {
        let mut editor = Editor::from_text("héllo");
        editor.move_left();
        editor.move_left();
        editor.move_left();
        editor.backspace();
        assert_eq!(editor.text(), "hllo");
        editor.insert_char('ë');
        assert_eq!(editor.text(), "hëllo");
    }

    #[test]
    fn vertical_moves_clamp_the_column() {
        let mut editor = Editor::from_text("long line\nx");
        editor.move_up();
        editor.move_end();
        editor.move_down();
        assert_eq!(editor.cursor(), (1, 1));
    }
}
