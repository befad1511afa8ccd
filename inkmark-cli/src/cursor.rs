/// Cursor over the flattened text of one container.
/// Rows are `\n`-separated lines; columns and offsets count chars, matching
/// the offsets highlights are stored in.
#[derive(Debug, Clone)]
pub struct CursorState {
    pub row: usize,
    pub col: usize,
    /// Char offset at which each line starts
    line_starts: Vec<usize>,
    lines: Vec<String>,
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            line_starts: vec![0],
            lines: vec![String::new()],
        }
    }

    /// Load content and compute line offsets
    pub fn set_content(&mut self, content: &str) {
        self.lines = content.split('\n').map(String::from).collect();
        self.line_starts.clear();

        let mut start = 0;
        for line in &self.lines {
            self.line_starts.push(start);
            start += line.chars().count() + 1;
        }

        self.row = 0;
        self.col = 0;
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Total length in chars
    pub fn len(&self) -> usize {
        match (self.line_starts.last(), self.lines.last()) {
            (Some(start), Some(line)) => start + line.chars().count(),
            _ => 0,
        }
    }

    /// Convert (row, col) to char offset
    pub fn cursor_to_offset(&self, row: usize, col: usize) -> usize {
        match self.line_starts.get(row) {
            Some(start) => start + col.min(self.line_len(row)),
            None => self.len(),
        }
    }

    /// Convert char offset to (row, col)
    pub fn offset_to_cursor(&self, offset: usize) -> (usize, usize) {
        for (i, &start) in self.line_starts.iter().enumerate().rev() {
            if offset >= start {
                return (i, (offset - start).min(self.line_len(i)));
            }
        }
        (0, 0)
    }

    pub fn offset(&self) -> usize {
        self.cursor_to_offset(self.row, self.col)
    }

    pub fn set_cursor_offset(&mut self, offset: usize) {
        let (row, col) = self.offset_to_cursor(offset);
        self.row = row;
        self.col = col;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|s| s.as_str())
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(|l| l.chars().count()).unwrap_or(0)
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_to_start(&mut self) {
        self.col = 0;
    }

    pub fn move_to_end(&mut self) {
        self.col = self.line_len(self.row);
    }

    pub fn move_to_top(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    pub fn move_to_bottom(&mut self) {
        self.row = self.lines.len().saturating_sub(1);
        self.col = 0;
    }

    pub fn move_word_forward(&mut self) {
        let chars: Vec<char> = match self.lines.get(self.row) {
            Some(line) => line.chars().collect(),
            None => return,
        };
        let mut col = self.col;

        while col < chars.len() && !chars[col].is_whitespace() {
            col += 1;
        }
        while col < chars.len() && chars[col].is_whitespace() {
            col += 1;
        }

        if col >= chars.len() && self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        } else {
            self.col = col;
        }
    }

    pub fn move_word_back(&mut self) {
        if self.col == 0 {
            if self.row > 0 {
                self.row -= 1;
                self.col = self.line_len(self.row);
            }
            return;
        }

        let chars: Vec<char> = match self.lines.get(self.row) {
            Some(line) => line.chars().collect(),
            None => return,
        };
        let mut col = self.col.min(chars.len());

        while col > 0 && chars[col - 1].is_whitespace() {
            col -= 1;
        }
        while col > 0 && !chars[col - 1].is_whitespace() {
            col -= 1;
        }

        self.col = col;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        let mut cursor = CursorState::new();
        cursor.set_content("Hello\nWorld\nTest");

        assert_eq!(cursor.cursor(), (0, 0));

        cursor.move_down();
        assert_eq!(cursor.cursor(), (1, 0));

        cursor.move_right();
        cursor.move_right();
        assert_eq!(cursor.cursor(), (1, 2));

        cursor.move_up();
        assert_eq!(cursor.cursor(), (0, 2));
    }

    #[test]
    fn test_offset_conversion() {
        let mut cursor = CursorState::new();
        cursor.set_content("Hello\nWorld");

        assert_eq!(cursor.cursor_to_offset(0, 0), 0);
        assert_eq!(cursor.cursor_to_offset(0, 5), 5);
        assert_eq!(cursor.cursor_to_offset(1, 0), 6);
        assert_eq!(cursor.cursor_to_offset(1, 5), 11);
        assert_eq!(cursor.len(), 11);

        assert_eq!(cursor.offset_to_cursor(0), (0, 0));
        assert_eq!(cursor.offset_to_cursor(6), (1, 0));
        assert_eq!(cursor.offset_to_cursor(8), (1, 2));
    }

    #[test]
    fn test_offsets_count_chars() {
        let mut cursor = CursorState::new();
        cursor.set_content("héllo\nwörld");

        assert_eq!(cursor.cursor_to_offset(1, 0), 6);
        assert_eq!(cursor.len(), 11);
        cursor.set_cursor_offset(8);
        assert_eq!(cursor.cursor(), (1, 2));
    }

    #[test]
    fn test_word_motion() {
        let mut cursor = CursorState::new();
        cursor.set_content("The quick fox");

        cursor.move_word_forward();
        assert_eq!(cursor.offset(), 4);
        cursor.move_word_forward();
        assert_eq!(cursor.offset(), 10);
        cursor.move_word_back();
        assert_eq!(cursor.offset(), 4);
    }
}
