use line_index::{LineCol, LineIndex, TextSize};

use crate::syntax::ByteRange;

/// Maps byte offsets to lines for caret-line decisions.
pub struct LineMap {
    index: LineIndex,
    len: usize,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        Self {
            index: LineIndex::new(text),
            len: text.len(),
        }
    }

    /// Zero-based line containing `offset` (clamped to the document end)
    pub fn line_of(&self, offset: usize) -> u32 {
        let offset = offset.min(self.len);
        self.index.line_col(TextSize::from(offset as u32)).line
    }

    /// Byte range of a line, including its terminating newline
    pub fn line_range(&self, line: u32) -> ByteRange {
        let start = self
            .index
            .offset(LineCol { line, col: 0 })
            .map(|offset| u32::from(offset) as usize)
            .unwrap_or(self.len);
        let end = self
            .index
            .offset(LineCol {
                line: line + 1,
                col: 0,
            })
            .map(|offset| u32::from(offset) as usize)
            .unwrap_or(self.len);
        ByteRange::new(start, end.max(start))
    }

    /// Range of the line containing `offset`
    pub fn line_range_at(&self, offset: usize) -> ByteRange {
        self.line_range(self.line_of(offset))
    }
}
