use crate::comments::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Context,
    Insert,
    Delete,
    Replace,
}

/// Anchor for one content row: its type plus 1-based line numbers on each
/// side, where 0 means the side has no line in this row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchLine {
    line_type: LineType,
    line_a: usize,
    line_b: usize,
}

impl PatchLine {
    pub fn new(line_type: LineType, line_a: usize, line_b: usize) -> Self {
        Self {
            line_type,
            line_a,
            line_b,
        }
    }

    pub fn line_type(&self) -> LineType {
        self.line_type
    }

    pub fn line_a(&self) -> usize {
        self.line_a
    }

    pub fn line_b(&self) -> usize {
        self.line_b
    }

    pub fn line(&self, side: Side) -> usize {
        match side {
            Side::A => self.line_a,
            Side::B => self.line_b,
        }
    }
}
