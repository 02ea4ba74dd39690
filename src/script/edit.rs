/// Classification of a single edit region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditType {
    /// Lines added on side B only.
    Insert,
    /// Lines removed from side A only.
    Delete,
    /// Lines on both sides replaced by each other.
    Replace,
    /// Zero-width on both sides.
    Empty,
}

/// A half-open region `[begin_a, end_a)` on side A paired with
/// `[begin_b, end_b)` on side B. Line indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub begin_a: usize,
    pub end_a: usize,
    pub begin_b: usize,
    pub end_b: usize,
}

impl Edit {
    pub fn new(begin_a: usize, end_a: usize, begin_b: usize, end_b: usize) -> Self {
        Self {
            begin_a,
            end_a,
            begin_b,
            end_b,
        }
    }

    pub fn edit_type(&self) -> EditType {
        match (self.begin_a < self.end_a, self.begin_b < self.end_b) {
            (false, true) => EditType::Insert,
            (true, false) => EditType::Delete,
            (true, true) => EditType::Replace,
            (false, false) => EditType::Empty,
        }
    }

    pub fn len_a(&self) -> usize {
        self.end_a - self.begin_a
    }

    pub fn len_b(&self) -> usize {
        self.end_b - self.begin_b
    }
}
