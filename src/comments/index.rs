use std::collections::BTreeMap;

use super::types::{CommentInfo, Side};

/// Comments grouped by side and line, each list in insertion order.
/// Rendering only reads from it.
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    a: BTreeMap<usize, Vec<CommentInfo>>,
    b: BTreeMap<usize, Vec<CommentInfo>>,
    file: Vec<CommentInfo>,
}

impl CommentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_comments(comments: impl IntoIterator<Item = CommentInfo>) -> Self {
        let mut index = Self::default();
        for c in comments {
            index.add(c);
        }
        index
    }

    pub fn add(&mut self, comment: CommentInfo) {
        let Some(line) = comment.line else {
            self.file.push(comment);
            return;
        };
        let map = match comment.side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        };
        map.entry(line).or_default().push(comment);
    }

    pub fn for_a(&self, line: usize) -> &[CommentInfo] {
        self.a.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn for_b(&self, line: usize) -> &[CommentInfo] {
        self.b.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// File-level comments (no line).
    pub fn file_comments(&self) -> &[CommentInfo] {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty() && self.file.is_empty()
    }

    pub fn len(&self) -> usize {
        self.a.values().chain(self.b.values()).map(Vec::len).sum::<usize>() + self.file.len()
    }
}
