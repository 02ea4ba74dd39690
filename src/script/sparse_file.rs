use std::collections::BTreeMap;

use crate::markup::SafeHtml;

#[derive(Debug, Clone)]
struct SparseLine {
    html: SafeHtml,
    trailing_edit: bool,
}

/// Rendered markup for the subset of a file's lines that a diff displays.
///
/// Indices are 0-based. Asking for a line that was never added is a caller
/// bug and panics.
#[derive(Debug, Clone, Default)]
pub struct SparseHtmlFile {
    size: usize,
    lines: BTreeMap<usize, SparseLine>,
}

impl SparseHtmlFile {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            lines: BTreeMap::new(),
        }
    }

    /// Number of lines in the whole file, not just the stored subset.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, i: usize) -> bool {
        self.lines.contains_key(&i)
    }

    pub fn stored_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn add_line(&mut self, i: usize, html: SafeHtml, trailing_edit: bool) {
        self.lines.insert(i, SparseLine {
            html,
            trailing_edit,
        });
    }

    pub fn safe_html_line(&self, i: usize) -> &SafeHtml {
        &self.lines[&i].html
    }

    /// Whether the intraline change on this line runs to its end.
    pub fn has_trailing_edit(&self, i: usize) -> bool {
        self.lines.get(&i).is_some_and(|l| l.trailing_edit)
    }
}
