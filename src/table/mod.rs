pub mod overlay;
pub mod patch_line;
pub mod render;

pub use patch_line::{LineType, PatchLine};
pub use render::DiffRowBuilder;

use chrono::Utc;
use tracing::debug;

use crate::comments::{BoxOptions, CommentBox, Side};
use crate::markup::{HtmlBuilder, SafeHtml};

/// One comment widget placed in a comment row.
#[derive(Debug, Clone)]
pub struct CommentCell {
    pub widget: CommentBox,
    /// Whether this is its side's final comment at the anchor position.
    pub last: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommentRow {
    pub left: Option<CommentCell>,
    pub right: Option<CommentCell>,
}

impl CommentRow {
    pub fn cell(&self, side: Side) -> Option<&CommentCell> {
        match side {
            Side::A => self.left.as_ref(),
            Side::B => self.right.as_ref(),
        }
    }

    pub fn cell_mut(&mut self, side: Side) -> &mut Option<CommentCell> {
        match side {
            Side::A => &mut self.left,
            Side::B => &mut self.right,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum Row {
    Header(SafeHtml),
    ModeLine(SafeHtml),
    SkipRegion { count: usize, markup: SafeHtml },
    Content { line: PatchLine, markup: SafeHtml },
    Comment(CommentRow),
}

impl Row {
    /// The comment anchor of a content row.
    pub fn patch_line(&self) -> Option<PatchLine> {
        match self {
            Row::Content { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Row::Comment(_))
    }
}

/// The side-by-side table: diff rows from [`DiffRowBuilder`] interleaved with
/// comment rows. Positions only shift when rows are inserted or removed.
#[derive(Debug, Clone, Default)]
pub struct DiffTable {
    rows: Vec<Row>,
    displayed: bool,
    options: BoxOptions,
    file_comments: Vec<CommentBox>,
}

impl DiffTable {
    pub fn new(options: BoxOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Install a freshly rendered body, dropping every previous row.
    pub fn reset(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.displayed = false;
        self.file_comments.clear();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&Row> {
        self.rows.get(i)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_item(&self, i: usize) -> Option<PatchLine> {
        self.rows.get(i).and_then(Row::patch_line)
    }

    pub fn options(&self) -> &BoxOptions {
        &self.options
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn file_comments(&self) -> &[CommentBox] {
        &self.file_comments
    }

    pub fn add_file_comment(&mut self, widget: CommentBox) {
        if self.file_comments.iter().all(|b| b.id() != widget.id()) {
            self.file_comments.push(widget);
        }
    }

    pub(crate) fn insert_row(&mut self, at: usize, row: CommentRow) {
        self.rows.insert(at, Row::Comment(row));
    }

    /// Row index of the content row that shows `line` on `side`.
    pub fn find_anchor(&self, side: Side, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.rows
            .iter()
            .position(|r| r.patch_line().is_some_and(|p| p.line(side) == line))
    }

    /// Row index and side of the cell holding comment `id`.
    pub fn find_comment(&self, id: &str) -> Option<(usize, Side)> {
        self.rows.iter().enumerate().find_map(|(i, r)| match r {
            Row::Comment(cr) => [Side::A, Side::B]
                .into_iter()
                .find(|s| cr.cell(*s).is_some_and(|c| c.widget.id() == id))
                .map(|s| (i, s)),
            _ => None,
        })
    }

    pub fn comment_box(&self, id: &str) -> Option<&CommentBox> {
        if let Some((row, side)) = self.find_comment(id) {
            if let Some(Row::Comment(cr)) = self.rows.get(row) {
                return cr.cell(side).map(|c| &c.widget);
            }
        }
        self.file_comments.iter().find(|b| b.id() == id)
    }

    pub fn comment_box_mut(&mut self, id: &str) -> Option<&mut CommentBox> {
        if let Some((row, side)) = self.find_comment(id) {
            if let Some(Row::Comment(cr)) = self.rows.get_mut(row) {
                return cr.cell_mut(side).as_mut().map(|c| &mut c.widget);
            }
        }
        self.file_comments.iter_mut().find(|b| b.id() == id)
    }

    /// Expand or collapse one comment. Returns false if it is not shown.
    pub fn set_open(&mut self, id: &str, open: bool) -> bool {
        match self.comment_box_mut(id) {
            Some(b) => {
                b.set_open(open);
                true
            }
            None => false,
        }
    }

    /// Place one comment below its anchor row, filling the first free cell
    /// on its side among the existing comment rows there, or appending a row
    /// to the end of that group. File-level comments go to the file list.
    ///
    /// Returns the row index used, or `None` when the comment has no line or
    /// its line is not shown in this table.
    pub fn insert_comment(&mut self, widget: CommentBox) -> Option<usize> {
        let side = widget.side();
        let Some(line) = widget.comment().line else {
            self.add_file_comment(widget);
            return None;
        };
        let Some(anchor) = self.find_anchor(side, line) else {
            debug!(id = widget.id(), line, "no anchor row for comment");
            return None;
        };

        let mut row = anchor + 1;
        let mut target = None;
        while let Some(Row::Comment(cr)) = self.rows.get(row) {
            if target.is_none() && cr.cell(side).is_none() {
                target = Some(row);
            }
            row += 1;
        }

        let cell = CommentCell { widget, last: true };
        let at = match target {
            Some(at) => {
                if let Some(Row::Comment(cr)) = self.rows.get_mut(at) {
                    *cr.cell_mut(side) = Some(cell);
                }
                at
            }
            None => {
                let mut cr = CommentRow::default();
                *cr.cell_mut(side) = Some(cell);
                self.insert_row(row, cr);
                row
            }
        };
        self.relink_group(anchor, side);
        Some(at)
    }

    /// Drop a comment's cell, and its row when that leaves the row empty.
    pub fn remove_comment(&mut self, id: &str) -> Option<CommentBox> {
        let Some((row, side)) = self.find_comment(id) else {
            let pos = self.file_comments.iter().position(|b| b.id() == id)?;
            return Some(self.file_comments.remove(pos));
        };
        let Some(Row::Comment(cr)) = self.rows.get_mut(row) else {
            return None;
        };
        let removed = cr.cell_mut(side).take().map(|c| c.widget);
        let now_empty = cr.is_empty();

        let mut anchor = row;
        while anchor > 0 && self.rows[anchor].is_comment() {
            anchor -= 1;
        }
        if now_empty {
            self.rows.remove(row);
        }
        self.relink_group(anchor, side);
        removed
    }

    /// Recompute `last` for one side of the comment rows under `anchor`.
    fn relink_group(&mut self, anchor: usize, side: Side) {
        let mut last_filled = None;
        let mut row = anchor + 1;
        while let Some(Row::Comment(cr)) = self.rows.get_mut(row) {
            if let Some(cell) = cr.cell_mut(side).as_mut() {
                cell.last = false;
                last_filled = Some(row);
            }
            row += 1;
        }
        if let Some(Row::Comment(cr)) = last_filled.and_then(|r| self.rows.get_mut(r)) {
            if let Some(cell) = cr.cell_mut(side).as_mut() {
                cell.last = true;
            }
        }
    }

    /// Markup of the whole table, comment rows included.
    pub fn to_html(&self) -> SafeHtml {
        let now = Utc::now();
        let mut m = HtmlBuilder::new();
        if !self.file_comments.is_empty() {
            m.open_element("div");
            m.set_style_name("fileComments");
            for b in &self.file_comments {
                b.render(&self.options, now).write(&mut m);
            }
            m.close_element("div");
        }
        m.open_element("table");
        m.set_style_name("sideBySideTable");
        for row in &self.rows {
            match row {
                Row::Header(html)
                | Row::ModeLine(html)
                | Row::SkipRegion { markup: html, .. }
                | Row::Content { markup: html, .. } => {
                    m.append_html(html);
                }
                Row::Comment(cr) => self.write_comment_row(&mut m, cr, now),
            }
        }
        m.close_element("table");
        m.to_safe_html()
    }

    fn write_comment_row(&self, m: &mut HtmlBuilder, cr: &CommentRow, now: chrono::DateTime<Utc>) {
        m.open_tr();
        m.open_td();
        m.set_style_name("iconCell");
        m.close_td();
        for side in [Side::A, Side::B] {
            m.open_td();
            m.set_style_name("lineNumber");
            m.close_td();
            m.open_td();
            m.set_style_name("diffText");
            if let Some(cell) = cr.cell(side) {
                if cell.last {
                    m.add_style_name("lastComment");
                }
                cell.widget.render(&self.options, now).write(m);
            }
            m.close_td();
        }
        m.close_tr();
    }

    /// A standalone page wrapping the table.
    pub fn to_document(&self, title: &str) -> String {
        let mut m = HtmlBuilder::new();
        m.open_element("title");
        m.append(title);
        m.close_element("title");
        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">{}<style>{}</style></head><body>{}</body></html>\n",
            m.to_safe_html(),
            STYLESHEET,
            self.to_html()
        )
    }
}

const STYLESHEET: &str = "\
table.sideBySideTable{border-collapse:collapse;width:100%;font-family:monospace;font-size:12px}\
td.lineNumber{text-align:right;color:#888;padding:0 4px;user-select:none}\
td.iconCell{width:8px}\
td.fileColumnHeader{font-weight:bold;background:#eee;padding:2px 4px}\
td.fileLine{white-space:pre-wrap;padding:0 4px}\
td.fileLineNone{background:#f4f4f4}\
td.fileLineDELETE{background:#fdd}\
td.fileLineINSERT{background:#dfd}\
td.fileLineMode{font-style:italic}\
td.wdd,span.wdd{background:#faa}\
td.wdi,span.wdi{background:#9f9}\
td.skipLine{background:#def;color:#555;text-align:center}\
td.diffText{padding:2px 4px}\
div.commentBox{border:1px solid #ccc;margin:2px 0;background:#ffd;font-family:sans-serif}\
div.commentBox.draft{background:#fef}\
div.commentBox .header{cursor:pointer;padding:2px 4px}\
div.commentBox .summary{color:#666;margin-left:8px}\
div.commentBox .date{float:right;color:#888}\
div.commentBox .message{padding:2px 8px}\
";

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::comments::CommentInfo;

    fn content(line_type: LineType, a: usize, b: usize) -> Row {
        Row::Content {
            line: PatchLine::new(line_type, a, b),
            markup: SafeHtml::empty(),
        }
    }

    fn draft(id: &str, side: Side, line: usize) -> CommentBox {
        CommentBox::from_comment(
            CommentInfo {
                id: id.to_string(),
                side,
                line: Some(line),
                in_reply_to: None,
                message: Some(id.to_string()),
                updated: Utc::now(),
                author: None,
                draft: true,
            },
            true,
        )
    }

    fn table() -> DiffTable {
        let mut t = DiffTable::default();
        t.reset(vec![
            Row::Header(SafeHtml::empty()),
            content(LineType::Context, 1, 1),
            content(LineType::Replace, 2, 2),
            content(LineType::Insert, 0, 3),
        ]);
        t
    }

    fn cell_ids(t: &DiffTable, side: Side) -> Vec<(usize, String, bool)> {
        t.rows()
            .iter()
            .enumerate()
            .filter_map(|(i, r)| match r {
                Row::Comment(cr) => cr
                    .cell(side)
                    .map(|c| (i, c.widget.id().to_string(), c.last)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_find_anchor() {
        let t = table();
        assert_eq!(t.find_anchor(Side::A, 2), Some(2));
        assert_eq!(t.find_anchor(Side::B, 3), Some(3));
        assert_eq!(t.find_anchor(Side::A, 0), None);
        assert_eq!(t.find_anchor(Side::A, 3), None);
    }

    #[test]
    fn test_insert_comment_appends_and_fills() {
        let mut t = table();
        assert_eq!(t.insert_comment(draft("a1", Side::A, 2)), Some(3));
        assert_eq!(t.insert_comment(draft("a2", Side::A, 2)), Some(4));
        // Right side reuses the first row of the group.
        assert_eq!(t.insert_comment(draft("b1", Side::B, 2)), Some(3));
        assert_eq!(t.row_count(), 6);
        assert_eq!(
            cell_ids(&t, Side::A),
            vec![(3, "a1".to_string(), false), (4, "a2".to_string(), true)]
        );
        assert_eq!(cell_ids(&t, Side::B), vec![(3, "b1".to_string(), true)]);
        // The insert row moved down but keeps its anchor.
        assert_eq!(t.row_item(5).map(|p| p.line_type()), Some(LineType::Insert));
    }

    #[test]
    fn test_remove_comment_drops_empty_rows() {
        let mut t = table();
        t.insert_comment(draft("a1", Side::A, 2));
        t.insert_comment(draft("a2", Side::A, 2));
        t.insert_comment(draft("b1", Side::B, 2));

        assert!(t.remove_comment("a2").is_some());
        assert_eq!(t.row_count(), 5);
        assert_eq!(cell_ids(&t, Side::A), vec![(3, "a1".to_string(), true)]);

        assert!(t.remove_comment("a1").is_some());
        assert_eq!(t.row_count(), 5);
        assert!(t.remove_comment("b1").is_some());
        assert_eq!(t.row_count(), 4);
        assert!(t.remove_comment("b1").is_none());
    }

    #[test]
    fn test_file_comment_and_unknown_line() {
        let mut t = table();
        let mut info = draft("f", Side::B, 1).comment().clone();
        info.line = None;
        assert_eq!(t.insert_comment(CommentBox::from_comment(info, true)), None);
        assert_eq!(t.file_comments().len(), 1);
        assert_eq!(t.insert_comment(draft("x", Side::B, 99)), None);
        assert_eq!(t.row_count(), 4);
    }

    #[test]
    fn test_set_open() {
        let mut t = table();
        t.insert_comment(draft("a1", Side::A, 1));
        assert!(t.set_open("a1", false));
        assert!(!t.comment_box("a1").unwrap().is_open());
        assert!(!t.set_open("nope", true));
    }

    #[test]
    fn test_comment_row_markup() {
        let mut t = table();
        t.insert_comment(draft("a1", Side::A, 1));
        let html = t.to_html();
        assert!(html.as_str().starts_with("<table class=\"sideBySideTable\">"));
        assert!(html
            .as_str()
            .contains("<td class=\"diffText lastComment\"><div class=\"commentBox draft\" data-field=\"box\""));
        let doc = t.to_document("a <b>");
        assert!(doc.contains("<title>a &lt;b&gt;</title>"));
    }
}
