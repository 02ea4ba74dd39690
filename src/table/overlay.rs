use tracing::{debug, warn};

use super::{CommentCell, CommentRow, DiffTable, Row};
use crate::comments::{CommentBox, CommentIndex, CommentInfo};

impl DiffTable {
    /// Insert comment rows under every content row that has comments.
    ///
    /// Comments on both sides of a position share rows pairwise; whatever
    /// is left on the longer side gets rows of its own. A published comment
    /// starts open when `expand_by_default` is set or when it is the last
    /// one on its side at that position. Calling this again before the next
    /// [`DiffTable::render`] does nothing.
    pub fn display(&mut self, index: &CommentIndex, expand_by_default: bool) {
        if index.is_empty() {
            return;
        }
        if self.displayed {
            warn!("comments already displayed on this table, ignoring");
            return;
        }
        self.displayed = true;

        for c in index.file_comments() {
            self.add_file_comment(CommentBox::from_comment(c.clone(), true));
        }

        let mut inserted = 0;
        let mut row = 0;
        while row < self.rows.len() {
            let Some(line) = self.rows[row].patch_line() else {
                row += 1;
                continue;
            };
            let all_a = index.for_a(line.line_a());
            let all_b = index.for_b(line.line_b());
            let mut left = all_a.iter();
            let mut right = all_b.iter();
            row += 1;

            loop {
                let l = left.next();
                let r = right.next();
                if l.is_none() && r.is_none() {
                    break;
                }
                let cr = CommentRow {
                    left: l.map(|c| cell(c, all_a, expand_by_default)),
                    right: r.map(|c| cell(c, all_b, expand_by_default)),
                };
                self.insert_row(row, cr);
                row += 1;
                inserted += 1;
            }
        }

        debug!(
            comments = index.len(),
            rows = inserted,
            "displayed comments"
        );
    }
}

fn cell(comment: &CommentInfo, group: &[CommentInfo], expand: bool) -> CommentCell {
    let last = group.last().is_some_and(|c| c.id == comment.id);
    CommentCell {
        widget: CommentBox::from_comment(comment.clone(), expand || last),
        last,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::comments::Side;
    use crate::markup::SafeHtml;
    use crate::table::{LineType, PatchLine};

    fn comment(id: &str, side: Side, line: usize) -> CommentInfo {
        CommentInfo {
            id: id.to_string(),
            side,
            line: Some(line),
            in_reply_to: None,
            message: Some(format!("note {id}")),
            updated: Utc::now(),
            author: None,
            draft: false,
        }
    }

    fn table() -> DiffTable {
        let mut t = DiffTable::default();
        t.reset(vec![
            Row::Header(SafeHtml::empty()),
            Row::Content {
                line: PatchLine::new(LineType::Context, 4, 4),
                markup: SafeHtml::empty(),
            },
            Row::Content {
                line: PatchLine::new(LineType::Replace, 5, 5),
                markup: SafeHtml::empty(),
            },
            Row::SkipRegion {
                count: 3,
                markup: SafeHtml::empty(),
            },
            Row::Content {
                line: PatchLine::new(LineType::Insert, 0, 9),
                markup: SafeHtml::empty(),
            },
        ]);
        t
    }

    fn ids(row: &Row) -> (Option<String>, Option<String>) {
        match row {
            Row::Comment(cr) => (
                cr.left.as_ref().map(|c| c.widget.id().to_string()),
                cr.right.as_ref().map(|c| c.widget.id().to_string()),
            ),
            other => panic!("expected comment row, got {other:?}"),
        }
    }

    #[test]
    fn test_pairs_then_solo() {
        let mut t = table();
        let index = CommentIndex::from_comments([
            comment("l1", Side::A, 5),
            comment("l2", Side::A, 5),
            comment("r1", Side::B, 5),
        ]);
        t.display(&index, false);

        assert_eq!(t.row_count(), 5 + 2);
        assert_eq!(ids(&t.rows()[3]), (Some("l1".into()), Some("r1".into())));
        assert_eq!(ids(&t.rows()[4]), (Some("l2".into()), None));
        assert!(matches!(t.rows()[5], Row::SkipRegion { .. }));

        let Row::Comment(first) = &t.rows()[3] else {
            unreachable!()
        };
        let l1 = first.left.as_ref().unwrap();
        let r1 = first.right.as_ref().unwrap();
        assert!(!l1.last);
        assert!(!l1.widget.is_open());
        assert!(r1.last);
        assert!(r1.widget.is_open());
        assert!(t.comment_box("l2").unwrap().is_open());
    }

    #[test]
    fn test_expand_by_default_opens_all() {
        let mut t = table();
        let index = CommentIndex::from_comments([
            comment("l1", Side::A, 4),
            comment("l2", Side::A, 4),
        ]);
        t.display(&index, true);
        assert!(t.comment_box("l1").unwrap().is_open());
        assert!(t.comment_box("l2").unwrap().is_open());
    }

    #[test]
    fn test_empty_index_is_noop() {
        let mut t = table();
        t.display(&CommentIndex::new(), true);
        assert_eq!(t.row_count(), 5);
        assert!(!t.is_displayed());
    }

    #[test]
    fn test_second_display_does_not_duplicate() {
        let mut t = table();
        let index = CommentIndex::from_comments([comment("r9", Side::B, 9)]);
        t.display(&index, false);
        t.display(&index, false);
        assert_eq!(t.row_count(), 6);
        assert_eq!(ids(&t.rows()[5]), (None, Some("r9".into())));

        // A fresh render clears the guard.
        let rows: Vec<Row> = t.rows().iter().filter(|r| !r.is_comment()).cloned().collect();
        t.reset(rows);
        t.display(&index, false);
        assert_eq!(t.row_count(), 6);
    }

    #[test]
    fn test_insert_row_line_zero_never_matches() {
        let mut t = table();
        // Line 0 is never a real line, even though the insert row has line_a == 0.
        let index = CommentIndex::from_comments([comment("b4", Side::B, 4)]);
        t.display(&index, false);
        assert_eq!(t.row_count(), 6);
        assert_eq!(ids(&t.rows()[2]), (None, Some("b4".into())));
    }

    #[test]
    fn test_file_comments_collected() {
        let mut t = table();
        let mut c = comment("f1", Side::B, 1);
        c.line = None;
        t.display(&CommentIndex::from_comments([c]), false);
        assert_eq!(t.row_count(), 5);
        assert_eq!(t.file_comments().len(), 1);
    }
}
