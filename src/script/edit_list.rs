use super::edit::Edit;

/// Ordered, non-overlapping edits between two line buffers together with the
/// context window used to group them into hunks.
#[derive(Debug, Clone)]
pub struct EditList {
    edits: Vec<Edit>,
    size_a: usize,
    size_b: usize,
    context: usize,
}

impl EditList {
    pub fn new(edits: Vec<Edit>, size_a: usize, size_b: usize, context: usize) -> Self {
        Self {
            edits,
            size_a,
            size_b,
            context,
        }
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn size_a(&self) -> usize {
        self.size_a
    }

    pub fn size_b(&self) -> usize {
        self.size_b
    }

    pub fn context(&self) -> usize {
        self.context
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Iterate the hunks of this list. Edits separated by no more than
    /// `2 * context` unchanged lines on either side share a hunk.
    pub fn hunks(&self) -> Hunks<'_> {
        Hunks {
            list: self,
            next_idx: 0,
        }
    }

    fn combine_a(&self, i: usize) -> bool {
        self.edits[i]
            .begin_a
            .saturating_sub(self.edits[i - 1].end_a)
            <= self.context.saturating_mul(2)
    }

    fn combine_b(&self, i: usize) -> bool {
        self.edits[i]
            .begin_b
            .saturating_sub(self.edits[i - 1].end_b)
            <= self.context.saturating_mul(2)
    }

    fn find_combined_end(&self, i: usize) -> usize {
        let mut end = i + 1;
        while end < self.edits.len() && (self.combine_a(end) || self.combine_b(end)) {
            end += 1;
        }
        end - 1
    }
}

pub struct Hunks<'a> {
    list: &'a EditList,
    next_idx: usize,
}

impl<'a> Iterator for Hunks<'a> {
    type Item = Hunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_idx >= self.list.edits.len() {
            return None;
        }
        let hunk = Hunk::new(self.list, self.next_idx);
        self.next_idx = hunk.end_idx + 1;
        Some(hunk)
    }
}

/// Cursor over the line pairs of one hunk.
///
/// Call [`Hunk::next`] before inspecting each line pair; then classify with
/// [`Hunk::is_context_line`] / [`Hunk::is_modified_line`] and advance the
/// consumed side(s) with `inc_a`, `inc_b` or `inc_both`.
#[derive(Debug)]
pub struct Hunk<'a> {
    list: &'a EditList,
    cur_idx: usize,
    end_idx: usize,
    cur_edit: Edit,
    a_cur: usize,
    b_cur: usize,
    a_end: usize,
    b_end: usize,
}

impl<'a> Hunk<'a> {
    fn new(list: &'a EditList, start_idx: usize) -> Self {
        let end_idx = list.find_combined_end(start_idx);
        let cur_edit = list.edits[start_idx];
        let end_edit = list.edits[end_idx];
        Self {
            list,
            cur_idx: start_idx,
            end_idx,
            cur_edit,
            a_cur: cur_edit.begin_a.saturating_sub(list.context),
            b_cur: cur_edit.begin_b.saturating_sub(list.context),
            a_end: end_edit.end_a.saturating_add(list.context).min(list.size_a),
            b_end: end_edit.end_b.saturating_add(list.context).min(list.size_b),
        }
    }

    pub fn cur_a(&self) -> usize {
        self.a_cur
    }

    pub fn cur_b(&self) -> usize {
        self.b_cur
    }

    pub fn end_a(&self) -> usize {
        self.a_end
    }

    pub fn end_b(&self) -> usize {
        self.b_end
    }

    pub fn cur_edit(&self) -> &Edit {
        &self.cur_edit
    }

    pub fn inc_a(&mut self) {
        self.a_cur += 1;
    }

    pub fn inc_b(&mut self) {
        self.b_cur += 1;
    }

    pub fn inc_both(&mut self) {
        self.a_cur += 1;
        self.b_cur += 1;
    }

    pub fn is_start_of_file(&self) -> bool {
        self.a_cur == 0 && self.b_cur == 0
    }

    pub fn is_deleted_a(&self) -> bool {
        self.cur_edit.begin_a <= self.a_cur && self.a_cur < self.cur_edit.end_a
    }

    pub fn is_inserted_b(&self) -> bool {
        self.cur_edit.begin_b <= self.b_cur && self.b_cur < self.cur_edit.end_b
    }

    pub fn is_modified_line(&self) -> bool {
        self.is_deleted_a() || self.is_inserted_b()
    }

    pub fn is_context_line(&self) -> bool {
        !self.is_modified_line()
    }

    /// Step onto the next line pair, moving to the following edit once the
    /// current one is consumed. Returns false when the hunk is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if !self.within(&self.cur_edit) && self.cur_idx < self.end_idx {
            self.cur_idx += 1;
            self.cur_edit = self.list.edits[self.cur_idx];
        }
        self.a_cur < self.a_end || self.b_cur < self.b_end
    }

    fn within(&self, edit: &Edit) -> bool {
        self.a_cur < edit.end_a || self.b_cur < edit.end_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_edits_no_hunks() {
        let list = EditList::new(Vec::new(), 5, 5, 3);
        assert_eq!(list.hunks().count(), 0);
    }

    #[test]
    fn test_close_edits_share_a_hunk() {
        // Gap of 4 unchanged lines, context 3: 4 <= 6 so they merge.
        let list = EditList::new(
            vec![Edit::new(2, 3, 2, 3), Edit::new(7, 8, 7, 8)],
            20,
            20,
            3,
        );
        let hunks: Vec<_> = list.hunks().collect();
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].cur_a(), 0);
        assert_eq!(hunks[0].end_a(), 11);
    }

    #[test]
    fn test_distant_edits_split() {
        let list = EditList::new(
            vec![Edit::new(2, 3, 2, 3), Edit::new(15, 16, 15, 16)],
            30,
            30,
            3,
        );
        let hunks: Vec<_> = list.hunks().collect();
        assert_eq!(hunks.len(), 2);
        assert_eq!((hunks[0].cur_b(), hunks[0].end_b()), (0, 6));
        assert_eq!((hunks[1].cur_b(), hunks[1].end_b()), (12, 19));
        assert!(hunks[0].is_start_of_file());
        assert!(!hunks[1].is_start_of_file());
    }

    #[test]
    fn test_walk_replace_with_trailing_insert() {
        // a: [x, old] b: [x, new1, new2]
        let list = EditList::new(vec![Edit::new(1, 2, 1, 3)], 2, 3, 3);
        let mut hunk = list.hunks().next().unwrap();
        let mut seen = Vec::new();
        while hunk.next() {
            if hunk.is_context_line() {
                seen.push("ctx");
                hunk.inc_both();
            } else {
                let del = hunk.is_deleted_a();
                let ins = hunk.is_inserted_b();
                seen.push(match (del, ins) {
                    (true, true) => "rep",
                    (true, false) => "del",
                    _ => "ins",
                });
                if del {
                    hunk.inc_a();
                }
                if ins {
                    hunk.inc_b();
                }
            }
        }
        assert_eq!(seen, vec!["ctx", "rep", "ins"]);
        assert_eq!((hunk.cur_a(), hunk.cur_b()), (2, 3));
    }

    #[test]
    fn test_walk_moves_between_edits() {
        let list = EditList::new(
            vec![Edit::new(1, 2, 1, 1), Edit::new(3, 3, 2, 3)],
            5,
            5,
            1,
        );
        let mut hunk = list.hunks().next().unwrap();
        let mut kinds = Vec::new();
        while hunk.next() {
            if hunk.is_context_line() {
                kinds.push('c');
                hunk.inc_both();
                continue;
            }
            if hunk.is_deleted_a() {
                kinds.push('d');
                hunk.inc_a();
            } else {
                kinds.push('i');
                hunk.inc_b();
            }
        }
        assert_eq!(kinds, vec!['c', 'd', 'c', 'i', 'c']);
    }
}
