use std::collections::HashMap;
use std::path::Path;

use similar::{capture_diff_slices, Algorithm, ChangeTag, DiffTag, TextDiff};
use tracing::debug;

use super::edit::{Edit, EditType};
use super::edit_list::EditList;
use super::sparse_file::SparseHtmlFile;
use super::{DiffPrefs, PatchScript, WHOLE_FILE_CONTEXT};
use crate::git::types::{ChangeType, FileMode};
use crate::markup::{escape, SafeHtml};

const CLASS_DELETED: &str = "wdd";
const CLASS_INSERTED: &str = "wdi";

/// One side of a file pair as loaded from disk or a repository.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub mode: FileMode,
    pub exists: bool,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mode: FileMode::File,
            exists: true,
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Two paths on disk with the same file name are one file, not a rename.
    /// Takes `other`'s name in that case.
    pub fn same_file_as(mut self, other: &SourceFile) -> Self {
        if Path::new(&self.name).file_name() == Path::new(&other.name).file_name() {
            self.name = other.name.clone();
        }
        self
    }

    /// A side that does not exist (file added or deleted).
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            mode: FileMode::File,
            exists: false,
        }
    }
}

/// Compute the edit list and sparse markup for a pair of files.
pub fn build_script(old: &SourceFile, new: &SourceFile, prefs: &DiffPrefs) -> PatchScript {
    let raw_a: Vec<&str> = old.content.split_inclusive('\n').collect();
    let raw_b: Vec<&str> = new.content.split_inclusive('\n').collect();
    let lines_a: Vec<&str> = raw_a.iter().map(|l| strip_eol(l)).collect();
    let lines_b: Vec<&str> = raw_b.iter().map(|l| strip_eol(l)).collect();

    let mut edits = compute_edits(&raw_a, &raw_b, prefs.ignore_whitespace);
    if edits.is_empty() && prefs.context == WHOLE_FILE_CONTEXT {
        // A zero-width edit at the end yields one hunk spanning the file.
        edits.push(Edit::new(
            lines_a.len(),
            lines_a.len(),
            lines_b.len(),
            lines_b.len(),
        ));
    }
    let edit_list = EditList::new(edits, lines_a.len(), lines_b.len(), prefs.context);

    let intraline = if prefs.intraline_difference {
        intraline_markup(&edit_list, &lines_a, &lines_b)
    } else {
        IntralineMarkup::default()
    };

    let (a, b) = sparse_files(&edit_list, &lines_a, &lines_b, &intraline, prefs);

    let change_type = match (old.exists, new.exists) {
        (false, true) => ChangeType::Added,
        (true, false) => ChangeType::Deleted,
        _ if old.name != new.name => ChangeType::Renamed,
        _ => ChangeType::Modified,
    };

    debug!(
        file = %new.name,
        edits = edit_list.edits().len(),
        hunks = edit_list.hunks().count(),
        "built patch script"
    );

    PatchScript {
        change_type,
        old_name: (old.name != new.name).then(|| old.name.clone()),
        new_name: new.name.clone(),
        file_mode_a: old.mode,
        file_mode_b: new.mode,
        prefs: prefs.clone(),
        a,
        b,
        edits: edit_list,
        intraline_computed: prefs.intraline_difference,
        download: None,
    }
}

fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Comparison key for a line that still carries its terminator. Line endings
/// only compare equal when whitespace is ignored.
fn line_key(line: &str, ignore_whitespace: bool) -> String {
    if ignore_whitespace {
        line.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        line.to_string()
    }
}

/// Line-level Myers diff, with directly adjacent edits merged.
fn compute_edits(a: &[&str], b: &[&str], ignore_whitespace: bool) -> Vec<Edit> {
    let keys_a: Vec<String> = a.iter().map(|l| line_key(l, ignore_whitespace)).collect();
    let keys_b: Vec<String> = b.iter().map(|l| line_key(l, ignore_whitespace)).collect();

    let mut edits: Vec<Edit> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &keys_a, &keys_b) {
        let (tag, old, new) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            continue;
        }
        match edits.last_mut() {
            Some(prev) if prev.end_a == old.start && prev.end_b == new.start => {
                prev.end_a = old.end;
                prev.end_b = new.end;
            }
            _ => edits.push(Edit::new(old.start, old.end, new.start, new.end)),
        }
    }
    edits
}

#[derive(Debug, Default)]
struct IntralineMarkup {
    a: HashMap<usize, (SafeHtml, bool)>,
    b: HashMap<usize, (SafeHtml, bool)>,
}

/// Character-level highlighting for the paired lines of each replace edit.
/// Lines without a partner are changed in full.
fn intraline_markup(list: &EditList, a: &[&str], b: &[&str]) -> IntralineMarkup {
    let mut out = IntralineMarkup::default();
    for edit in list.edits() {
        if edit.edit_type() != EditType::Replace {
            continue;
        }
        let paired = edit.len_a().min(edit.len_b());
        for k in 0..paired {
            let (ia, ib) = (edit.begin_a + k, edit.begin_b + k);
            let (html_a, html_b, trailing) = char_diff(a[ia], b[ib]);
            out.a.insert(ia, (html_a, trailing));
            out.b.insert(ib, (html_b, trailing));
        }
        for ia in edit.begin_a + paired..edit.end_a {
            out.a.insert(ia, (SafeHtml::from_text(a[ia]), true));
        }
        for ib in edit.begin_b + paired..edit.end_b {
            out.b.insert(ib, (SafeHtml::from_text(b[ib]), true));
        }
    }
    out
}

/// Accumulates one side's markup, opening a highlight span per changed run.
struct SpanWriter {
    out: String,
    class: &'static str,
    open: bool,
}

impl SpanWriter {
    fn new(class: &'static str) -> Self {
        Self {
            out: String::new(),
            class,
            open: false,
        }
    }

    fn push(&mut self, text: &str, changed: bool) {
        if changed && !self.open {
            self.out.push_str("<span class=\"");
            self.out.push_str(self.class);
            self.out.push_str("\">");
            self.open = true;
        } else if !changed && self.open {
            self.out.push_str("</span>");
            self.open = false;
        }
        self.out.push_str(&escape(text));
    }

    fn finish(mut self) -> SafeHtml {
        if self.open {
            self.out.push_str("</span>");
        }
        SafeHtml::from_trusted(self.out)
    }
}

/// Returns both sides' markup and whether the difference reaches the end of
/// the line.
fn char_diff(a: &str, b: &str) -> (SafeHtml, SafeHtml, bool) {
    let diff = TextDiff::from_chars(a, b);
    let mut wa = SpanWriter::new(CLASS_DELETED);
    let mut wb = SpanWriter::new(CLASS_INSERTED);
    let mut tail_changed = false;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                wa.push(change.value(), false);
                wb.push(change.value(), false);
                tail_changed = false;
            }
            ChangeTag::Delete => {
                wa.push(change.value(), true);
                tail_changed = true;
            }
            ChangeTag::Insert => {
                wb.push(change.value(), true);
                tail_changed = true;
            }
        }
    }
    (wa.finish(), wb.finish(), tail_changed)
}

/// Walk every hunk the way the renderer will and store the lines it reads.
/// Side B only holds context lines when whitespace is ignored and the text
/// differs from side A.
fn sparse_files(
    list: &EditList,
    a: &[&str],
    b: &[&str],
    intraline: &IntralineMarkup,
    prefs: &DiffPrefs,
) -> (SparseHtmlFile, SparseHtmlFile) {
    let mut fa = SparseHtmlFile::new(a.len());
    let mut fb = SparseHtmlFile::new(b.len());

    let line_a = |i: usize| {
        intraline
            .a
            .get(&i)
            .cloned()
            .unwrap_or_else(|| (SafeHtml::from_text(a[i]), false))
    };
    let line_b = |i: usize| {
        intraline
            .b
            .get(&i)
            .cloned()
            .unwrap_or_else(|| (SafeHtml::from_text(b[i]), false))
    };

    for mut hunk in list.hunks() {
        while hunk.next() {
            if hunk.is_context_line() {
                let (ia, ib) = (hunk.cur_a(), hunk.cur_b());
                let (html, trailing) = line_a(ia);
                fa.add_line(ia, html, trailing);
                if prefs.ignore_whitespace && a[ia] != b[ib] {
                    let (html, trailing) = line_b(ib);
                    fb.add_line(ib, html, trailing);
                }
                hunk.inc_both();
            } else {
                if hunk.is_deleted_a() {
                    let ia = hunk.cur_a();
                    let (html, trailing) = line_a(ia);
                    fa.add_line(ia, html, trailing);
                    hunk.inc_a();
                }
                if hunk.is_inserted_b() {
                    let ib = hunk.cur_b();
                    let (html, trailing) = line_b(ib);
                    fb.add_line(ib, html, trailing);
                    hunk.inc_b();
                }
            }
        }
    }
    (fa, fb)
}
