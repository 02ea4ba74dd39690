use tracing::debug;

use super::patch_line::{LineType, PatchLine};
use super::{DiffTable, Row};
use crate::git::types::{ChangeType, FileMode, PatchKey};
use crate::markup::{HtmlBuilder, SafeHtml};
use crate::script::{EditType, PatchScript, SparseHtmlFile};

const HEADER_OLD: &str = "Old Version";
const HEADER_NEW: &str = "New Version";
const DOWNLOAD: &str = "(Download)";
const FILE_TYPE_SYMLINK: &str = "Symbolic Link";
const FILE_TYPE_GITLINK: &str = "Git Link";

fn skip_region_label(count: usize) -> String {
    format!("... skipping {count} common lines ...")
}

/// Turns a [`PatchScript`] into the ordered rows of a side-by-side table.
///
/// Columns: icon, line number A, text A, line number B, text B.
pub struct DiffRowBuilder<'a> {
    script: &'a PatchScript,
    rows: Vec<Row>,
}

impl<'a> DiffRowBuilder<'a> {
    pub fn new(script: &'a PatchScript) -> Self {
        Self {
            script,
            rows: Vec::new(),
        }
    }

    /// Build every row: header, optional mode line, then hunks separated by
    /// skip regions.
    pub fn build(mut self) -> Vec<Row> {
        let script = self.script;
        let a = &script.a;
        let b = &script.b;
        let intraline = script.prefs.intraline_difference && script.has_intraline_difference();
        let ignore_ws = script.is_ignore_whitespace();

        self.rows.push(Row::Header(header_row(script)));

        if script.has_mode_change() {
            let mut nc = HtmlBuilder::new();
            open_line(&mut nc);
            append_mode_line(&mut nc, script.file_mode_a);
            append_mode_line(&mut nc, script.file_mode_b);
            nc.close_tr();
            self.rows.push(Row::ModeLine(nc.to_safe_html()));
        }

        let mut last_b = 0;
        for mut hunk in script.hunks() {
            if !hunk.is_start_of_file() {
                self.push_skip(hunk.cur_b() - last_b);
            }

            while hunk.next() {
                let mut nc = HtmlBuilder::new();
                if hunk.is_context_line() {
                    open_line(&mut nc);
                    let ctx = a.safe_html_line(hunk.cur_a());
                    append_line_text(&mut nc, hunk.cur_a(), LineType::Context, ctx, false, false);
                    if ignore_ws && b.contains(hunk.cur_b()) {
                        append_sparse_line(&mut nc, hunk.cur_b(), LineType::Context, b, false);
                    } else {
                        append_line_text(&mut nc, hunk.cur_b(), LineType::Context, ctx, false, false);
                    }
                    nc.close_tr();
                    hunk.inc_both();
                    self.rows.push(Row::Content {
                        line: PatchLine::new(LineType::Context, hunk.cur_a(), hunk.cur_b()),
                        markup: nc.to_safe_html(),
                    });
                } else if hunk.is_modified_line() {
                    let del = hunk.is_deleted_a();
                    let ins = hunk.is_inserted_b();
                    let replace = hunk.cur_edit().edit_type() == EditType::Replace;
                    let full = intraline && !replace;
                    open_line(&mut nc);

                    if del {
                        append_sparse_line(&mut nc, hunk.cur_a(), LineType::Delete, a, full);
                        hunk.inc_a();
                    } else if replace {
                        append_line_none(&mut nc, LineType::Delete);
                    } else {
                        append_line_none(&mut nc, LineType::Context);
                    }

                    if ins {
                        append_sparse_line(&mut nc, hunk.cur_b(), LineType::Insert, b, full);
                        hunk.inc_b();
                    } else if replace {
                        append_line_none(&mut nc, LineType::Insert);
                    } else {
                        append_line_none(&mut nc, LineType::Context);
                    }

                    nc.close_tr();

                    let line = match (del, ins) {
                        (true, true) => PatchLine::new(LineType::Replace, hunk.cur_a(), hunk.cur_b()),
                        (true, false) => PatchLine::new(LineType::Delete, hunk.cur_a(), 0),
                        _ => PatchLine::new(LineType::Insert, 0, hunk.cur_b()),
                    };
                    self.rows.push(Row::Content {
                        line,
                        markup: nc.to_safe_html(),
                    });
                }
            }
            last_b = hunk.cur_b();
        }

        if last_b != b.size() {
            self.push_skip(b.size() - last_b);
        }

        self.rows
    }

    fn push_skip(&mut self, count: usize) {
        let mut m = HtmlBuilder::new();
        m.open_tr();

        m.open_td();
        m.set_style_name("iconCell");
        m.add_style_name("skipLine");
        m.close_td();

        m.open_td();
        m.set_style_name("skipLine");
        m.set_attribute("colspan", 4);
        m.append(skip_region_label(count));
        m.close_td();

        m.close_tr();
        self.rows.push(Row::SkipRegion {
            count,
            markup: m.to_safe_html(),
        });
    }
}

impl DiffTable {
    /// Replace the table body with the rows of `script`, installed in one
    /// pass. Comment rows from an earlier render are discarded.
    pub fn render(&mut self, script: &PatchScript) {
        let rows = DiffRowBuilder::new(script).build();
        debug!(rows = rows.len(), file = %script.new_name, "rendered diff table");
        self.reset(rows);
    }
}

fn header_row(script: &PatchScript) -> SafeHtml {
    let mut m = HtmlBuilder::new();
    m.open_tr();

    m.open_td();
    m.add_style_name("iconCell");
    m.add_style_name("fileColumnHeader");
    m.close_td();

    m.open_td();
    m.add_style_name("fileColumnHeader");
    m.add_style_name("lineNumber");
    m.close_td();

    m.open_td();
    m.set_style_name("fileColumnHeader");
    m.set_attribute("width", "50%");
    match (&script.old_name, script.change_type) {
        (Some(old), ChangeType::Renamed | ChangeType::Copied) => {
            m.append(old);
        }
        _ => {
            m.append(HEADER_OLD);
        }
    }
    m.br();
    if script.a.size() > 0 {
        if let Some(links) = &script.download {
            match &links.key_a {
                Some(key) => download_link(&mut m, &links.base_url, key, "0"),
                None => download_link(&mut m, &links.base_url, &links.key_b, "1"),
            }
        }
    }
    m.close_td();

    m.open_td();
    m.add_style_name("fileColumnHeader");
    m.add_style_name("lineNumber");
    m.close_td();

    m.open_td();
    m.set_style_name("fileColumnHeader");
    m.set_attribute("width", "50%");
    m.append(HEADER_NEW);
    m.br();
    if script.b.size() > 0 {
        if let Some(links) = &script.download {
            download_link(&mut m, &links.base_url, &links.key_b, "0");
        }
    }
    m.close_td();

    m.close_tr();
    m.to_safe_html()
}

fn download_link(m: &mut HtmlBuilder, base_url: &str, key: &PatchKey, side: &str) {
    let encoded = encode_query(&key.to_string());
    m.open_anchor();
    m.set_attribute("href", format!("{base_url}cat/{encoded}^{side}"));
    m.append(DOWNLOAD);
    m.close_anchor();
}

/// Form-style query encoding: space becomes `+`, anything outside
/// `[A-Za-z0-9*-._]` is percent-escaped.
fn encode_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn append_mode_line(m: &mut HtmlBuilder, mode: FileMode) {
    m.open_td();
    m.set_style_name("lineNumber");
    m.nbsp();
    m.close_td();

    m.open_td();
    m.add_style_name("fileLine");
    m.add_style_name("fileLineMode");
    match mode {
        FileMode::File => {
            m.nbsp();
        }
        FileMode::Symlink => {
            m.append(FILE_TYPE_SYMLINK);
        }
        FileMode::Gitlink => {
            m.append(FILE_TYPE_GITLINK);
        }
    }
    m.close_td();
}

fn open_line(m: &mut HtmlBuilder) {
    m.open_tr();
    m.set_attribute("valign", "top");

    m.open_td();
    m.set_style_name("iconCell");
    m.close_td();
}

fn append_sparse_line(
    m: &mut HtmlBuilder,
    i: usize,
    line_type: LineType,
    src: &SparseHtmlFile,
    full_block: bool,
) {
    append_line_text(
        m,
        i,
        line_type,
        src.safe_html_line(i),
        src.has_trailing_edit(i),
        full_block,
    );
}

fn append_line_text(
    m: &mut HtmlBuilder,
    line_number_minus_one: usize,
    line_type: LineType,
    line_html: &SafeHtml,
    trailing_edit: bool,
    full_block: bool,
) {
    m.open_td();
    m.set_style_name("lineNumber");
    m.append(line_number_minus_one + 1);
    m.close_td();

    m.open_td();
    m.add_style_name("fileLine");
    match line_type {
        LineType::Context => {
            m.add_style_name("fileLineCONTEXT");
        }
        LineType::Delete => {
            m.add_style_name("fileLineDELETE");
            if trailing_edit || full_block {
                m.add_style_name("wdd");
            }
        }
        LineType::Insert => {
            m.add_style_name("fileLineINSERT");
            if trailing_edit || full_block {
                m.add_style_name("wdi");
            }
        }
        LineType::Replace => {}
    }
    m.append_html(line_html);
    m.close_td();
}

/// Empty placeholder cell pair for a side that has no line in this row.
fn append_line_none(m: &mut HtmlBuilder, line_type: LineType) {
    m.open_td();
    m.set_style_name("lineNumber");
    m.close_td();

    m.open_td();
    m.add_style_name("fileLine");
    match line_type {
        LineType::Delete => {
            m.add_style_name("fileLineDELETE");
        }
        LineType::Insert => {
            m.add_style_name("fileLineINSERT");
        }
        _ => {
            m.add_style_name("fileLineNone");
        }
    }
    m.close_td();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{build_script, DiffPrefs, DownloadLinks, SourceFile, WHOLE_FILE_CONTEXT};

    fn render(old: &str, new: &str, prefs: DiffPrefs) -> Vec<Row> {
        let script = build_script(
            &SourceFile::new("f.txt", old),
            &SourceFile::new("f.txt", new),
            &prefs,
        );
        DiffRowBuilder::new(&script).build()
    }

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    fn items(rows: &[Row]) -> Vec<Option<PatchLine>> {
        rows.iter().map(Row::patch_line).collect()
    }

    #[test]
    fn test_identical_files_header_and_skip() {
        let rows = render("a\nb\n", "a\nb\n", DiffPrefs::default());
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Row::Header(_)));
        assert!(matches!(rows[1], Row::SkipRegion { count: 2, .. }));
    }

    #[test]
    fn test_whole_file_context_one_row_per_line() {
        let prefs = DiffPrefs {
            context: WHOLE_FILE_CONTEXT,
            ..DiffPrefs::default()
        };
        let rows = render("a\nb\nc\n", "a\nb\nc\n", prefs);
        assert_eq!(rows.len(), 1 + 3);
        assert!(rows[1..]
            .iter()
            .all(|r| r.patch_line().is_some_and(|p| p.line_type() == LineType::Context)));
        assert_eq!(rows[3].patch_line(), Some(PatchLine::new(LineType::Context, 3, 3)));
    }

    #[test]
    fn test_empty_file_pair_only_header() {
        let rows = render("", "", DiffPrefs::default());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_mode_line_for_symlink() {
        let script = build_script(
            &SourceFile::new("l", "target\n"),
            &SourceFile::new("l", "other\n").with_mode(FileMode::Symlink),
            &DiffPrefs::default(),
        );
        let rows = DiffRowBuilder::new(&script).build();
        let Row::ModeLine(html) = &rows[1] else {
            panic!("expected mode line, got {:?}", rows[1]);
        };
        assert!(html.as_str().contains("Symbolic Link"));
        assert!(html.as_str().contains("fileLineMode\">&nbsp;</td>"));
    }

    #[test]
    fn test_context_replace_rows() {
        let rows = render("same\nfoo\n", "same\nbar\n", DiffPrefs::default());
        assert_eq!(
            items(&rows),
            vec![
                None,
                Some(PatchLine::new(LineType::Context, 1, 1)),
                Some(PatchLine::new(LineType::Replace, 2, 2)),
            ]
        );
        // No full-block highlight for a replace; the class comes from the
        // change reaching the end of the line.
        let Row::Content { markup, .. } = &rows[2] else {
            panic!("expected content row");
        };
        assert!(markup.as_str().contains("class=\"fileLine fileLineDELETE wdd\""));
    }

    #[test]
    fn test_pure_insert_gets_full_highlight() {
        let rows = render("a\nc\n", "a\nb\nc\n", DiffPrefs::default());
        assert_eq!(
            items(&rows)[2],
            Some(PatchLine::new(LineType::Insert, 0, 2))
        );
        let Row::Content { markup, .. } = &rows[2] else {
            panic!("expected content row");
        };
        let html = markup.as_str();
        assert!(html.contains("fileLineINSERT wdi"));
        assert!(html.contains("<td class=\"fileLine fileLineNone\"></td>"));
    }

    #[test]
    fn test_pure_delete_without_intraline() {
        let prefs = DiffPrefs {
            intraline_difference: false,
            ..DiffPrefs::default()
        };
        let rows = render("a\nb\nc\n", "a\nc\n", prefs);
        assert_eq!(items(&rows)[2], Some(PatchLine::new(LineType::Delete, 2, 0)));
        let Row::Content { markup, .. } = &rows[2] else {
            panic!("expected content row");
        };
        assert!(!markup.as_str().contains("wdd"));
    }

    #[test]
    fn test_replace_longer_on_b_uses_insert_rows() {
        let rows = render("x\nold\n", "x\nnew1\nnew2\n", DiffPrefs::default());
        assert_eq!(
            items(&rows)[1..],
            [
                Some(PatchLine::new(LineType::Context, 1, 1)),
                Some(PatchLine::new(LineType::Replace, 2, 2)),
                Some(PatchLine::new(LineType::Insert, 0, 3)),
            ]
        );
        let Row::Content { markup, .. } = &rows[3] else {
            panic!("expected content row");
        };
        // Missing side of a replace block is styled as a deletion.
        assert!(markup
            .as_str()
            .contains("<td class=\"lineNumber\"></td><td class=\"fileLine fileLineDELETE\"></td>"));
    }

    #[test]
    fn test_skip_regions_between_and_after_hunks() {
        let old = numbered(40);
        let new = old
            .replace("line 5\n", "line five\n")
            .replace("line 30\n", "line thirty\n");
        let prefs = DiffPrefs {
            context: 3,
            ..DiffPrefs::default()
        };
        let rows = render(&old, &new, prefs);

        let skips: Vec<usize> = rows
            .iter()
            .filter_map(|r| match r {
                Row::SkipRegion { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        // Hunk 1 covers lines 2..=8, hunk 2 covers 27..=33.
        assert_eq!(skips, vec![1, 18, 7]);

        let content = rows.iter().filter(|r| r.patch_line().is_some()).count();
        assert_eq!(content, 7 + 7);
        assert_eq!(rows.len(), 1 + 3 + content);
        assert!(rows.iter().any(|r| matches!(r, Row::SkipRegion { markup, .. }
            if markup.as_str().contains("colspan=\"4\">... skipping 18 common lines ...</td>"))));
    }

    #[test]
    fn test_leading_skip_when_hunk_not_at_start() {
        let old = numbered(30);
        let new = old.replace("line 20\n", "line twenty\n");
        let prefs = DiffPrefs {
            context: 2,
            ..DiffPrefs::default()
        };
        let rows = render(&old, &new, prefs);
        assert!(matches!(rows[1], Row::SkipRegion { count: 17, .. }));
        assert_eq!(rows[2].patch_line(), Some(PatchLine::new(LineType::Context, 18, 18)));
        assert!(matches!(rows.last(), Some(Row::SkipRegion { count: 8, .. })));
    }

    #[test]
    fn test_ignore_whitespace_uses_b_markup_for_context() {
        let prefs = DiffPrefs {
            ignore_whitespace: true,
            ..DiffPrefs::default()
        };
        let rows = render("if x {\ny();\n}\nold\n", "if x {\n  y();\n}\nnew\n", prefs);
        let Row::Content { line, markup } = &rows[2] else {
            panic!("expected content row");
        };
        assert_eq!(*line, PatchLine::new(LineType::Context, 2, 2));
        assert!(markup.as_str().contains(">y();</td>"));
        assert!(markup.as_str().contains(">  y();</td>"));
    }

    #[test]
    fn test_header_download_links_and_rename() {
        let mut script = build_script(
            &SourceFile::new("old name.txt", "a\n"),
            &SourceFile::new("new.txt", "b\n"),
            &DiffPrefs::default(),
        );
        script.download = Some(DownloadLinks {
            base_url: "https://review.example.com/".to_string(),
            key_b: PatchKey {
                patch_set: "42,3".to_string(),
                file: "new.txt".to_string(),
            },
            key_a: None,
        });
        let html = header_row(&script);
        let html = html.as_str();
        assert!(html.contains("old name.txt<br />"));
        assert!(html.contains("href=\"https://review.example.com/cat/42%2C3%2Cnew.txt^1\""));
        assert!(html.contains("href=\"https://review.example.com/cat/42%2C3%2Cnew.txt^0\""));
        assert!(html.contains("New Version<br />"));
    }

    #[test]
    fn test_header_without_links_for_empty_side() {
        let mut script = build_script(
            &SourceFile::missing("n.txt"),
            &SourceFile::new("n.txt", "x\n"),
            &DiffPrefs::default(),
        );
        script.download = Some(DownloadLinks {
            base_url: "/".to_string(),
            key_b: PatchKey {
                patch_set: "1,1".to_string(),
                file: "n.txt".to_string(),
            },
            key_a: None,
        });
        let html = header_row(&script);
        assert_eq!(html.as_str().matches("(Download)").count(), 1);
        assert!(html.as_str().contains("Old Version<br />"));
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("7,2,dir/a b.rs"), "7%2C2%2Cdir%2Fa+b.rs");
        assert_eq!(encode_query("ü"), "%C3%BC");
    }

    #[test]
    fn test_render_resets_table() {
        let script = build_script(
            &SourceFile::new("f", "a\n"),
            &SourceFile::new("f", "b\n"),
            &DiffPrefs::default(),
        );
        let mut table = DiffTable::default();
        table.render(&script);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row_item(0), None);
        assert_eq!(
            table.row_item(1),
            Some(PatchLine::new(LineType::Replace, 1, 1))
        );
    }
}
