pub mod builder;
pub mod edit;
pub mod edit_list;
pub mod sparse_file;

pub use builder::{build_script, SourceFile};
pub use edit::{Edit, EditType};
pub use edit_list::{EditList, Hunk};
pub use sparse_file::SparseHtmlFile;

use crate::git::types::{ChangeType, FileMode, PatchKey};

pub const DEFAULT_CONTEXT: usize = 10;
/// Context large enough to show every line of the file.
pub const WHOLE_FILE_CONTEXT: usize = usize::MAX;

/// User preferences that shape how a script is computed and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPrefs {
    pub ignore_whitespace: bool,
    pub intraline_difference: bool,
    pub context: usize,
}

impl Default for DiffPrefs {
    fn default() -> Self {
        Self {
            ignore_whitespace: false,
            intraline_difference: true,
            context: DEFAULT_CONTEXT,
        }
    }
}

/// Where the header's download links point.
#[derive(Debug, Clone)]
pub struct DownloadLinks {
    pub base_url: String,
    /// Key of the new side. The old side defaults to its parent.
    pub key_b: PatchKey,
    /// Explicit key for the old side when comparing two patch sets.
    pub key_a: Option<PatchKey>,
}

/// Everything needed to render one file's side-by-side diff.
#[derive(Debug, Clone)]
pub struct PatchScript {
    pub change_type: ChangeType,
    pub old_name: Option<String>,
    pub new_name: String,
    pub file_mode_a: FileMode,
    pub file_mode_b: FileMode,
    pub prefs: DiffPrefs,
    pub a: SparseHtmlFile,
    pub b: SparseHtmlFile,
    pub edits: EditList,
    /// Set when intraline markup was actually computed for this script.
    pub intraline_computed: bool,
    pub download: Option<DownloadLinks>,
}

impl PatchScript {
    pub fn hunks(&self) -> edit_list::Hunks<'_> {
        self.edits.hunks()
    }

    pub fn is_ignore_whitespace(&self) -> bool {
        self.prefs.ignore_whitespace
    }

    pub fn has_intraline_difference(&self) -> bool {
        self.intraline_computed
    }

    /// Whether either side is something other than a regular file.
    pub fn has_mode_change(&self) -> bool {
        self.file_mode_a != FileMode::File || self.file_mode_b != FileMode::File
    }
}
