use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

impl ChangeType {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Added => "A",
            ChangeType::Deleted => "D",
            ChangeType::Modified => "M",
            ChangeType::Renamed => "R",
            ChangeType::Copied => "C",
        }
    }
}

/// Git object mode of one side of a file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    File,
    Symlink,
    Gitlink,
}

impl FileMode {
    /// Map a raw tree entry mode (`0o100644`, `0o120000`, ...).
    pub fn from_raw(mode: i32) -> Self {
        match mode & 0o170000 {
            0o120000 => FileMode::Symlink,
            0o160000 => FileMode::Gitlink,
            _ => FileMode::File,
        }
    }
}

/// Identifies one file of one patch set for download links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchKey {
    pub patch_set: String,
    pub file: String,
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.patch_set, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_from_raw() {
        assert_eq!(FileMode::from_raw(0o100644), FileMode::File);
        assert_eq!(FileMode::from_raw(0o100755), FileMode::File);
        assert_eq!(FileMode::from_raw(0o120000), FileMode::Symlink);
        assert_eq!(FileMode::from_raw(0o160000), FileMode::Gitlink);
    }

    #[test]
    fn test_patch_key_display() {
        let key = PatchKey {
            patch_set: "1234,2".to_string(),
            file: "src/lib.rs".to_string(),
        };
        assert_eq!(key.to_string(), "1234,2,src/lib.rs");
    }
}
