use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{ErrorCode, ObjectType, Repository};
use tracing::debug;

use super::types::FileMode;
use crate::script::SourceFile;

pub struct RepoCache {
    repo: Repository,
    workdir: PathBuf,
}

/// Repository-relative path with `/` separators.
fn display_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl RepoCache {
    pub fn open(path: &Path) -> Result<Self> {
        let repo =
            Repository::discover(path).context("Not a git repository (or any parent directory)")?;
        let workdir = repo
            .workdir()
            .context("Bare repositories are not supported")?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Map a path given on the command line (relative to the current
    /// directory, or absolute) to one relative to the working tree. The file
    /// itself does not need to exist.
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let abs = match (abs.parent(), abs.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| abs.clone()),
            _ => abs.clone(),
        };
        let root = self
            .workdir
            .canonicalize()
            .unwrap_or_else(|_| self.workdir.clone());
        abs.strip_prefix(&root)
            .map(Path::to_path_buf)
            .with_context(|| format!("{} is outside the repository", path.display()))
    }

    /// The file at `path` as of `rev`, or a missing side when the revision
    /// does not contain it.
    pub fn read_revision(&self, rev: &str, path: &Path) -> Result<SourceFile> {
        let name = display_name(path);
        let obj = self
            .repo
            .revparse_single(rev)
            .with_context(|| format!("Could not resolve: {rev}"))?;
        let tree = obj
            .peel_to_commit()
            .with_context(|| format!("{rev} does not point to a commit"))?
            .tree()?;

        let entry = match tree.get_path(path) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(rev, path = %name, "not present in revision");
                return Ok(SourceFile::missing(name));
            }
            Err(e) => return Err(e.into()),
        };

        let mode = FileMode::from_raw(entry.filemode());
        let content = match entry.kind() {
            Some(ObjectType::Commit) => format!("Subproject commit {}\n", entry.id()),
            _ => {
                let blob = entry
                    .to_object(&self.repo)?
                    .peel_to_blob()
                    .with_context(|| format!("{name} is not a file in {rev}"))?;
                String::from_utf8_lossy(blob.content()).into_owned()
            }
        };
        Ok(SourceFile::new(name, content).with_mode(mode))
    }

    /// The file at `path` in the working tree. Symlinks yield their target,
    /// submodules their checked-out commit.
    pub fn read_workdir(&self, path: &Path) -> Result<SourceFile> {
        let name = display_name(path);
        let full = self.workdir.join(path);
        let meta = match fs::symlink_metadata(&full) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SourceFile::missing(name)),
            Err(e) => return Err(e).with_context(|| format!("reading {}", full.display())),
        };

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&full)?;
            return Ok(SourceFile::new(name, target.to_string_lossy()).with_mode(FileMode::Symlink));
        }
        if meta.is_dir() {
            let sub = self
                .repo
                .find_submodule(&name)
                .with_context(|| format!("{name} is a directory"))?;
            let id = sub
                .workdir_id()
                .or_else(|| sub.head_id())
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Ok(SourceFile::new(name, format!("Subproject commit {id}\n"))
                .with_mode(FileMode::Gitlink));
        }

        let bytes = fs::read(&full).with_context(|| format!("reading {}", full.display()))?;
        Ok(SourceFile::new(name, String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use git2::Signature;
    use tempfile::TempDir;

    use super::*;

    fn commit_all(repo: &Repository, paths: &[&str]) {
        let mut index = repo.index().unwrap();
        for p in paths {
            index.add_path(Path::new(p)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();
    }

    fn repo_with(files: &[(&str, &str)]) -> (TempDir, RepoCache) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        commit_all(&repo, &files.iter().map(|(n, _)| *n).collect::<Vec<_>>());
        let cache = RepoCache::open(dir.path()).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_read_revision_and_workdir() {
        let (dir, cache) = repo_with(&[("a.txt", "one\ntwo\n")]);
        fs::write(dir.path().join("a.txt"), "one\n2\n").unwrap();

        let old = cache.read_revision("HEAD", Path::new("a.txt")).unwrap();
        let new = cache.read_workdir(Path::new("a.txt")).unwrap();
        assert_eq!(old.content, "one\ntwo\n");
        assert_eq!(new.content, "one\n2\n");
        assert_eq!(old.mode, FileMode::File);
        assert!(old.exists && new.exists);
    }

    #[test]
    fn test_missing_sides() {
        let (dir, cache) = repo_with(&[("a.txt", "x\n")]);
        fs::write(dir.path().join("new.txt"), "y\n").unwrap();
        fs::remove_file(dir.path().join("a.txt")).unwrap();

        assert!(!cache.read_revision("HEAD", Path::new("new.txt")).unwrap().exists);
        assert!(!cache.read_workdir(Path::new("a.txt")).unwrap().exists);
        assert!(cache.read_revision("no-such-rev", Path::new("a.txt")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_modes() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("target.txt"), "t\n").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();
        commit_all(&repo, &["target.txt", "link"]);
        let cache = RepoCache::open(dir.path()).unwrap();

        let old = cache.read_revision("HEAD", Path::new("link")).unwrap();
        let new = cache.read_workdir(Path::new("link")).unwrap();
        assert_eq!(old.mode, FileMode::Symlink);
        assert_eq!(new.mode, FileMode::Symlink);
        assert_eq!(old.content, "target.txt");
        assert_eq!(new.content, "target.txt");
    }

    #[test]
    fn test_relative_path() {
        let (dir, cache) = repo_with(&[("a.txt", "x\n")]);
        let rel = cache.relative_path(&dir.path().join("a.txt")).unwrap();
        assert_eq!(rel, PathBuf::from("a.txt"));
        assert!(cache.relative_path(Path::new("/definitely/elsewhere.txt")).is_err());
    }
}
