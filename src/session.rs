use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::comments::store::upsert_draft;
use crate::comments::{CommentError, CommentInfo, CommentStore};

const SESSION_VERSION: u32 = 1;
const SESSION_DIR: &str = ".sidediff";

#[derive(Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    #[serde(default)]
    comments: Vec<CommentInfo>,
}

/// Default comment file for one file of a repository, under `.sidediff/`.
pub fn default_session_path(repo_path: &Path, file: &str) -> PathBuf {
    let sanitized = file.replace(['/', '\\', ':', ' '], "_");
    repo_path
        .join(SESSION_DIR)
        .join(format!("comments_{sanitized}.json"))
}

/// Ensure `.sidediff/` is listed in `.gitignore`.
pub fn ensure_gitignore(repo_path: &Path) {
    let gitignore_path = repo_path.join(".gitignore");
    let entry = format!("{SESSION_DIR}/");

    if let Ok(contents) = fs::read_to_string(&gitignore_path) {
        if contents.lines().any(|line| line.trim() == entry) {
            return;
        }
        if let Ok(mut f) = fs::OpenOptions::new().append(true).open(&gitignore_path) {
            if !contents.ends_with('\n') {
                let _ = writeln!(f);
            }
            let _ = writeln!(f, "{entry}");
        }
    } else {
        let _ = fs::write(&gitignore_path, format!("{entry}\n"));
    }
}

fn parse(contents: &str, path: &Path) -> Result<Vec<CommentInfo>> {
    let session: SessionFile = serde_json::from_str(contents)
        .with_context(|| format!("invalid comment file {}", path.display()))?;
    if session.version != SESSION_VERSION {
        warn!(
            path = %path.display(),
            version = session.version,
            "unsupported comment file version, ignoring"
        );
        return Ok(Vec::new());
    }
    Ok(session.comments)
}

fn serialize(comments: &[CommentInfo]) -> Result<String> {
    let session = SessionFile {
        version: SESSION_VERSION,
        comments: comments.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&session)?)
}

/// Read every comment from `path`. A missing file holds no comments.
pub fn load_comments(path: &Path) -> Result<Vec<CommentInfo>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let comments = parse(&contents, path)?;
    debug!(path = %path.display(), count = comments.len(), "loaded comments");
    Ok(comments)
}

pub fn save_comments(path: &Path, comments: &[CommentInfo]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, serialize(comments)?).with_context(|| format!("writing {}", path.display()))
}

/// A [`CommentStore`] backed by a session file. Writes are serialized so
/// concurrent saves never lose each other's comments.
#[derive(Clone)]
pub struct FileCommentStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileCommentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_all(path: &Path) -> Result<Vec<CommentInfo>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => parse(&contents, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn store_error(e: anyhow::Error) -> CommentError {
    CommentError::Store(format!("{e:#}"))
}

impl CommentStore for FileCommentStore {
    fn save_draft(&self, comment: CommentInfo) -> BoxFuture<'static, Result<CommentInfo, CommentError>> {
        let path = Arc::clone(&self.path);
        let lock = Arc::clone(&self.lock);
        Box::pin(async move {
            let _guard = lock.lock().await;
            let mut comments = read_all(&path).await.map_err(store_error)?;
            let stored = upsert_draft(&mut comments, comment);

            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| CommentError::Store(e.to_string()))?;
            }
            let json = serialize(&comments).map_err(store_error)?;
            tokio::fs::write(path.as_path(), json)
                .await
                .map_err(|e| CommentError::Store(e.to_string()))?;
            Ok(stored)
        })
    }

    fn list(&self) -> BoxFuture<'static, Result<Vec<CommentInfo>, CommentError>> {
        let path = Arc::clone(&self.path);
        let lock = Arc::clone(&self.lock);
        Box::pin(async move {
            let _guard = lock.lock().await;
            read_all(&path).await.map_err(store_error)
        })
    }
}
