use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

static COMMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub type CommentId = String;

/// Which file of the pair a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A published comment or a draft, bound to a line (or the whole file) on
/// one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInfo {
    pub id: CommentId,
    pub side: Side,
    /// 1-based line number; `None` for a file-level comment.
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub in_reply_to: Option<CommentId>,
    #[serde(default)]
    pub message: Option<String>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<AccountInfo>,
    #[serde(default)]
    pub draft: bool,
}

impl CommentInfo {
    pub fn has_line(&self) -> bool {
        self.line.is_some()
    }

    /// A new, empty draft replying to this comment at the same position.
    pub fn create_reply(&self, author: Option<AccountInfo>) -> CommentInfo {
        CommentInfo {
            id: new_comment_id(),
            side: self.side,
            line: self.line,
            in_reply_to: Some(self.id.clone()),
            message: None,
            updated: Utc::now(),
            author,
            draft: true,
        }
    }
}

/// Client-side id: creation time plus a process-wide counter.
pub fn new_comment_id() -> CommentId {
    let n = COMMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("c{:x}-{n}", Utc::now().timestamp_millis())
}
