use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::{self, BoxFuture};

use super::error::CommentError;
use super::types::CommentInfo;

/// Persistence for comments. Calls complete asynchronously and never block
/// the caller.
pub trait CommentStore: Send + Sync + 'static {
    /// Create or update a draft, returning the stored copy.
    fn save_draft(&self, comment: CommentInfo) -> BoxFuture<'static, Result<CommentInfo, CommentError>>;

    fn list(&self) -> BoxFuture<'static, Result<Vec<CommentInfo>, CommentError>>;
}

/// Stamp a draft as stored now and replace any copy with the same id.
pub(crate) fn upsert_draft(comments: &mut Vec<CommentInfo>, mut comment: CommentInfo) -> CommentInfo {
    comment.draft = true;
    comment.updated = Utc::now();
    match comments.iter_mut().find(|c| c.id == comment.id) {
        Some(existing) => *existing = comment.clone(),
        None => comments.push(comment.clone()),
    }
    comment
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    comments: Arc<Mutex<Vec<CommentInfo>>>,
}

impl MemoryStore {
    pub fn new(comments: Vec<CommentInfo>) -> Self {
        Self {
            comments: Arc::new(Mutex::new(comments)),
        }
    }
}

impl CommentStore for MemoryStore {
    fn save_draft(&self, comment: CommentInfo) -> BoxFuture<'static, Result<CommentInfo, CommentError>> {
        let result = self
            .comments
            .lock()
            .map_err(|e| CommentError::Store(e.to_string()))
            .map(|mut comments| upsert_draft(&mut comments, comment));
        Box::pin(future::ready(result))
    }

    fn list(&self) -> BoxFuture<'static, Result<Vec<CommentInfo>, CommentError>> {
        let result = self
            .comments
            .lock()
            .map_err(|e| CommentError::Store(e.to_string()))
            .map(|comments| comments.clone());
        Box::pin(future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::types::Side;

    fn draft(id: &str, message: &str) -> CommentInfo {
        CommentInfo {
            id: id.to_string(),
            side: Side::B,
            line: Some(2),
            in_reply_to: None,
            message: Some(message.to_string()),
            updated: Utc::now(),
            author: None,
            draft: false,
        }
    }

    #[tokio::test]
    async fn test_memory_store_upserts() {
        let store = MemoryStore::default();
        let saved = store.save_draft(draft("d1", "first")).await.unwrap();
        assert!(saved.draft);
        store.save_draft(draft("d1", "second")).await.unwrap();
        store.save_draft(draft("d2", "other")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message.as_deref(), Some("second"));
    }
}
