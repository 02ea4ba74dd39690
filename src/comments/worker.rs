use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::CommentError;
use super::store::CommentStore;
use super::types::CommentInfo;

#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub generation: u64,
    pub comment: CommentInfo,
}

#[derive(Debug)]
pub struct DraftResult {
    pub generation: u64,
    pub comment: Result<CommentInfo, String>,
}

/// Saves drafts off the caller's task. Completions come back in the order
/// the store finishes them, tagged with the request's generation.
pub struct CommentWorker {
    request_tx: mpsc::UnboundedSender<DraftRequest>,
    result_rx: mpsc::UnboundedReceiver<DraftResult>,
}

impl CommentWorker {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<DraftRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<DraftResult>();

        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let store = Arc::clone(&store);
                let tx = result_tx.clone();

                tokio::spawn(async move {
                    debug!(generation = request.generation, id = %request.comment.id, "saving draft");
                    let result = match store.save_draft(request.comment).await {
                        Ok(comment) => DraftResult {
                            generation: request.generation,
                            comment: Ok(comment),
                        },
                        Err(e) => {
                            warn!(generation = request.generation, "draft save failed: {e}");
                            DraftResult {
                                generation: request.generation,
                                comment: Err(e.to_string()),
                            }
                        }
                    };
                    let _ = tx.send(result);
                });
            }
        });

        Self {
            request_tx,
            result_rx,
        }
    }

    pub fn request(&self, req: DraftRequest) -> Result<(), CommentError> {
        self.request_tx
            .send(req)
            .map_err(|_| CommentError::WorkerClosed)
    }

    pub fn try_recv(&mut self) -> Option<DraftResult> {
        self.result_rx.try_recv().ok()
    }

    pub async fn recv(&mut self) -> Option<DraftResult> {
        self.result_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::comments::store::MemoryStore;
    use crate::comments::types::Side;

    #[tokio::test]
    async fn test_worker_round_trip_keeps_generation() {
        let store = Arc::new(MemoryStore::default());
        let mut worker = CommentWorker::new(store.clone());
        assert!(worker.try_recv().is_none());

        let comment = CommentInfo {
            id: "d1".to_string(),
            side: Side::A,
            line: Some(1),
            in_reply_to: None,
            message: Some("Done".to_string()),
            updated: Utc::now(),
            author: None,
            draft: false,
        };
        worker
            .request(DraftRequest {
                generation: 7,
                comment,
            })
            .unwrap();

        let result = worker.recv().await.unwrap();
        assert_eq!(result.generation, 7);
        let saved = result.comment.unwrap();
        assert!(saved.draft);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
