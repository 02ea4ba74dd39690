use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::boxes::{CommentBox, DraftBox, PublishedBox};
use super::error::CommentError;
use super::types::{new_comment_id, AccountInfo, CommentId, CommentInfo, Side};
use super::worker::{CommentWorker, DraftRequest, DraftResult};
use crate::table::DiffTable;

pub const CANNED_REPLY_DONE: &str = "Done";

/// What a pending worker request was for.
#[derive(Debug, Clone)]
enum Pending {
    /// Canned "Done" reply to a published comment.
    Done { parent: CommentId },
    /// Save of a draft already shown in the table.
    Save { draft: CommentId },
}

/// Applies review actions (reply, done, edit, save, discard) to a rendered
/// table. Store calls go through a [`CommentWorker`]; their results are
/// folded back in by [`ReviewController::apply_completions`].
pub struct ReviewController {
    table: DiffTable,
    user: Option<AccountInfo>,
    token: String,
    worker: CommentWorker,
    generation: u64,
    pending: HashMap<u64, Pending>,
}

impl ReviewController {
    pub fn new(
        table: DiffTable,
        user: Option<AccountInfo>,
        token: impl Into<String>,
        worker: CommentWorker,
    ) -> Self {
        Self {
            table,
            user,
            token: token.into(),
            worker,
            generation: 0,
            pending: HashMap::new(),
        }
    }

    pub fn table(&self) -> &DiffTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DiffTable {
        &mut self.table
    }

    pub fn into_table(self) -> DiffTable {
        self.table
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Requests still waiting on the worker.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn require_sign_in(&self) -> Result<AccountInfo, CommentError> {
        self.user.clone().ok_or_else(|| CommentError::SignInRequired {
            token: self.token.clone(),
        })
    }

    fn published_info(&self, id: &str) -> Result<(CommentInfo, Option<CommentId>), CommentError> {
        match self.table.comment_box(id) {
            Some(CommentBox::Published(b)) => Ok((b.comment().clone(), b.reply_box().cloned())),
            _ => Err(CommentError::UnknownComment(id.to_string())),
        }
    }

    fn with_published<F>(&mut self, id: &str, f: F) -> Result<(), CommentError>
    where
        F: FnOnce(&mut PublishedBox),
    {
        match self.table.comment_box_mut(id) {
            Some(CommentBox::Published(b)) => {
                f(b);
                Ok(())
            }
            _ => Err(CommentError::UnknownComment(id.to_string())),
        }
    }

    fn with_draft<F>(&mut self, id: &str, f: F) -> Result<(), CommentError>
    where
        F: FnOnce(&mut DraftBox),
    {
        match self.table.comment_box_mut(id) {
            Some(CommentBox::Draft(b)) => {
                f(b);
                Ok(())
            }
            _ => Err(CommentError::UnknownComment(id.to_string())),
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Header click: flip a comment between collapsed and expanded.
    /// Returns the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool, CommentError> {
        let b = self
            .table
            .comment_box_mut(id)
            .ok_or_else(|| CommentError::UnknownComment(id.to_string()))?;
        let open = !b.is_open();
        b.set_open(open);
        Ok(open)
    }

    /// Open the reply draft for a published comment, creating an empty one
    /// below the thread if there is none yet. Returns the draft's id.
    pub fn reply(&mut self, id: &str) -> Result<CommentId, CommentError> {
        let user = self.require_sign_in()?;
        let (parent, reply_box) = self.published_info(id)?;

        if let Some(draft_id) = reply_box {
            if self.open_reply_box(&draft_id) {
                return Ok(draft_id);
            }
            debug!(parent = id, draft = %draft_id, "reply box vanished, creating a new one");
        }

        let draft = parent.create_reply(Some(user));
        let draft_id = draft.id.clone();
        self.table
            .insert_comment(CommentBox::Draft(DraftBox::new(draft, false)));
        self.with_published(id, |b| b.register_reply_box(draft_id.clone()))?;
        Ok(draft_id)
    }

    fn open_reply_box(&mut self, draft_id: &str) -> bool {
        self.with_draft(draft_id, |d| {
            d.set_open(true);
            d.set_edit(true);
        })
        .is_ok()
    }

    /// Acknowledge a published comment. Without a reply draft this stores a
    /// canned "Done" reply in the background and disables the Done button
    /// until it completes; otherwise the existing draft is opened and the
    /// comment collapsed.
    pub fn done(&mut self, id: &str) -> Result<(), CommentError> {
        let user = self.require_sign_in()?;
        let (parent, reply_box) = self.published_info(id)?;

        if let Some(draft_id) = reply_box {
            if self.open_reply_box(&draft_id) {
                return self.with_published(id, |b| b.set_open(false));
            }
        }

        let mut draft = parent.create_reply(Some(user));
        draft.message = Some(CANNED_REPLY_DONE.to_string());
        let generation = self.next_generation();
        self.worker.request(DraftRequest {
            generation,
            comment: draft,
        })?;
        self.pending.insert(
            generation,
            Pending::Done {
                parent: id.to_string(),
            },
        );
        self.with_published(id, |b| b.set_done_enabled(false))
    }

    /// Replace a draft's text. The draft stays unsaved until [`Self::save`].
    pub fn edit_draft(&mut self, id: &str, message: impl Into<String>) -> Result<(), CommentError> {
        self.require_sign_in()?;
        let message = message.into();
        self.with_draft(id, |d| {
            d.set_message(message);
            d.set_edit(true);
        })
    }

    /// Store a draft in the background.
    pub fn save(&mut self, id: &str) -> Result<(), CommentError> {
        self.require_sign_in()?;
        let comment = match self.table.comment_box(id) {
            Some(CommentBox::Draft(d)) => d.comment().clone(),
            _ => return Err(CommentError::UnknownComment(id.to_string())),
        };
        let generation = self.next_generation();
        self.worker.request(DraftRequest {
            generation,
            comment,
        })?;
        self.pending.insert(
            generation,
            Pending::Save {
                draft: id.to_string(),
            },
        );
        Ok(())
    }

    /// Drop a draft from the table and detach it from the comment it replies to.
    pub fn discard(&mut self, id: &str) -> Result<CommentInfo, CommentError> {
        let is_draft = matches!(self.table.comment_box(id), Some(CommentBox::Draft(_)));
        let removed = if is_draft {
            self.table.remove_comment(id)
        } else {
            None
        };
        let Some(removed) = removed else {
            return Err(CommentError::UnknownComment(id.to_string()));
        };
        let info = removed.comment().clone();
        if let Some(parent) = &info.in_reply_to {
            if let Some(CommentBox::Published(p)) = self.table.comment_box_mut(parent) {
                if p.reply_box().is_some_and(|r| r == id) {
                    p.unregister_reply_box();
                }
            }
        }
        Ok(info)
    }

    /// Fold every finished worker request into the table. Returns how many
    /// were applied.
    pub fn apply_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.worker.try_recv() {
            self.apply(result);
            applied += 1;
        }
        applied
    }

    /// Wait for the next worker result and apply it.
    pub async fn wait_for_completion(&mut self) -> Result<(), CommentError> {
        let result = self.worker.recv().await.ok_or(CommentError::WorkerClosed)?;
        self.apply(result);
        Ok(())
    }

    fn apply(&mut self, result: DraftResult) {
        let Some(pending) = self.pending.remove(&result.generation) else {
            debug!(generation = result.generation, "dropping result for unknown request");
            return;
        };
        match (pending, result.comment) {
            (Pending::Done { parent }, Ok(draft)) => {
                let draft_id = draft.id.clone();
                let _ = self.with_published(&parent, |b| {
                    b.set_done_enabled(true);
                    b.set_open(false);
                    b.register_reply_box(draft_id.clone());
                });
                self.table
                    .insert_comment(CommentBox::Draft(DraftBox::new(draft, true)));
                info!(parent = %parent, draft = %draft_id, "done reply stored");
            }
            (Pending::Done { parent }, Err(e)) => {
                let _ = self.with_published(&parent, |b| b.set_done_enabled(true));
                warn!(parent = %parent, "done reply failed: {e}");
            }
            (Pending::Save { draft }, Ok(stored)) => {
                if self.with_draft(&draft, |d| d.mark_saved(stored)).is_err() {
                    debug!(draft = %draft, "saved draft no longer shown");
                }
            }
            (Pending::Save { draft }, Err(e)) => {
                warn!(draft = %draft, "draft save failed: {e}");
            }
        }
    }
}

/// A fresh draft on `line` of `side`, for starting a new thread.
pub fn new_draft(
    side: Side,
    line: Option<usize>,
    message: impl Into<String>,
    author: Option<AccountInfo>,
) -> CommentInfo {
    CommentInfo {
        id: new_comment_id(),
        side,
        line,
        in_reply_to: None,
        message: Some(message.into()),
        updated: Utc::now(),
        author,
        draft: true,
    }
}
