use thiserror::Error;

use super::types::CommentId;

/// Failures a review action can report back to the caller.
#[derive(Debug, Error)]
pub enum CommentError {
    /// The action needs a signed-in user; `token` names the view to return to.
    #[error("sign in required to comment on {token}")]
    SignInRequired { token: String },

    #[error("unknown comment: {0}")]
    UnknownComment(CommentId),

    #[error("comment worker has stopped")]
    WorkerClosed,

    #[error("comment store failed: {0}")]
    Store(String),
}
