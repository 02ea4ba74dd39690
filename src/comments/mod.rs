pub mod boxes;
pub mod controller;
pub mod error;
pub mod index;
pub mod store;
pub mod types;
pub mod worker;

pub use boxes::{BoxOptions, CommentBox, DraftBox, PublishedBox, DEFAULT_ANONYMOUS_NAME};
pub use controller::ReviewController;
pub use error::CommentError;
pub use index::CommentIndex;
pub use store::{CommentStore, MemoryStore};
pub use types::{new_comment_id, AccountInfo, CommentId, CommentInfo, Side};
pub use worker::{CommentWorker, DraftRequest, DraftResult};
