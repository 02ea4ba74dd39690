use chrono::{DateTime, Datelike, Utc};

use super::types::{CommentId, CommentInfo, Side};
use crate::markup::{wikify, Element};

pub const DEFAULT_ANONYMOUS_NAME: &str = "Anonymous Coward";
const NO_AUTHOR: &str = "(no author)";

/// Settings shared by every comment widget in a table.
#[derive(Debug, Clone)]
pub struct BoxOptions {
    /// Shown for authors without a name.
    pub anonymous_name: String,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            anonymous_name: DEFAULT_ANONYMOUS_NAME.to_string(),
        }
    }
}

pub fn author_name(info: &CommentInfo, opts: &BoxOptions) -> String {
    match &info.author {
        Some(author) => author
            .name
            .clone()
            .unwrap_or_else(|| opts.anonymous_name.clone()),
        None => NO_AUTHOR.to_string(),
    }
}

/// Time only for today, month and day within the year, full date otherwise.
pub fn format_short_day_time(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if dt.date_naive() == now.date_naive() {
        dt.format("%-I:%M %p").to_string()
    } else if dt.year() == now.year() {
        dt.format("%b %-d").to_string()
    } else {
        dt.format("%b %-d, %Y").to_string()
    }
}

/// A published comment: collapsible, with Reply and Done actions.
#[derive(Debug, Clone)]
pub struct PublishedBox {
    comment: CommentInfo,
    open: bool,
    reply_box: Option<CommentId>,
    done_enabled: bool,
}

impl PublishedBox {
    pub fn new(comment: CommentInfo, open: bool) -> Self {
        Self {
            comment,
            open,
            reply_box: None,
            done_enabled: true,
        }
    }

    pub fn comment(&self) -> &CommentInfo {
        &self.comment
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn reply_box(&self) -> Option<&CommentId> {
        self.reply_box.as_ref()
    }

    pub fn register_reply_box(&mut self, draft: CommentId) {
        self.reply_box = Some(draft);
    }

    pub fn unregister_reply_box(&mut self) {
        self.reply_box = None;
    }

    pub fn done_enabled(&self) -> bool {
        self.done_enabled
    }

    pub fn set_done_enabled(&mut self, enabled: bool) {
        self.done_enabled = enabled;
    }

    pub fn render(&self, opts: &BoxOptions, now: DateTime<Utc>) -> Element {
        let msg = self
            .comment
            .message
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();

        let mut root = Element::new("div")
            .field("box")
            .class("commentBox")
            .class("published")
            .attr("data-comment", &self.comment.id);
        if !self.open {
            root = root.class("closed");
        }

        let mut done = Element::new("button").field("done").text("Done");
        if !self.done_enabled {
            done = done.attr("disabled", "disabled");
        }

        root.child(
            Element::new("div")
                .field("header")
                .class("header")
                .child(
                    Element::new("span")
                        .field("name")
                        .class("name")
                        .text(author_name(&self.comment, opts)),
                )
                .child(
                    Element::new("span")
                        .field("summary")
                        .class("summary")
                        .hidden(self.open)
                        .text(msg),
                )
                .child(
                    Element::new("span")
                        .field("date")
                        .class("date")
                        .text(format_short_day_time(self.comment.updated, now)),
                ),
        )
        .child(
            Element::new("div")
                .field("message")
                .class("message")
                .hidden(!self.open)
                .html(wikify(msg)),
        )
        .child(
            Element::new("div")
                .field("buttons")
                .class("buttons")
                .hidden(!self.open)
                .child(Element::new("button").field("reply").text("Reply"))
                .child(done),
        )
    }
}

/// An editable, not yet published comment.
#[derive(Debug, Clone)]
pub struct DraftBox {
    comment: CommentInfo,
    open: bool,
    editing: bool,
    saved: bool,
}

impl DraftBox {
    /// `saved` is false for drafts created locally and not yet stored.
    pub fn new(comment: CommentInfo, saved: bool) -> Self {
        Self {
            editing: !saved || comment.message.is_none(),
            comment,
            open: true,
            saved,
        }
    }

    pub fn comment(&self) -> &CommentInfo {
        &self.comment
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn set_edit(&mut self, edit: bool) {
        self.editing = edit;
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.comment.message = Some(message.into());
        self.saved = false;
    }

    /// Replace the comment with the stored copy and leave edit mode.
    pub fn mark_saved(&mut self, stored: CommentInfo) {
        self.comment = stored;
        self.saved = true;
        self.editing = false;
    }

    pub fn render(&self, opts: &BoxOptions, now: DateTime<Utc>) -> Element {
        let msg = self.comment.message.as_deref().unwrap_or_default();
        let mut root = Element::new("div")
            .field("box")
            .class("commentBox")
            .class("draft")
            .attr("data-comment", &self.comment.id);
        if !self.open {
            root = root.class("closed");
        }
        let action = if self.editing { "Save" } else { "Edit" };
        root.child(
            Element::new("div")
                .field("header")
                .class("header")
                .child(
                    Element::new("span")
                        .field("name")
                        .class("name")
                        .text(format!("Draft ({})", author_name(&self.comment, opts))),
                )
                .child(
                    Element::new("span")
                        .field("date")
                        .class("date")
                        .text(format_short_day_time(self.comment.updated, now)),
                ),
        )
        .child(
            Element::new("div")
                .field("message")
                .class("message")
                .hidden(self.editing || !self.open)
                .html(wikify(msg)),
        )
        .child(
            Element::new("textarea")
                .field("editArea")
                .hidden(!self.editing)
                .text(msg),
        )
        .child(
            Element::new("div")
                .field("buttons")
                .class("buttons")
                .hidden(!self.open)
                .child(Element::new("button").field("edit").text(action))
                .child(Element::new("button").field("discard").text("Discard")),
        )
    }
}

#[derive(Debug, Clone)]
pub enum CommentBox {
    Published(PublishedBox),
    Draft(DraftBox),
}

impl CommentBox {
    /// Drafts always start open; published comments use `open`.
    pub fn from_comment(comment: CommentInfo, open: bool) -> Self {
        if comment.draft {
            CommentBox::Draft(DraftBox::new(comment, true))
        } else {
            CommentBox::Published(PublishedBox::new(comment, open))
        }
    }

    pub fn comment(&self) -> &CommentInfo {
        match self {
            CommentBox::Published(b) => b.comment(),
            CommentBox::Draft(b) => b.comment(),
        }
    }

    pub fn id(&self) -> &str {
        &self.comment().id
    }

    pub fn side(&self) -> Side {
        self.comment().side
    }

    pub fn is_open(&self) -> bool {
        match self {
            CommentBox::Published(b) => b.is_open(),
            CommentBox::Draft(b) => b.is_open(),
        }
    }

    pub fn set_open(&mut self, open: bool) {
        match self {
            CommentBox::Published(b) => b.set_open(open),
            CommentBox::Draft(b) => b.set_open(open),
        }
    }

    pub fn render(&self, opts: &BoxOptions, now: DateTime<Utc>) -> Element {
        match self {
            CommentBox::Published(b) => b.render(opts, now),
            CommentBox::Draft(b) => b.render(opts, now),
        }
    }
}
