use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::comments::Side;

#[derive(Parser, Debug)]
#[command(
    name = "sidediff",
    version,
    about = "Side-by-side review diffs with inline comments, rendered as HTML"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Diff two files on disk
    Render {
        /// Old version
        old: PathBuf,
        /// New version
        new: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Diff a file in the working tree against a revision
    Git {
        /// File inside a git working tree
        path: PathBuf,

        /// Revision to compare against
        #[arg(long, default_value = "HEAD")]
        rev: String,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Add a draft comment to a comment file
    Comment(CommentArgs),
}

/// Flags shared by every rendering command.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Ignore whitespace changes
    #[arg(short = 'w', long = "ignore-whitespace")]
    pub ignore_whitespace: bool,

    /// Disable character-level highlighting inside changed lines
    #[arg(long)]
    pub no_intraline: bool,

    /// Lines of context around each change
    #[arg(short = 'U', long = "context")]
    pub context: Option<usize>,

    /// Show the whole file instead of hunks
    #[arg(long, conflicts_with = "context")]
    pub whole_file: bool,

    /// JSON comment file to overlay
    #[arg(long)]
    pub comments: Option<PathBuf>,

    /// Expand every published comment
    #[arg(long)]
    pub expand: bool,

    /// Patch set id used in download links (needs `base_url` in the config)
    #[arg(long)]
    pub patch_set: Option<String>,

    /// Write HTML here instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Persist the diff preferences above to the config file
    #[arg(long)]
    pub save_settings: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    /// Old version
    A,
    /// New version
    B,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::A => Side::A,
            SideArg::B => Side::B,
        }
    }
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Comment file to update
    #[arg(long)]
    pub comments: PathBuf,

    #[arg(long, value_enum, default_value = "b")]
    pub side: SideArg,

    /// 1-based line; omit for a file-level comment
    #[arg(long)]
    pub line: Option<usize>,

    #[arg(short = 'm', long, required_unless_present = "done")]
    pub message: Option<String>,

    /// Id of the comment being answered
    #[arg(long)]
    pub reply_to: Option<String>,

    /// Answer `--reply-to` with a canned "Done"
    #[arg(long, requires = "reply_to")]
    pub done: bool,
}
