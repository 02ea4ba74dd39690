use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sidediff::cli::{Cli, Command, CommentArgs, ViewArgs};
use sidediff::comments::controller::{new_draft, CANNED_REPLY_DONE};
use sidediff::comments::{
    BoxOptions, CommentError, CommentIndex, CommentStore, CommentWorker, DraftRequest,
};
use sidediff::config::{self, PersistentSettings, SidediffConfig};
use sidediff::git::types::{FileMode, PatchKey};
use sidediff::git::RepoCache;
use sidediff::logging;
use sidediff::script::{build_script, DiffPrefs, DownloadLinks, SourceFile, WHOLE_FILE_CONTEXT};
use sidediff::session::{self, FileCommentStore};
use sidediff::table::DiffTable;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().ok();
    logging::init();

    let cli = Cli::parse();
    let config = config::load_config();

    match cli.command {
        Command::Render { old, new, view } => {
            let b = read_file(&new)?;
            let a = read_file(&old)?.same_file_as(&b);
            render(&a, &b, &view, &config, view.comments.clone())
        }
        Command::Git { path, rev, view } => {
            let start = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let repo = RepoCache::open(start)?;
            let rel = repo.relative_path(&path)?;
            let a = repo.read_revision(&rev, &rel)?;
            let b = repo.read_workdir(&rel)?;
            let comments = match &view.comments {
                Some(p) => p.clone(),
                None => {
                    session::ensure_gitignore(repo.workdir());
                    session::default_session_path(repo.workdir(), &b.name)
                }
            };
            render(&a, &b, &view, &config, Some(comments))
        }
        Command::Comment(args) => add_comment(args, &config).await,
    }
}

/// A file on disk as one side of the diff. Missing files become an empty side.
fn read_file(path: &Path) -> Result<SourceFile> {
    let name = path.to_string_lossy().into_owned();
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SourceFile::missing(name)),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    if meta.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        return Ok(SourceFile::new(name, target.to_string_lossy()).with_mode(FileMode::Symlink));
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(SourceFile::new(name, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Merge CLI flags with config-file settings (CLI wins).
fn diff_prefs(view: &ViewArgs, config: &SidediffConfig) -> DiffPrefs {
    let context = if view.whole_file {
        WHOLE_FILE_CONTEXT
    } else {
        view.context
            .unwrap_or_else(|| config.context_lines_or_default())
    };
    DiffPrefs {
        ignore_whitespace: view.ignore_whitespace || config.ignore_whitespace.unwrap_or(false),
        intraline_difference: !view.no_intraline && config.intraline_difference.unwrap_or(true),
        context,
    }
}

fn render(
    a: &SourceFile,
    b: &SourceFile,
    view: &ViewArgs,
    config: &SidediffConfig,
    comments: Option<PathBuf>,
) -> Result<()> {
    let prefs = diff_prefs(view, config);
    let expand = view.expand || config.expand_comments.unwrap_or(false);
    if view.save_settings {
        config::save_settings(&PersistentSettings {
            ignore_whitespace: prefs.ignore_whitespace,
            intraline_difference: prefs.intraline_difference,
            context_lines: prefs.context,
            expand_comments: expand,
        });
    }

    let mut script = build_script(a, b, &prefs);
    if let (Some(base_url), Some(patch_set)) = (&config.base_url, &view.patch_set) {
        script.download = Some(DownloadLinks {
            base_url: base_url.clone(),
            key_b: PatchKey {
                patch_set: patch_set.clone(),
                file: script.new_name.clone(),
            },
            key_a: None,
        });
    }

    let mut table = DiffTable::new(BoxOptions {
        anonymous_name: config.anonymous_name.clone(),
    });
    table.render(&script);

    if let Some(path) = comments {
        let index = CommentIndex::from_comments(session::load_comments(&path)?);
        table.display(&index, expand);
    }

    let title = format!("{} {}", script.change_type.label(), script.new_name);
    let html = table.to_document(&title);
    match &view.output {
        Some(out) => {
            fs::write(out, html).with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), rows = table.row_count(), "wrote diff");
        }
        None => io::stdout().lock().write_all(html.as_bytes())?,
    }
    Ok(())
}

async fn add_comment(args: CommentArgs, config: &SidediffConfig) -> Result<()> {
    let Some(user) = config.user.clone() else {
        return Err(CommentError::SignInRequired {
            token: args.comments.display().to_string(),
        }
        .into());
    };

    let store = Arc::new(FileCommentStore::new(&args.comments));
    let message = if args.done {
        CANNED_REPLY_DONE.to_string()
    } else {
        args.message.clone().unwrap_or_default()
    };

    let draft = match &args.reply_to {
        Some(parent_id) => {
            let existing = store.list().await?;
            let parent = existing
                .iter()
                .find(|c| &c.id == parent_id)
                .ok_or_else(|| CommentError::UnknownComment(parent_id.clone()))?;
            let mut reply = parent.create_reply(Some(user));
            reply.message = Some(message);
            reply
        }
        None => new_draft(args.side.into(), args.line, message, Some(user)),
    };

    let mut worker = CommentWorker::new(store);
    worker.request(DraftRequest {
        generation: 1,
        comment: draft,
    })?;
    let result = worker.recv().await.ok_or(CommentError::WorkerClosed)?;
    let saved = result.comment.map_err(CommentError::Store)?;
    info!(id = %saved.id, "saved draft");
    println!("{}", saved.id);
    Ok(())
}
