//! `upload`: copy a local file or directory tree into the cluster.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use futures_util::stream::{self, StreamExt};
use url::Url;
use walkdir::WalkDir;

use crate::cli::commands::rm::delete_all;
use crate::cli::commands::CommandError;
use crate::cli::context::Context;
use crate::client::{child_url, parse_url, StoreError, RECURSIVE_DEPTH};

#[derive(Debug, Parser)]
#[command(name = "upload", no_binary_name = true)]
struct UploadArgs {
    /// Print each transfer
    #[arg(short, long)]
    verbose: bool,

    /// Show what would be transferred without doing it
    #[arg(short = 'n', long)]
    noop: bool,

    /// Remove remote files that have no local counterpart
    #[arg(long)]
    delete: bool,

    /// Local file or directory
    src: PathBuf,

    /// Destination URL
    dest: String,
}

/// One planned file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub local: PathBuf,
    /// Slash-separated path relative to the destination.
    pub relative: String,
    pub remote: Url,
}

pub async fn run<W: Write>(
    ctx: &Context,
    args: &[String],
    out: &mut W,
) -> Result<(), CommandError> {
    let opts = UploadArgs::try_parse_from(args)?;
    let dest = parse_url(&opts.dest)?;
    let meta = tokio::fs::metadata(&opts.src)
        .await
        .map_err(|source| StoreError::Io {
            path: opts.src.display().to_string(),
            source,
        })?;

    let is_dir = meta.is_dir();
    let transfers = if is_dir {
        plan_directory(&opts.src, &dest)?
    } else {
        vec![plan_file(&opts.src, &dest)]
    };

    if opts.noop {
        for t in &transfers {
            writeln!(out, "Would upload {} -> {}", t.local.display(), t.remote)?;
        }
        return Ok(());
    }

    let local: HashSet<String> = transfers.iter().map(|t| t.relative.clone()).collect();
    upload_all(ctx, transfers, opts.verbose, out).await?;

    if opts.delete && is_dir {
        let listing = ctx.store.list(&dest, Some(RECURSIVE_DEPTH)).await?;
        let stale: Vec<Url> = listing
            .files
            .keys()
            .filter(|name| !local.contains(name.as_str()))
            .map(|name| child_url(&dest, name))
            .collect();
        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "Removing remote files missing locally");
            delete_all(ctx, stale, opts.verbose, out).await?;
        }
    }
    Ok(())
}

/// Every regular file below `src`, mapped under `dest`.
pub fn plan_directory(src: &Path, dest: &Url) -> Result<Vec<Transfer>, walkdir::Error> {
    let mut transfers = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        transfers.push(Transfer {
            local: entry.path().to_path_buf(),
            remote: child_url(dest, &relative),
            relative,
        });
    }
    Ok(transfers)
}

/// A single file goes to `dest` itself, or inside it when `dest` ends in `/`.
pub fn plan_file(src: &Path, dest: &Url) -> Transfer {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let remote = if dest.path().ends_with('/') {
        child_url(dest, &name)
    } else {
        dest.clone()
    };
    Transfer {
        local: src.to_path_buf(),
        relative: name,
        remote,
    }
}

async fn upload_all<W: Write>(
    ctx: &Context,
    transfers: Vec<Transfer>,
    verbose: bool,
    out: &mut W,
) -> Result<(), CommandError> {
    let total = transfers.len();
    let store = &ctx.store;
    let mut results = stream::iter(transfers)
        .map(|t| async move {
            let res = store.put_file(&t.local, &t.remote).await;
            (t, res)
        })
        .buffer_unordered(ctx.settings.workers.max(1));

    let mut failed = 0;
    let mut bytes = 0u64;
    while let Some((t, res)) = results.next().await {
        match res {
            Ok(len) => {
                bytes += len;
                if verbose {
                    writeln!(out, "{} -> {}", t.local.display(), t.remote)?;
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(file = %t.local.display(), error = %e, "Upload failed");
            }
        }
    }

    tracing::info!(files = total - failed, bytes, failed, "Upload finished");
    if failed > 0 {
        return Err(CommandError::Incomplete {
            operation: "uploads",
            failed,
            total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_plan_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("sub/a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/deeper/c.txt"), "c").unwrap();

        let dest = parse_url("http://cbfs:8484/site").unwrap();
        let plan = plan_directory(dir.path(), &dest).unwrap();
        let rel: Vec<_> = plan.iter().map(|t| t.relative.as_str()).collect();
        assert_eq!(rel, vec!["b.txt", "sub/a.txt", "sub/deeper/c.txt"]);
        assert_eq!(plan[2].remote.as_str(), "http://cbfs:8484/site/sub/deeper/c.txt");
    }

    #[test]
    fn test_plan_file() {
        let dir = parse_url("http://cbfs:8484/site/").unwrap();
        let t = plan_file(Path::new("/tmp/x/report.pdf"), &dir);
        assert_eq!(t.remote.as_str(), "http://cbfs:8484/site/report.pdf");

        let exact = parse_url("http://cbfs:8484/site/renamed.pdf").unwrap();
        let t = plan_file(Path::new("/tmp/x/report.pdf"), &exact);
        assert_eq!(t.remote, exact);
    }

    #[test]
    fn test_flag_parsing() {
        let opts = UploadArgs::try_parse_from(["-v", "--delete", "/src", "http://x/"]).unwrap();
        assert!(opts.verbose && opts.delete && !opts.noop);
        assert_eq!(opts.src, PathBuf::from("/src"));

        assert!(UploadArgs::try_parse_from(["/src", "http://x/", "extra"]).is_err());
    }
}
