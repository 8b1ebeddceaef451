//! `rm`: delete files, optionally a whole tree.

use std::io::Write;

use clap::Parser;
use futures_util::stream::{self, StreamExt};
use url::Url;

use crate::cli::commands::CommandError;
use crate::cli::context::Context;
use crate::client::{child_url, parse_url, RECURSIVE_DEPTH};

#[derive(Debug, Parser)]
#[command(name = "rm", no_binary_name = true)]
struct RmArgs {
    /// Remove everything below each URL
    #[arg(short = 'r')]
    recursive: bool,

    /// Print each removed URL
    #[arg(short = 'v')]
    verbose: bool,

    #[arg(required = true)]
    urls: Vec<String>,
}

pub async fn run<W: Write>(
    ctx: &Context,
    args: &[String],
    out: &mut W,
) -> Result<(), CommandError> {
    let opts = RmArgs::try_parse_from(args)?;

    for target in &opts.urls {
        let url = parse_url(target)?;
        if opts.recursive {
            remove_tree(ctx, &url, opts.verbose, out).await?;
        } else {
            ctx.store.delete(&url).await?;
            if opts.verbose {
                writeln!(out, "Removed {}", url)?;
            }
        }
    }
    Ok(())
}

async fn remove_tree<W: Write>(
    ctx: &Context,
    url: &Url,
    verbose: bool,
    out: &mut W,
) -> Result<(), CommandError> {
    let listing = ctx.store.list(url, Some(RECURSIVE_DEPTH)).await?;
    if listing.files.is_empty() {
        ctx.store.delete(url).await?;
        if verbose {
            writeln!(out, "Removed {}", url)?;
        }
        return Ok(());
    }

    let targets: Vec<Url> = listing.files.keys().map(|name| child_url(url, name)).collect();
    delete_all(ctx, targets, verbose, out).await
}

/// Delete `targets` with `workers` requests in flight. Every target is
/// attempted; the call fails afterwards if any delete did.
pub(crate) async fn delete_all<W: Write>(
    ctx: &Context,
    targets: Vec<Url>,
    verbose: bool,
    out: &mut W,
) -> Result<(), CommandError> {
    let total = targets.len();
    let store = &ctx.store;
    let mut results = stream::iter(targets)
        .map(|target| async move {
            let res = store.delete(&target).await;
            (target, res)
        })
        .buffer_unordered(ctx.settings.workers.max(1));

    let mut failed = 0;
    while let Some((target, res)) = results.next().await {
        match res {
            Ok(()) => {
                if verbose {
                    writeln!(out, "Removed {}", target)?;
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(url = %target, error = %e, "Delete failed");
            }
        }
    }

    tracing::debug!(total, failed, "Deletes finished");
    if failed > 0 {
        return Err(CommandError::Incomplete {
            operation: "deletes",
            failed,
            total,
        });
    }
    Ok(())
}
