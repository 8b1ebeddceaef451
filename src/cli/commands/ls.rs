//! `ls`: list one directory.

use std::io::{self, Write};

use crate::cli::commands::{wrong_arity, CommandError};
use crate::cli::context::Context;
use crate::cli::registry::Arity;
use crate::client::{parse_url, ListResult};

pub async fn run<W: Write>(
    ctx: &Context,
    args: &[String],
    out: &mut W,
) -> Result<(), CommandError> {
    let [target] = args else {
        return Err(wrong_arity("ls", Arity::Exact(1), args));
    };
    let url = parse_url(target)?;
    let listing = ctx.store.list(&url, None).await?;
    render(&listing, out)?;
    Ok(())
}

/// Directories first (`name/`), then files, each sorted by name.
pub fn render<W: Write>(listing: &ListResult, out: &mut W) -> io::Result<()> {
    for (name, dir) in &listing.dirs {
        writeln!(out, "{}/\t{} items", name, dir.descendants)?;
    }
    for (name, file) in &listing.files {
        writeln!(out, "{}\t{}", name, file.length)?;
    }
    Ok(())
}
