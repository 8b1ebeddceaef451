//! `getconf` and `setconf`.

use std::io::Write;

use crate::cli::commands::{wrong_arity, CommandError};
use crate::cli::context::Context;
use crate::cli::registry::Arity;
use crate::cluster::Param;
use crate::transport::retrieve_or_default;

/// Print the current cluster configuration.
pub async fn getconf<W: Write>(ctx: &Context, out: &mut W) -> Result<(), CommandError> {
    let config = retrieve_or_default(ctx.transport.as_ref()).await?;
    config.dump(out)?;
    Ok(())
}

/// Change one parameter: retrieve, mutate, store.
///
/// The store overwrites unconditionally. A concurrent `setconf` between
/// our retrieve and store is silently lost.
pub async fn setconf(ctx: &Context, args: &[String]) -> Result<(), CommandError> {
    let [key, value] = args else {
        return Err(wrong_arity("setconf", Arity::Exact(2), args));
    };
    let param: Param = key.parse()?;

    let mut config = retrieve_or_default(ctx.transport.as_ref()).await?;
    let previous = config.display_value(param);
    config.set(param, value)?;

    ctx.transport.store(&config).await?;

    tracing::info!(
        param = %param,
        from = %previous,
        to = %config.display_value(param),
        location = %ctx.transport.location(),
        "Configuration updated"
    );
    Ok(())
}
