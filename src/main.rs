//! cbfsclient entry point.
//!
//! ```text
//! cbfsclient [-flags] cmd cmdargs
//!
//!     getconf                      print the cluster configuration
//!     setconf prop value           change one configuration parameter
//!     ls url                       list a directory
//!     rm [-r] [-v] url...          remove files
//!     upload [opts] src dest-url   upload a file or directory tree
//! ```

use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use cbfsclient::cli::{self, Cli, Context, Registry};
use cbfsclient::observability::logging;

fn print_usage<H>(registry: &Registry<H>) {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "cbfsclient".to_string());
    eprint!("{}", registry.usage(&program));
    eprintln!("\nFlags:\n{}", Cli::command().render_help());
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let registry = cli::registry();

    let invocation = match registry.dispatch(&cli.args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&registry);
            return ExitCode::FAILURE;
        }
    };

    let settings = match cli.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid settings");
            return ExitCode::FAILURE;
        }
    };

    let ctx = match Context::connect(settings).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "Error connecting");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    match cli::execute(*invocation.handler, &ctx, invocation.args, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(command = invocation.name, error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}
