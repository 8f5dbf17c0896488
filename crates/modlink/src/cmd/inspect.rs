use modlink_module::{display_name, HostConfig, LibraryLoader, NativeLoader};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cmd::InspectArgs;
use crate::exit::{CliError, CliResult, LOAD_FAILED, SUCCESS};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct InspectOutput {
    path: String,
    name: String,
    symbol: String,
    exported: bool,
}

pub fn run(args: InspectArgs, config: &HostConfig, format: OutputFormat) -> CliResult<i32> {
    // SAFETY: opening runs the library's initialisers; the handshake itself is
    // only resolved, never called.
    let library = unsafe { NativeLoader.open(&args.path) }.map_err(|err| {
        CliError::new(
            LOAD_FAILED,
            format!("failed to open {}: {err}", args.path.display()),
        )
    })?;

    // SAFETY: the resolved pointer is only checked for presence.
    let exported = unsafe { NativeLoader.resolve_handshake(&library, &config.handshake_symbol) }
        .is_some();
    debug!(path = %args.path.display(), exported, "inspected module library");

    if let Err(err) = NativeLoader.close(library) {
        warn!(path = %args.path.display(), error = %err, "failed to close library");
    }

    let out = InspectOutput {
        path: args.path.display().to_string(),
        name: display_name(&args.path),
        symbol: config.handshake_symbol.clone(),
        exported,
    };
    let rows = vec![
        ("path", out.path.clone()),
        ("name", out.name.clone()),
        ("symbol", out.symbol.clone()),
        ("exported", out.exported.to_string()),
    ];
    print_report(&out, rows, format);

    Ok(if exported { SUCCESS } else { LOAD_FAILED })
}
