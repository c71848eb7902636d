use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use consolewire_frame::Sentinel;
use consolewire_session::StubConsole;
use consolewire_transport::ConsoleAddr;
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{frame_error, session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_summary, OutputFormat};

/// Exit status after a second interrupt while blocked in accept.
const INTERRUPTED: i32 = 130;

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut console = StubConsole::bind(&ConsoleAddr::new(args.bind.clone(), args.port))
        .map_err(|err| session_error("bind failed", err))?;
    if let Some(text) = &args.sentinel {
        let sentinel = Sentinel::new(text.clone()).map_err(|err| frame_error("--sentinel", err))?;
        console = console.with_sentinel(sentinel);
    }
    info!(addr = %console.local_addr(), sentinel = %console.sentinel(), "stub console ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let summary = console
            .serve_next()
            .map_err(|err| session_error("console connection failed", err))?;
        print_summary(&summary, format);

        if args.once {
            break;
        }
    }

    Ok(SUCCESS)
}

/// The first interrupt stops after the current client; a second exits at once.
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
