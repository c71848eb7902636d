use std::io::{Read, Write};

use consolewire_frame::FrameError;
use consolewire_json::ExtractMode;
use consolewire_session::{Exchange, Session, SessionError};
use tracing::{debug, error, warn};

use crate::exit::{session_error, CliResult, DATA_INVALID, SUCCESS, TIMEOUT};
use crate::output::{print_exchange, ExchangeOutput, OutputFormat};

/// Problems seen across a run that do not stop it.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub exchanges: usize,
    pub timeouts: usize,
    pub decode_errors: usize,
    pub malformed_json: usize,
}

impl Tally {
    /// Decode errors outrank timeouts; dropped replies and bad JSON are advisory.
    pub fn exit_code(&self) -> i32 {
        if self.decode_errors > 0 {
            DATA_INVALID
        } else if self.timeouts > 0 {
            TIMEOUT
        } else {
            SUCCESS
        }
    }
}

/// Print one exchange and record what went wrong with it.
///
/// Only errors that leave the connection unusable are returned.
pub(crate) fn report(
    label: &str,
    result: Result<Exchange, SessionError>,
    mode: ExtractMode,
    format: OutputFormat,
    tally: &mut Tally,
) -> CliResult<()> {
    let mut out = ExchangeOutput::new(label);

    match result {
        Ok(exchange) => {
            tally.exchanges += 1;
            out.complete = exchange.is_complete();
            out.elapsed_ms = exchange.elapsed.as_millis() as u64;
            out.raw = exchange.reply.payload.to_vec();

            match exchange.text() {
                Ok(text) => out.reply = Some(text.to_string()),
                Err(err) => {
                    error!(command = label, error = %err, "reply is not valid UTF-8");
                    tally.decode_errors += 1;
                    out.error = Some(err.to_string());
                }
            }

            if out.reply.is_some() {
                match exchange.json(mode) {
                    Ok(json) => out.json = json,
                    Err(err) => {
                        warn!(command = label, error = %err, "reply carries malformed JSON");
                        tally.malformed_json += 1;
                        out.error = Some(err.to_string());
                    }
                }
            }
        }
        Err(SessionError::Frame(err @ FrameError::NoResponse { .. })) => {
            warn!(command = label, error = %err, "no reply before the read deadline");
            tally.timeouts += 1;
            out.error = Some(err.to_string());
        }
        Err(err) => return Err(session_error("exchange failed", err)),
    }

    print_exchange(&out, format);
    Ok(())
}

/// Consume the console greeting. A missing greeting counts as a timeout.
pub(crate) fn read_banner<R: Read, W: Write>(
    session: &mut Session<R, W>,
    format: OutputFormat,
    tally: &mut Tally,
) -> CliResult<()> {
    match session.read_banner() {
        Ok(banner) => {
            debug!(len = banner.len(), complete = banner.complete, "console greeted");
            Ok(())
        }
        Err(err) => {
            let mode = session.config().extract_mode;
            report("<banner>", Err(err), mode, format, tally)
        }
    }
}

/// Run every command in order, reporting each reply.
///
/// Stops early once a reply has missed its deadline: anything read after
/// that could belong to the earlier command.
pub(crate) fn run_commands<'a, R: Read, W: Write>(
    session: &mut Session<R, W>,
    commands: impl IntoIterator<Item = &'a str>,
    format: OutputFormat,
    tally: &mut Tally,
) -> CliResult<()> {
    let mode = session.config().extract_mode;
    for command in commands {
        if stalled(session) {
            break;
        }
        let result = session.request(command);
        report(command, result, mode, format, tally)?;
    }
    Ok(())
}

/// True when the session can no longer match replies to commands.
pub(crate) fn stalled<R: Read, W: Write>(session: &Session<R, W>) -> bool {
    if session.is_out_of_sync() {
        warn!("skipping remaining commands after a missed reply");
        return true;
    }
    false
}

/// Send the shutdown command. The console may already be gone, so failures
/// here only warn.
pub(crate) fn finish<R: Read, W: Write>(session: Session<R, W>) {
    if let Err(err) = session.close() {
        warn!(error = %err, "failed to send shutdown command");
    }
}
