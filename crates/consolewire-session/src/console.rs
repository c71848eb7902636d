use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;

use consolewire_frame::Sentinel;
use consolewire_transport::{ConsoleAddr, ConsoleListener};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SHUTDOWN_COMMAND;
use crate::error::Result;

const VERSION_TEXT: &str = concat!("consolewire stub console version ", env!("CARGO_PKG_VERSION"));

const HELP_TEXT: &str = "Commands available in consolewire stub console:\
\n done\
\n list\
\n vers\
\n count\
\n json\
\n help or ?\
\nAny JSON object or array line is stored.";

/// What happened on one served connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleSummary {
    /// Lines received, including the shutdown command.
    pub commands: usize,
    /// JSON lines stored.
    pub json_lines: usize,
    /// The client ended with the shutdown command rather than hanging up.
    pub done: bool,
}

/// A minimal line console: prompts, echoes, and answers a few commands.
///
/// Serves one connection at a time.
pub struct StubConsole {
    listener: ConsoleListener,
    sentinel: Sentinel,
}

impl StubConsole {
    /// Bind and derive the prompt from the bound port.
    pub fn bind(addr: &ConsoleAddr) -> Result<Self> {
        let listener = ConsoleListener::bind(addr)?;
        let sentinel = Sentinel::for_port(listener.local_addr().port());
        Ok(Self { listener, sentinel })
    }

    /// Override the prompt.
    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    /// Accept the next client and serve it until it leaves.
    pub fn serve_next(&self) -> Result<ConsoleSummary> {
        let (mut stream, peer) = self.listener.accept()?;
        info!(%peer, "console client connected");

        let summary = serve_connection(&mut stream, &self.sentinel)?;
        let _ = stream.shutdown();

        info!(
            %peer,
            commands = summary.commands,
            done = summary.done,
            "console client left"
        );
        Ok(summary)
    }
}

/// Run the console protocol over one connection.
///
/// Returns when the client sends the shutdown command or hangs up.
pub fn serve_connection<S: Read + Write>(
    stream: &mut S,
    sentinel: &Sentinel,
) -> Result<ConsoleSummary> {
    let mut prompt = Vec::with_capacity(sentinel.as_bytes().len() + 1);
    prompt.push(b'\n');
    prompt.extend_from_slice(sentinel.as_bytes());

    let mut summary = ConsoleSummary::default();
    let mut stored: Option<String> = None;

    stream.write_all(&prompt)?;
    stream.flush()?;

    while let Some(line) = read_line(stream)? {
        summary.commands += 1;
        let text = String::from_utf8_lossy(&line);
        debug!(line = %text, "console received line");

        let mut reply = line.clone();
        reply.push(b'\r');

        if text.starts_with(SHUTDOWN_COMMAND) {
            stream.write_all(&reply)?;
            stream.flush()?;
            summary.done = true;
            break;
        }

        match answer(&text, &mut stored) {
            Answer::Body(body) => {
                reply.push(b'\n');
                reply.extend_from_slice(body.as_bytes());
                reply.push(b'\r');
            }
            Answer::Stored => summary.json_lines += 1,
            Answer::Echo => {}
        }

        reply.extend_from_slice(&prompt);
        stream.write_all(&reply)?;
        stream.flush()?;
    }

    Ok(summary)
}

enum Answer {
    /// Extra text after the echo.
    Body(String),
    /// The line was JSON and is now the stored value.
    Stored,
    Echo,
}

fn answer(line: &str, stored: &mut Option<String>) -> Answer {
    let command = line.trim();
    match command {
        "json" => Answer::Body(stored.clone().unwrap_or_else(|| "{}".to_string())),
        "count" => {
            let count = stored
                .as_deref()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .map_or(0, |value| json_members(&value));
            Answer::Body(format!("{{\"count\":{count}}}"))
        }
        "help" | "?" => Answer::Body(HELP_TEXT.to_string()),
        _ if command.starts_with("vers") => Answer::Body(VERSION_TEXT.to_string()),
        _ => match serde_json::from_str::<Value>(command) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => {
                debug!(members = json_members(&value), "console stored json");
                *stored = Some(line.to_string());
                Answer::Stored
            }
            _ => Answer::Echo,
        },
    }
}

fn json_members(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}

/// Read one `\n`-terminated line, dropping `\r` and NUL bytes.
///
/// `None` means the client hung up.
fn read_line<S: Read>(stream: &mut S) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => {
                if !line.is_empty() {
                    warn!(len = line.len(), "client hung up mid-line");
                }
                return Ok(None);
            }
            Ok(_) => match byte[0] {
                b'\n' => return Ok(Some(line)),
                b'\r' | 0 => {}
                b => line.push(b),
            },
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
}
