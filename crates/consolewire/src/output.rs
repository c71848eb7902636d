use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use consolewire_session::ConsoleSummary;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One command/reply exchange as printed by `run` and `feed`.
#[derive(Debug, Serialize)]
pub struct ExchangeOutput {
    pub command: String,
    pub complete: bool,
    pub elapsed_ms: u64,
    /// Reply text; `None` when the reply was not valid UTF-8 or never came.
    pub reply: Option<String>,
    /// Embedded JSON, when the reply carried any that parsed.
    pub json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub timestamp: String,
}

impl ExchangeOutput {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            complete: false,
            elapsed_ms: 0,
            reply: None,
            json: None,
            error: None,
            raw: Vec::new(),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_exchange(out: &ExchangeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "COMPLETE", "ELAPSED", "REPLY", "JSON"])
                .add_row(vec![
                    preview(&out.command),
                    out.complete.to_string(),
                    format!("{}ms", out.elapsed_ms),
                    reply_cell(out),
                    out.json.as_ref().map(Value::to_string).unwrap_or_default(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "> {} ({}ms{})",
                out.command,
                out.elapsed_ms,
                if out.complete { "" } else { ", incomplete" }
            );
            if let Some(reply) = &out.reply {
                println!("{}", reply.trim_end());
            }
            if let Some(json) = &out.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
                );
            }
            if let Some(error) = &out.error {
                println!("! {error}");
            }
        }
        OutputFormat::Raw => print_raw(&out.raw),
    }
}

#[derive(Serialize)]
struct SummaryOutput {
    commands: usize,
    json_lines: usize,
    done: bool,
    timestamp: String,
}

pub fn print_summary(summary: &ConsoleSummary, format: OutputFormat) {
    let out = SummaryOutput {
        commands: summary.commands,
        json_lines: summary.json_lines,
        done: summary.done,
        timestamp: now_unix_seconds(),
    };
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMANDS", "JSON LINES", "DONE"])
                .add_row(vec![
                    out.commands.to_string(),
                    out.json_lines.to_string(),
                    out.done.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "client left: commands={} json_lines={} done={}",
                out.commands, out.json_lines, out.done
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn reply_cell(out: &ExchangeOutput) -> String {
    match (&out.reply, &out.error) {
        (Some(reply), _) => preview(reply),
        (None, Some(error)) => format!("<{error}>"),
        (None, None) => format!("<binary {} bytes>", out.raw.len()),
    }
}

/// Replies echo `\r` line endings; keep table cells on clean lines.
fn preview(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "").trim_end().to_string()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
