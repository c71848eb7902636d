use std::io::BufRead;
use std::path::Path;

use crate::error::{Result, SessionError};

/// JSON object the diagnostic scripts send as a command.
pub const TEN_KEY_OBJECT: &str = r#"{"one":1,"two":2,"three":3,"four":4,"five":5,"six":6,"seven":7,"eight":8,"nine":9,"ten":10}"#;

/// Ordered list of commands sent one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    commands: Vec<String>,
}

impl Script {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    /// The command list run after each payload file in feed mode.
    pub fn payload_check() -> Self {
        Self::new([
            "help",
            "list",
            "version",
            "count",
            "json",
            TEN_KEY_OBJECT,
            "count",
            "json",
        ])
    }

    /// One command per line. Blank lines and lines starting with `#` are
    /// skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut commands = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            commands.push(line.trim_end().to_string());
        }
        Ok(Self { commands })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| SessionError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|source| SessionError::File {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// The diagnostic script: console metadata, a JSON command, then queries
/// about the JSON the console stored.
impl Default for Script {
    fn default() -> Self {
        Self::new([
            "help",
            "list",
            "version",
            TEN_KEY_OBJECT,
            "count",
            "json",
            "sn?",
            "runType?",
        ])
    }
}
