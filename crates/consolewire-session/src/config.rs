use std::time::Duration;

use consolewire_frame::{FrameConfig, Sentinel};
use consolewire_json::ExtractMode;

/// Command sent before the connection is closed.
pub const SHUTDOWN_COMMAND: &str = "done";

/// Session behavior configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prompt text that terminates every reply.
    pub sentinel: Sentinel,
    /// Reply size cap and socket deadlines.
    pub frame: FrameConfig,
    /// Bound on each TCP connect attempt. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Replies slower than this are logged as possible throttling.
    pub slow_reply_threshold: Option<Duration>,
    /// How embedded JSON is located in replies.
    pub extract_mode: ExtractMode,
    /// Sent by [`Session::close`](crate::Session::close); no reply is awaited.
    pub shutdown_command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sentinel: Sentinel::default(),
            frame: FrameConfig::default(),
            connect_timeout: None,
            slow_reply_threshold: None,
            extract_mode: ExtractMode::default(),
            shutdown_command: SHUTDOWN_COMMAND.to_string(),
        }
    }
}
