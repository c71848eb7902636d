use consolewire_frame::Reply;
use serde_json::Value;
use tracing::debug;

use crate::config::ExtractMode;
use crate::error::Result;
use crate::extract::extract_with;

/// Locate and parse the JSON embedded in `text`.
///
/// `Ok(None)` means the text holds no JSON region; that is an ordinary
/// outcome, not an error.
pub fn parse(text: &str, mode: ExtractMode) -> Result<Option<Value>> {
    let json_text = extract_with(text, mode);
    if json_text.is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str(&json_text)?;
    debug!(len = json_text.len(), ?mode, "parsed embedded json");
    Ok(Some(value))
}

/// Decode a reply as UTF-8, then [`parse`] it.
pub fn parse_reply(reply: &Reply, mode: ExtractMode) -> Result<Option<Value>> {
    parse(reply.text()?, mode)
}
