/// Errors that can occur while pulling JSON out of a reply.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// The located region is not valid JSON.
    ///
    /// Expected now and then: the default scan is heuristic.
    #[error("embedded JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The reply could not be decoded as text.
    #[error("reply could not be decoded: {0}")]
    Reply(#[from] consolewire_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, JsonError>;
