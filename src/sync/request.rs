use serde_json::{Map, Value};

use crate::prelude::*;

/// One inbound message on the sync channel.
///
/// A missing (or `null`) `timestamp` asks for the stored position, a present one reports a new position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, new)]
pub struct SyncRequest {
    pub content_id: ContentId,
    #[serde(default)]
    pub timestamp: Option<PlaybackTimestamp>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RequestError {
    #[snafu(display("sync request is not valid: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("sync requests must be sent as text frames"))]
    BinaryFrame,
}

impl SyncRequest {
    /// Only a JSON object is a request, a positional array is rejected even if its items line up.
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        let fields: Map<String, Value> = serde_json::from_str(text).context(JsonSnafu)?;
        serde_json::from_value(Value::Object(fields)).context(JsonSnafu)
    }
}
