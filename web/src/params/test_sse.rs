use serde::Deserialize;
use utoipa::ToSchema;

/// Body of `POST /api/test-sse`. Both fields are optional at the type level
/// so that missing values produce a 400 rather than a deserialization error.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendParams {
    /// User that should receive the test event
    pub target_user_id: Option<String>,
    /// Text carried in the event's `data.message`
    pub message: Option<String>,
}

impl SendParams {
    /// Returns the target and message when both are present and non-blank.
    pub(crate) fn validated(self) -> Option<(String, String)> {
        let target = self.target_user_id.filter(|t| !t.trim().is_empty())?;
        let message = self.message.filter(|m| !m.trim().is_empty())?;
        Some((target.trim().to_string(), message))
    }
}
