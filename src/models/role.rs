use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The author of a message. The system prompt is sent separately by the provider.
pub enum Role {
    User,
    Assistant,
}
