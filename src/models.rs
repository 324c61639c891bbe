//! These models represent the conversation exchanged with the chat-completion API.
//!
//! The wire format is OpenAI's chat-completions schema, but we never pass raw JSON
//! around: responses are converted into these structs as soon as they arrive and
//! converted back right before a request goes out (see `providers::utils`).
pub mod message;
pub mod role;
pub mod tool;
