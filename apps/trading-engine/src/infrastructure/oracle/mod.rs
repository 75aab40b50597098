//! Decision oracle adapters.

mod chat_completions;
mod prompt;
mod scripted;

pub use chat_completions::{ChatCompletionsOracle, ChatOracleConfig};
pub use scripted::ScriptedOracle;
