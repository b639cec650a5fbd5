//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod history;
mod transcript;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use history::run_history;
pub use transcript::run_transcript;
