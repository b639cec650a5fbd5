//! tubeqa - Ask questions about a video's transcript
//!
//! Retrieval-augmented question answering over a single video. The transcript
//! is fetched and embedded once per session; each question is embedded, the
//! most similar transcript segments that fit a token budget become the prompt
//! context, and a language model answers from that context.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `transcript` - Transcript sources (YouTube captions, local files)
//! - `embedding` - Embedding providers (local fastembed models, OpenAI)
//! - `rag` - Context selection and answer composition
//! - `query_log` - Optional persistence of asked questions
//! - `session` - Per-document session tying the stages together
//!
//! # Example
//!
//! ```rust,no_run
//! use tubeqa::config::Settings;
//! use tubeqa::session::{AskOptions, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut session = Session::from_settings("dQw4w9WgXcQ", &settings)?;
//!
//!     let answer = session
//!         .ask("What is the song about?", AskOptions::default())
//!         .await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod query_log;
pub mod rag;
pub mod session;
pub mod tokens;
pub mod transcript;

pub use error::{Result, TubeqaError};
