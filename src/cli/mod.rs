//! CLI module for tubeqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::Settings;
use clap::{Args, Parser, Subcommand};

/// tubeqa - Ask questions about a video's transcript
///
/// Fetches the transcript of a YouTube video (or reads a local transcript
/// file), finds the passages most relevant to your question and answers from them.
#[derive(Parser, Debug)]
#[command(name = "tubeqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TUBEQA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that answer questions.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Token budget for transcript context in the prompt
    #[arg(short = 't', long)]
    pub max_tokens: Option<usize>,

    /// Use the chat model with conversation history
    #[arg(long)]
    pub turbo: bool,

    /// Embedding strategy (hf, openai)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Transcript and answer language (e.g. en, tr)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Save questions and answers to the query log
    #[arg(short, long)]
    pub persist: bool,

    /// Print the prompt sent to the model
    #[arg(long)]
    pub show_prompt: bool,
}

impl SessionArgs {
    /// Override configured values with the ones given on the command line.
    pub fn apply(&self, settings: &mut Settings) {
        if self.turbo {
            settings.completion.turbo = true;
        }
        if let Some(strategy) = &self.strategy {
            settings.embedding.strategy = strategy.clone();
        }
        if let Some(lang) = &self.lang {
            settings.general.language = lang.clone();
        }
        if self.persist {
            settings.log.persist = true;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about a video
    Ask {
        /// YouTube URL/ID, or path to a transcript file
        video: String,

        /// The question to ask
        question: String,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Start an interactive question session about a video
    Chat {
        /// YouTube URL/ID, or path to a transcript file
        video: String,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the transcript of a video
    Transcript {
        /// YouTube URL/ID, or path to a transcript file
        video: String,

        /// Transcript language (e.g. en, tr)
        #[arg(short, long)]
        lang: Option<String>,

        /// Output raw JSON segments
        #[arg(long)]
        json: bool,
    },

    /// Show recently logged questions
    History {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_flags() {
        let cli = Cli::parse_from([
            "tubeqa",
            "ask",
            "abc123",
            "What is said at the end?",
            "--max-tokens",
            "200",
            "--turbo",
            "--strategy",
            "openai",
        ]);

        match cli.command {
            Commands::Ask { video, question, session } => {
                assert_eq!(video, "abc123");
                assert_eq!(question, "What is said at the end?");
                assert_eq!(session.max_tokens, Some(200));
                assert!(session.turbo);

                let mut settings = Settings::default();
                session.apply(&mut settings);
                assert!(settings.completion.turbo);
                assert_eq!(settings.embedding.strategy, "openai");
                assert_eq!(settings.general.language, "en");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
