//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SessionArgs};
use crate::config::Settings;
use crate::query_log::SqliteQueryLog;
use crate::rag::context::format_context_for_display;
use crate::session::{Answer, AskOptions, Session};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, args: &SessionArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);

    if let Err(e) = preflight::check(Operation::Ask { document_id: video }, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut session = Session::from_settings(video, &settings)?;
    let query_log = open_query_log(&settings)?;

    let mut options = AskOptions {
        max_tokens: args.max_tokens,
        ..AskOptions::default()
    };
    if let Some(log) = &query_log {
        options = options.persist_to(log);
    }

    let spinner = Output::spinner("Reading transcript and searching for context...");

    match session.ask(question, options).await {
        Ok(answer) => {
            spinner.finish_and_clear();
            print_answer(&answer, args.show_prompt);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Open the query log when persistence is enabled.
pub(super) fn open_query_log(settings: &Settings) -> Result<Option<SqliteQueryLog>> {
    if !settings.log.persist {
        return Ok(None);
    }
    Ok(Some(SqliteQueryLog::new(&settings.sqlite_path())?))
}

/// Print an answer with the context it was built from.
pub(super) fn print_answer(answer: &Answer, show_prompt: bool) {
    println!("\n{}\n", answer.answer);

    if !answer.context.is_empty() {
        Output::header(&format!("Context ({} tokens)", answer.context.token_count()));
        println!("{}", format_context_for_display(&answer.context));
    }

    if show_prompt {
        Output::header("Prompt");
        println!("{}", answer.prompt);
    }

    if let Some(e) = &answer.persist_error {
        Output::warning(&format!("Answer was not saved: {}", e));
    }
}
