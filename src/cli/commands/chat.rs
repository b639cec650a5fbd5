//! Interactive question session about one video.

use super::ask::{open_query_log, print_answer};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SessionArgs};
use crate::config::Settings;
use crate::session::{AskOptions, Session};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(video: &str, args: &SessionArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);

    if let Err(e) = preflight::check(Operation::Ask { document_id: video }, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut session = Session::from_settings(video, &settings)?;
    let query_log = open_query_log(&settings)?;

    println!(
        "\n{} {}",
        style(format!("tubeqa: {}", session.document_id())).bold().cyan(),
        style(format!("({}, {} embeddings)", session.language(), session.strategy())).dim()
    );
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        let mut options = AskOptions {
            max_tokens: args.max_tokens,
            ..AskOptions::default()
        };
        if let Some(log) = &query_log {
            options = options.persist_to(log);
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.ask(input, options).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => print_answer(&answer, args.show_prompt),
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
