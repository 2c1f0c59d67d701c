//! `docchat chat`: interactive conversation over the indexed documents.
//!
//! The CLI owns the conversation history and hands the whole of it to the
//! pipeline with every question. Ctrl+C while an answer is streaming
//! cancels that request; at the prompt it exits.

use docchat_chain::AskOptions;
use docchat_core::error::{CompletionError, Error};
use docchat_core::message::ConversationTurn;
use docchat_core::stream::cancel_pair;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{self, StdoutSink};

pub async fn run(config_path: &Path, stream: bool) -> anyhow::Result<()> {
    let config = app::load_config(config_path)?;
    let pipeline = app::build_pipeline(&config)?;
    let streaming = stream && config.streaming;

    println!();
    println!("  docchat: interactive mode");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Index:     {}", config.retrieval.index_path.display());
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or press Ctrl+C at the prompt to quit; '/clear' resets history.");
    println!();
    println!("  Assistant > {}", pipeline.greeting());
    println!();

    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let question = line.trim();

        match question {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                history.clear();
                println!("  (history cleared)");
                println!();
                continue;
            }
            _ => {}
        }

        let (handle, signal) = cancel_pair();
        let mut options = AskOptions::default().with_cancel(signal);
        if streaming {
            options.on_token = Some(Arc::new(StdoutSink));
        }

        print!("\n  Assistant > ");
        std::io::stdout().flush()?;

        let result = app::with_ctrl_c(pipeline.ask(question, &history, options), handle).await;

        match result {
            Ok(answer) => {
                if streaming {
                    println!();
                } else {
                    println!("{}", answer.answer);
                }
                println!();
                history.push(ConversationTurn::new(question, answer.answer));
            }
            Err(Error::Completion(CompletionError::Cancelled)) => {
                println!();
                eprintln!("  [cancelled]");
                println!();
            }
            Err(e) => {
                println!();
                eprintln!("  [Error: {}] {e}", e.kind());
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
