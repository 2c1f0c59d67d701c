//! `docchat ask`: answer a single question.

use docchat_chain::AskOptions;
use docchat_core::error::{CompletionError, Error};
use docchat_core::stream::cancel_pair;
use std::path::Path;
use std::sync::Arc;

use crate::app::{self, StdoutSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Plain,
    WithSources,
    Json,
}

pub async fn run(
    config_path: &Path,
    question: &str,
    history_path: Option<&Path>,
    stream: bool,
    output: Output,
) -> anyhow::Result<()> {
    let config = app::load_config(config_path)?;
    let history = match history_path {
        Some(path) => app::read_history(path)?,
        None => Vec::new(),
    };
    let pipeline = app::build_pipeline(&config)?;

    let streaming = stream && config.streaming && output != Output::Json;
    let (handle, signal) = cancel_pair();
    let mut options = AskOptions::default().with_cancel(signal);
    if streaming {
        options.on_token = Some(Arc::new(StdoutSink));
    }

    let result = app::with_ctrl_c(pipeline.ask(question, &history, options), handle).await;

    let answer = match result {
        Ok(answer) => answer,
        Err(Error::Completion(CompletionError::Cancelled)) => {
            if streaming {
                println!();
            }
            eprintln!("[cancelled]");
            return Ok(());
        }
        Err(e) => {
            if streaming {
                println!();
            }
            let kind = e.kind();
            return Err(anyhow::Error::new(e).context(format!("Request failed ({kind})")));
        }
    };

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
        Output::Plain | Output::WithSources => {
            if streaming {
                println!();
            } else {
                println!("{}", answer.answer);
            }
            if output == Output::WithSources {
                println!();
                app::print_sources(&answer.source_chunks);
            }
        }
    }

    Ok(())
}
