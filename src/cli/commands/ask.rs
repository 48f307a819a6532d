use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::commands::AppContext;
use crate::domain::models::{GenerationOptions, Message};
use crate::services::gateway::{ChatOutput, ChatStreamEvent};

/// Options collected from the `ask` command line.
pub struct AskArgs {
    pub question: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub no_retrieval: bool,
    pub no_stream: bool,
}

/// Handle the ask command: retrieve context, generate, print the answer.
pub async fn execute(ctx: &AppContext, args: AskArgs) -> Result<()> {
    let options = GenerationOptions {
        provider: args.provider,
        base_url: args.base_url,
        api_key: args.api_key,
        model: args.model,
    };
    let config = ctx.gateway.resolve(&options)?;

    let messages = vec![Message::user(args.question)];
    let output = ctx
        .orchestrator
        .ask(messages, config, !args.no_stream, !args.no_retrieval)
        .await
        .context("Failed to generate an answer")?;

    match output {
        ChatOutput::Complete(answer) => println!("{answer}"),
        ChatOutput::Stream(mut events) => {
            let mut stdout = std::io::stdout();
            while let Some(event) = events.recv().await {
                match event {
                    ChatStreamEvent::Delta(text) => {
                        stdout.write_all(text.as_bytes())?;
                        stdout.flush()?;
                    }
                    ChatStreamEvent::Done => break,
                    ChatStreamEvent::Error(message) => {
                        println!();
                        anyhow::bail!("stream interrupted: {message}");
                    }
                }
            }
            println!();
        }
    }

    Ok(())
}
