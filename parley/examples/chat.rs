//! Interactive chat against a streaming endpoint.
//!
//! Prints each assistant reply as it streams. Ctrl-C cancels the reply in
//! flight; an empty line exits.
//!
//! Set PARLEY_CHAT_ENDPOINT (and PARLEY_API_TOKEN if needed), then run:
//!   RUST_LOG=parley_stream=debug cargo run --example chat -p parley

use std::io::{BufRead, Write};

use parley::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = ChatClient::from_env()?;
    let mut transcript = Transcript::new();
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut prompt = String::new();
        if stdin.lock().read_line(&mut prompt)? == 0 || prompt.trim().is_empty() {
            break;
        }

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let mut updates = transcript.subscribe();
        let printer = tokio::spawn(async move {
            let mut shown = 0;
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                let Some(last) = snapshot.messages.last() else {
                    continue;
                };
                if last.role != Role::Assistant {
                    continue;
                }
                if last.content.len() > shown {
                    print!("{}", &last.content[shown..]);
                    shown = last.content.len();
                    let _ = std::io::stdout().flush();
                }
                if !snapshot.streaming {
                    break;
                }
            }
        });

        let outcome = client.stream_turn(&mut transcript, prompt.trim(), cancel).await;
        watcher.abort();
        let _ = printer.await;
        println!();

        match outcome {
            TurnOutcome::Completed => {}
            TurnOutcome::Cancelled => println!("[cancelled]"),
            TurnOutcome::Failed(err) if err.is_retryable() => println!("[{err}; try again]"),
            TurnOutcome::Failed(err) => println!("[{err}]"),
        }
    }
    Ok(())
}
