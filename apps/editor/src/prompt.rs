use async_trait::async_trait;
use client_core::{Prompt, PromptOptions};
use tokio::io::{self, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

/// Asks on the terminal. Anything other than the ok label or `y` declines.
pub struct TerminalPrompt;

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn ask(&self, message: &str, options: &PromptOptions) -> bool {
        let question = format!(
            "[{}] {} ({} / {}): ",
            options.title, message, options.ok_label, options.cancel_label
        );
        if let Err(err) = show(&mut io::stderr(), &question).await {
            warn!(error = %err, "could not show prompt; declining");
            return false;
        }

        let mut answer = String::new();
        let mut stdin = BufReader::new(io::stdin());
        if let Err(err) = stdin.read_line(&mut answer).await {
            warn!(error = %err, "could not read prompt answer; declining");
            return false;
        }
        accepts(&answer, options)
    }
}

async fn show<W: AsyncWrite + Unpin>(out: &mut W, question: &str) -> io::Result<()> {
    out.write_all(question.as_bytes()).await?;
    out.flush().await
}

fn accepts(answer: &str, options: &PromptOptions) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case(&options.ok_label) || answer.eq_ignore_ascii_case("y")
}
