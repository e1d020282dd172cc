use std::io::{self, BufRead, Write};
use std::sync::Arc;

use securestore_core::{AuthenticationPrompt, PromptCompletion, PromptConfig};
use tracing::debug;

/// Platform code reported when the user declines at the terminal.
const USER_CANCELED: i32 = 10;

/// Stands in for the biometric prompt: asks for confirmation on stdin.
///
/// The question is answered on a blocking thread so the request future keeps
/// waiting on the completion, as it would for a real UI prompt.
pub struct TerminalPrompt;

impl AuthenticationPrompt for TerminalPrompt {
    fn show(&self, config: PromptConfig, completion: Arc<PromptCompletion>) {
        tokio::task::spawn_blocking(move || {
            let answer = ask(&config);
            match answer {
                Ok(true) => completion.succeeded(),
                Ok(false) => {
                    completion.errored(USER_CANCELED, "Authentication canceled by user".to_string());
                }
                Err(err) => {
                    // dropping the completion dismisses the prompt
                    debug!("could not read confirmation: {err}");
                }
            }
        });
    }
}

fn ask(config: &PromptConfig) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{}", config.title)?;
    writeln!(stderr, "{}", config.subtitle)?;
    write!(stderr, "Authenticate? [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(is_confirmation(&line))
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
