//! Line reader for interactive mode.
//!
//! Reads lines on a background task and forwards them over a channel, so the
//! session loop can race input against Ctrl-C.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::warn;

/// Whether `line` asks to end the session.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q")
}

/// Spawn a reader over `input`. The channel closes on EOF, on a read error,
/// or when an exit command is entered. Blank lines are skipped.
pub fn spawn_reader<R>(input: R) -> mpsc::Receiver<String>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if is_exit_command(&line) {
                        break;
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF (Ctrl+D)
                Err(e) => {
                    warn!("Failed to read input: {e}");
                    break;
                }
            }
        }
    });

    rx
}

/// Reader over the process's stdin.
pub fn stdin_reader() -> mpsc::Receiver<String> {
    spawn_reader(tokio::io::BufReader::new(tokio::io::stdin()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let mut rx = spawn_reader(input);
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn exit_commands() {
        for cmd in ["exit", "quit", "/exit", "/quit", ":q"] {
            assert!(is_exit_command(cmd));
        }
        assert!(!is_exit_command("exit the todo list"));
    }

    #[tokio::test]
    async fn skips_blank_lines_and_trims() {
        let lines = collect(b"  list my todos \n\n   \nadd milk\n").await;
        assert_eq!(lines, vec!["list my todos", "add milk"]);
    }

    #[tokio::test]
    async fn stops_at_exit() {
        let lines = collect(b"first\nquit\nnever seen\n").await;
        assert_eq!(lines, vec!["first"]);
    }

    #[tokio::test]
    async fn stops_at_eof_without_newline() {
        let lines = collect(b"only line").await;
        assert_eq!(lines, vec!["only line"]);
    }
}
