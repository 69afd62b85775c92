//! Interactive terminal front end
//!
//! Reads one line at a time from stdin. While a call is in flight no new
//! input is accepted: the loop waits for the session to go idle first.

use crate::backend::{Document, ALLOWED_EXTENSIONS};
use crate::runtime::{RuntimeError, SessionHandle};
use crate::session::{BusyState, Message, Role};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    Upload(PathBuf),
    NewChat,
    Help,
    Quit,
    Invalid(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (command, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(c, r)| (c, r.trim()));

        match command {
            "/quit" | "/exit" => ReplInput::Quit,
            "/help" => ReplInput::Help,
            "/new" => ReplInput::NewChat,
            "/upload" if rest.is_empty() => ReplInput::Invalid("Usage: /upload <path>".to_string()),
            "/upload" => ReplInput::Upload(PathBuf::from(rest)),
            _ => ReplInput::Message(line.to_string()),
        }
    }
}

fn print_welcome() {
    println!("Document Chat");
    println!("Upload a document and ask questions about it.");
    println!("Answers can be wrong. Check important info. Type /help for commands.\n");
}

fn print_help() {
    println!("  /upload <path>  upload a document ({})", ALLOWED_EXTENSIONS.join(", "));
    println!("  /new            start a new chat");
    println!("  /quit           exit");
    println!("  anything else   ask a question about the uploaded document");
}

// User lines are already on screen as typed
fn render(message: &Message) {
    if message.role == Role::Assistant {
        println!("{}> {}\n", message.role.as_str(), message.content);
    }
}

fn prompt() -> std::io::Result<()> {
    print!("you> ");
    std::io::stdout().flush()
}

/// Run the interactive loop until `/quit`, end of input, or runtime shutdown
pub async fn run(handle: &SessionHandle) -> std::io::Result<()> {
    print_welcome();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let outcome = match ReplInput::parse(&line) {
            ReplInput::Quit => break,
            ReplInput::Help => {
                print_help();
                continue;
            }
            ReplInput::Invalid(usage) => {
                println!("{usage}");
                continue;
            }
            ReplInput::NewChat => {
                let outcome = handle.new_chat().await;
                printed = 0;
                print_welcome();
                outcome
            }
            ReplInput::Upload(path) => match Document::from_path(&path).await {
                Ok(document) => handle.upload_document(document).await,
                Err(e) => {
                    println!("⚠️  {e}");
                    continue;
                }
            },
            ReplInput::Message(text) => handle.send_message(text).await,
        };

        match outcome {
            Ok(BusyState::Idle) => {}
            Ok(BusyState::Sending) => println!("…"),
            Ok(BusyState::Uploading) => println!("⏳ Uploading..."),
            Err(RuntimeError::Rejected(e)) => {
                println!("⚠️  {e}");
                continue;
            }
            Err(RuntimeError::Stopped) => break,
        }

        let Ok(session) = handle.wait_until_idle().await else {
            break;
        };
        for message in session.messages().iter().skip(printed) {
            render(message);
        }
        printed = session.messages().len();
    }

    Ok(())
}
