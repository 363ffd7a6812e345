//! Terminal I/O for the interactive client.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    command::Command,
    formatter::MessageFormatter,
    session::SessionEvent,
};

pub const PROMPT: &str = "keyroom> ";

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}

/// Read prompt lines on a blocking thread and forward them as commands.
///
/// Ctrl+C and Ctrl+D are turned into [`Command::Quit`].
pub fn spawn_prompt(commands: mpsc::UnboundedSender<Command>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                let _ = commands.send(Command::Quit);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    match Command::parse(line) {
                        Ok(command) => {
                            let quit = command == Command::Quit;
                            if commands.send(command).is_err() || quit {
                                break;
                            }
                        }
                        Err(e) => println!("{}", e),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    tracing::info!("Input closed");
                    let _ = commands.send(Command::Quit);
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    let _ = commands.send(Command::Quit);
                    break;
                }
            }
        }
    })
}

/// Print session events until the channel closes.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    let mut me: Option<String> = None;
    while let Some(event) = events.recv().await {
        match &event {
            SessionEvent::Joined { room, .. } => me = Some(room.participant_id.clone()),
            SessionEvent::Disconnected => me = None,
            _ => {}
        }
        if let Some(text) = MessageFormatter::format_event(&event, me.as_deref()) {
            print!("{}", text);
            redisplay_prompt();
        }
    }
}
