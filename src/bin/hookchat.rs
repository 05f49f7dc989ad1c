//! Interactive terminal chat against a webhook.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a webhook
//! hookchat --webhook-url https://example.com/webhook/chat
//!
//! # Load options from a file, override the method
//! hookchat --options chat.yaml --method GET
//!
//! # Disable colors (useful for piping output)
//! hookchat --webhook-url https://example.com/webhook/chat --no-color
//! ```
//!
//! Set `RUST_LOG=hookchat=debug` to see request and reveal events on stderr.
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Remove every bubble
//! - `/session` - Show the session id
//! - `/reset` - Start a new session
//! - `/say <text>` - Show a bot bubble without sending
//! - `/note <text>` - Show a user bubble without sending
//! - `/config` - Show the current configuration
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use hookchat::chat::{ChatArgs, ChatCommand, help_text, parse_command};
use hookchat::{ChatConfig, ChatWidget, FileSessionStore, Side, TerminalView};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("hookchat [OPTIONS]");
    let options = args.to_options()?;
    let view = TerminalView::with_color(args.use_color());
    let store = FileSessionStore::open_default();
    tracing::debug!(store = %store.path().display(), "session store");

    let widget = ChatWidget::create(options, Box::new(view), Box::new(store))?;
    widget.settle().await;

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            widget.destroy();
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => widget.clear(),
                        ChatCommand::Session => {
                            print_info(&format!("Session: {}", widget.session_id()));
                        }
                        ChatCommand::Reset => match widget.reset_session() {
                            Ok(id) => print_info(&format!("New session: {id}")),
                            Err(err) => print_error(&format!("Session reset: {err}")),
                        },
                        ChatCommand::Say(text) => widget.add_message(&text, Side::Bot),
                        ChatCommand::Note(text) => widget.add_message(&text, Side::User),
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::ShowConfig => print_config(widget.config()),
                        ChatCommand::Invalid(message) => print_error(&message),
                    }
                    continue;
                }

                widget.submit(line);
                widget.settle().await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                widget.destroy();
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                print_error(&format!("Input error: {}", err));
                widget.destroy();
                break;
            }
        }
    }

    Ok(())
}

fn print_info(message: &str) {
    println!("    {}", message);
}

fn print_error(message: &str) {
    eprintln!("    error: {}", message);
}

fn print_config(config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Webhook: {} {}", config.method, config.webhook_url);
    println!("      Timeout: {}s", config.timeout.as_secs());
    if config.headers.is_empty() {
        println!("      Headers: (none)");
    } else {
        println!("      Headers:");
        for name in config.headers.keys() {
            println!("        - {}", name);
        }
    }
    println!("      Target: {} ({})", config.target, config.mode);
    println!(
        "      Keys: input={} session={}",
        config.chat_input_key, config.chat_session_key
    );
    println!(
        "      Resume session: {}",
        if config.load_previous_session {
            "yes"
        } else {
            "no"
        }
    );
    println!("      Max bubble length: {}", config.max_bubble_length);
    println!(
        "      Typing: {} ms/char + {} ms",
        config.typing.ms_per_char, config.typing.base_delay
    );
    if config.metadata.is_empty() {
        println!("      Metadata: (none)");
    } else {
        println!(
            "      Metadata: {}",
            serde_json::Value::Object(config.metadata.clone())
        );
    }
}
