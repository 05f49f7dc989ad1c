//! Slash command parsing for the chat REPL.
//!
//! Input that starts with `/` controls the widget instead of being sent to
//! the webhook.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Remove every bubble.
    Clear,

    /// Show the current session id.
    Session,

    /// Start a new session.
    Reset,

    /// Show a bot bubble without sending anything.
    Say(String),

    /// Show a user bubble without sending anything.
    Note(String),

    /// Display help information.
    Help,

    /// Exit the REPL.
    Quit,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use hookchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/say hello").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "session" | "id" => ChatCommand::Session,
        "reset" | "new" => ChatCommand::Reset,
        "say" => match argument {
            Some(text) => ChatCommand::Say(text.to_string()),
            None => ChatCommand::Invalid("/say requires some text".to_string()),
        },
        "note" => match argument {
            Some(text) => ChatCommand::Note(text.to_string()),
            None => ChatCommand::Invalid("/note requires some text".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Remove every bubble
  /session               Show the current session id
  /reset                 Start a new session
  /say <text>            Show a bot bubble without sending
  /note <text>           Show a user bubble without sending
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
