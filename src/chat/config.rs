//! Command-line arguments for the chat REPL.
//!
//! Flags are parsed with `arrrg`.  An options file, when given, is loaded
//! first and the flags are laid over it.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::config::{ChatOptions, HttpMethod};
use crate::error::{Error, Result};

/// Mount target the REPL uses unless told otherwise.
pub const TERMINAL_TARGET: &str = "stdout";

/// Command-line arguments for the hookchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// The webhook to talk to.
    #[arrrg(optional, "Webhook URL to send messages to", "URL")]
    pub webhook_url: Option<String>,

    /// JSON or YAML options file.
    #[arrrg(optional, "Options file (.json, or YAML otherwise)", "FILE")]
    pub options: Option<String>,

    /// Where the terminal view mounts.
    #[arrrg(optional, "Mount target: stdout or stderr (default: stdout)", "TARGET")]
    pub target: Option<String>,

    /// HTTP method for the webhook.
    #[arrrg(optional, "HTTP method: GET or POST (default: POST)", "METHOD")]
    pub method: Option<String>,

    /// Longest bubble before a reply is re-split.
    #[arrrg(optional, "Longest bubble in characters (default: 200)", "CHARS")]
    pub max_bubble_length: Option<u32>,

    /// Ignore any stored session id.
    #[arrrg(flag, "Start a new session instead of resuming the stored one")]
    pub fresh_session: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl ChatArgs {
    /// Whether the terminal view should use color.
    pub fn use_color(&self) -> bool {
        !self.no_color
    }

    /// Path of the options file, if one was given.
    pub fn options_path(&self) -> Option<PathBuf> {
        self.options.as_ref().map(PathBuf::from)
    }

    /// Build widget options: the options file, then the flags on top.
    ///
    /// The target defaults to [`TERMINAL_TARGET`] rather than the widget's
    /// own default, which names a page element.
    pub fn to_options(&self) -> Result<ChatOptions> {
        let base = match self.options_path() {
            Some(path) => ChatOptions::load(path)?,
            None => ChatOptions::default(),
        };
        let mut flags = ChatOptions {
            webhook_url: self.webhook_url.clone(),
            target: self.target.clone(),
            ..ChatOptions::default()
        };
        if let Some(method) = self.method.as_deref() {
            flags = flags.with_method(method.parse::<HttpMethod>()?);
        }
        if let Some(max) = self.max_bubble_length {
            flags = flags.with_max_bubble_length(max as usize);
        }
        if self.fresh_session {
            flags = flags.with_load_previous_session(false);
        }
        let mut options = base.overlay(flags);
        if options.target.is_none() {
            options.target = Some(TERMINAL_TARGET.to_string());
        }
        if options.webhook_url.is_none() {
            return Err(Error::configuration(
                "a webhook URL is required (--webhook-url or an options file)",
                Some("webhookUrl".to_string()),
            ));
        }
        Ok(options)
    }
}
