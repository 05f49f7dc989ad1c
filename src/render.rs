//! Terminal rendering.
//!
//! [`TerminalView`] draws bubbles as lines of text: bot bubbles on the left,
//! user bubbles right-aligned.  With color enabled the typing placeholder is
//! erased in place when it is removed, and theme colors given as `#rgb` or
//! `#rrggbb` are used for the bubble text.

use std::io::{self, Write};

use crate::error::{Error, Result};
use crate::view::{BubbleId, ChatView, Layout, Side};

/// ANSI escape code for dim text (used for the typing placeholder).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (default bot color).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for magenta text (default user color).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// Move the cursor up a line and erase it.
const ANSI_ERASE_PREVIOUS_LINE: &str = "\x1b[1A\x1b[2K\r";

/// Clear the screen and home the cursor.
const ANSI_CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Default width used to right-align user bubbles.
pub const DEFAULT_WIDTH: usize = 80;

const TYPING_DOTS: &str = "•••";

/// Parse a `#rgb` or `#rrggbb` color.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Some((r * 17, g * 17, b * 17))
        }
        6 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

fn truecolor(color: Option<&String>, fallback: &'static str) -> String {
    match color.and_then(|c| parse_hex_color(c)) {
        Some((r, g, b)) => format!("\x1b[38;2;{r};{g};{b}m"),
        None => fallback.to_string(),
    }
}

/// A [`ChatView`] that writes to a terminal.
///
/// Mount targets are `stdout` and `stderr`.  Entrance animations are not
/// drawn.
pub struct TerminalView {
    writer: Option<Box<dyn Write + Send>>,
    use_color: bool,
    width: usize,
    bot_color: String,
    user_color: String,
    next_id: u64,
    last_line: Option<BubbleId>,
    detached: bool,
}

impl TerminalView {
    /// Creates a new TerminalView with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new TerminalView with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            writer: None,
            use_color,
            width: DEFAULT_WIDTH,
            bot_color: ANSI_CYAN.to_string(),
            user_color: ANSI_MAGENTA.to_string(),
            next_id: 0,
            last_line: None,
            detached: false,
        }
    }

    /// Writes to `writer` regardless of the mount target.
    pub fn with_writer(writer: Box<dyn Write + Send>, use_color: bool) -> Self {
        Self {
            writer: Some(writer),
            ..Self::with_color(use_color)
        }
    }

    /// Sets the width user bubbles are aligned to.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(20);
        self
    }

    fn next_id(&mut self) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;
        id
    }

    fn emit(&mut self, text: &str) {
        if self.detached {
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.write_all(text.as_bytes());
            let _ = writer.flush();
        }
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn format_bubble(&self, side: Side, text: &str) -> String {
        let mut out = String::new();
        match side {
            Side::Bot => {
                for (idx, line) in text.lines().enumerate() {
                    let prefix = if idx == 0 { "● " } else { "  " };
                    out.push_str(&self.styled(&self.bot_color, &format!("{prefix}{line}")));
                    out.push('\n');
                }
            }
            Side::User => {
                for line in text.lines() {
                    let len = line.chars().count();
                    let pad = self.width.saturating_sub(len);
                    out.push_str(&" ".repeat(pad));
                    out.push_str(&self.styled(&self.user_color, line));
                    out.push('\n');
                }
            }
        }
        if out.is_empty() {
            out.push('\n');
        }
        out
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for TerminalView {
    fn mount(&mut self, target: &str, layout: &Layout) -> Result<()> {
        if self.writer.is_none() {
            self.writer = match target {
                "stdout" => Some(Box::new(io::stdout())),
                "stderr" => Some(Box::new(io::stderr())),
                _ => {
                    return Err(Error::mount(
                        "terminal views mount at stdout or stderr",
                        target,
                    ));
                }
            };
        }
        let theme = &layout.theme;
        self.user_color = truecolor(
            theme
                .user_message_background
                .as_ref()
                .or(theme.primary_color.as_ref()),
            ANSI_MAGENTA,
        );
        self.bot_color = truecolor(theme.bot_message_background.as_ref(), ANSI_CYAN);
        let hint = format!(
            "{} ({} with Enter, /help for commands)\n",
            layout.input_placeholder, layout.send_button_text
        );
        let hint = self.styled(ANSI_DIM, &hint);
        self.emit(&hint);
        Ok(())
    }

    fn append_message(&mut self, side: Side, text: &str) -> BubbleId {
        let id = self.next_id();
        let bubble = self.format_bubble(side, text);
        self.emit(&bubble);
        self.last_line = None;
        id
    }

    fn show_typing(&mut self) -> BubbleId {
        let id = self.next_id();
        if self.use_color {
            let line = format!("{ANSI_DIM}  {TYPING_DOTS}{ANSI_RESET}\n");
            self.emit(&line);
            self.last_line = Some(id);
        }
        id
    }

    fn remove(&mut self, id: BubbleId) {
        if self.last_line == Some(id) {
            self.emit(ANSI_ERASE_PREVIOUS_LINE);
            self.last_line = None;
        }
    }

    fn scroll_to_bottom(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    fn clear(&mut self) {
        if self.use_color {
            self.emit(ANSI_CLEAR_SCREEN);
        } else {
            self.emit("----\n");
        }
        self.last_line = None;
    }

    fn detach(&mut self) {
        if self.use_color {
            self.emit(ANSI_RESET);
        }
        self.scroll_to_bottom();
        self.detached = true;
        self.writer = None;
    }
}
