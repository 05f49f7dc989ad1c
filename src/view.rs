//! The rendering surface.
//!
//! The widget never draws anything itself.  It drives a [`ChatView`], which
//! may be a terminal, a GUI toolkit, or the in-memory [`MemoryView`] used by
//! embedding hosts and tests.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::{ChatConfig, Mode, Theme};
use crate::error::{Error, Result};

/// Which side of the conversation a bubble belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The webhook's side, drawn on the left.
    Bot,
    /// The person typing, drawn on the right.
    User,
}

impl Side {
    /// Where the side is drawn.
    pub fn position(&self) -> &'static str {
        match self {
            Side::Bot => "left",
            Side::User => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.position())
    }
}

/// Identifies one rendered bubble so it can be removed later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u64);

/// Everything a view needs to know when it mounts.
#[derive(Clone, Debug)]
pub struct Layout {
    /// Window or fullscreen.
    pub mode: Mode,
    /// Colors and fonts.
    pub theme: Theme,
    /// Placeholder for the input field.
    pub input_placeholder: String,
    /// Label of the send button.
    pub send_button_text: String,
    /// Whether new bubbles animate in.
    pub enable_animations: bool,
}

impl From<&ChatConfig> for Layout {
    fn from(config: &ChatConfig) -> Self {
        Self {
            mode: config.mode,
            theme: config.theme.clone(),
            input_placeholder: config.i18n.input_placeholder.clone(),
            send_button_text: config.i18n.send_button_text.clone(),
            enable_animations: config.enable_animations,
        }
    }
}

/// A surface that shows chat bubbles.
///
/// Calls arrive from one widget, serialized by the widget's lock; a view does
/// not need interior synchronization of its own.
pub trait ChatView: Send {
    /// Attach to `target`.  A target the view cannot find is an error.
    fn mount(&mut self, target: &str, layout: &Layout) -> Result<()>;

    /// Show a message bubble.
    fn append_message(&mut self, side: Side, text: &str) -> BubbleId;

    /// Show the bot-side "typing" placeholder.
    fn show_typing(&mut self) -> BubbleId;

    /// Remove a bubble.  Unknown ids are ignored.
    fn remove(&mut self, id: BubbleId);

    /// Bring the newest bubble into view.
    fn scroll_to_bottom(&mut self);

    /// Remove every bubble.
    fn clear(&mut self);

    /// Tear the widget down.
    fn detach(&mut self);
}

/// What a [`MemoryView`] holds for one bubble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BubbleKind {
    /// A message.
    Message(String),
    /// The typing placeholder.
    Typing,
}

/// One bubble recorded by a [`MemoryView`].
#[derive(Clone, Debug)]
pub struct Bubble {
    /// Its id.
    pub id: BubbleId,
    /// Its side.
    pub side: Side,
    /// Message or placeholder.
    pub kind: BubbleKind,
    /// Whether it was drawn with an entrance animation.
    pub animated: bool,
    /// When it appeared.
    pub shown_at: Instant,
}

#[derive(Debug, Default)]
struct MemoryState {
    targets: Vec<String>,
    mounted: Option<String>,
    layout: Option<Layout>,
    bubbles: Vec<Bubble>,
    typing_shown: usize,
    scrolls: usize,
    detached: bool,
    next_id: u64,
}

/// A view that keeps its bubbles in memory.
///
/// Clones share state, so a host can hand one clone to the widget and read
/// the conversation through another.
#[derive(Clone, Debug, Default)]
pub struct MemoryView {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryView {
    /// A view that mounts at any of `targets`.
    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MemoryState {
            targets: targets.into_iter().map(Into::into).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A view that mounts at the default `#n8n-chat` target.
    pub fn new() -> Self {
        Self::with_targets(["#n8n-chat"])
    }

    /// The messages currently shown, oldest first, without placeholders.
    pub fn messages(&self) -> Vec<(Side, String)> {
        self.state
            .lock()
            .bubbles
            .iter()
            .filter_map(|b| match &b.kind {
                BubbleKind::Message(text) => Some((b.side, text.clone())),
                BubbleKind::Typing => None,
            })
            .collect()
    }

    /// Every bubble currently shown, placeholders included.
    pub fn bubbles(&self) -> Vec<Bubble> {
        self.state.lock().bubbles.clone()
    }

    /// Whether a typing placeholder is showing right now.
    pub fn is_typing(&self) -> bool {
        self.state
            .lock()
            .bubbles
            .iter()
            .any(|b| b.kind == BubbleKind::Typing)
    }

    /// How many typing placeholders were ever shown.
    pub fn typing_shown(&self) -> usize {
        self.state.lock().typing_shown
    }

    /// How many times the view was scrolled.
    pub fn scrolls(&self) -> usize {
        self.state.lock().scrolls
    }

    /// The target the view is mounted at.
    pub fn mounted_at(&self) -> Option<String> {
        self.state.lock().mounted.clone()
    }

    /// The layout passed at mount time.
    pub fn layout(&self) -> Option<Layout> {
        self.state.lock().layout.clone()
    }

    /// Whether the view has been detached.
    pub fn is_detached(&self) -> bool {
        self.state.lock().detached
    }

    fn push(&self, side: Side, kind: BubbleKind) -> BubbleId {
        let mut state = self.state.lock();
        let id = BubbleId(state.next_id);
        state.next_id += 1;
        let animated = state
            .layout
            .as_ref()
            .map(|l| l.enable_animations)
            .unwrap_or(false);
        state.bubbles.push(Bubble {
            id,
            side,
            kind,
            animated,
            shown_at: Instant::now(),
        });
        id
    }
}

impl ChatView for MemoryView {
    fn mount(&mut self, target: &str, layout: &Layout) -> Result<()> {
        let mut state = self.state.lock();
        if !state.targets.iter().any(|t| t == target) {
            return Err(Error::mount("target element not found", target));
        }
        state.mounted = Some(target.to_string());
        state.layout = Some(layout.clone());
        Ok(())
    }

    fn append_message(&mut self, side: Side, text: &str) -> BubbleId {
        self.push(side, BubbleKind::Message(text.to_string()))
    }

    fn show_typing(&mut self) -> BubbleId {
        self.state.lock().typing_shown += 1;
        self.push(Side::Bot, BubbleKind::Typing)
    }

    fn remove(&mut self, id: BubbleId) {
        self.state.lock().bubbles.retain(|b| b.id != id);
    }

    fn scroll_to_bottom(&mut self) {
        self.state.lock().scrolls += 1;
    }

    fn clear(&mut self) {
        self.state.lock().bubbles.clear();
    }

    fn detach(&mut self) {
        let mut state = self.state.lock();
        state.detached = true;
        state.mounted = None;
        state.bubbles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatOptions;

    fn layout() -> Layout {
        let config = ChatConfig::resolve(ChatOptions::new("https://x/y")).unwrap();
        Layout::from(&config)
    }

    #[test]
    fn unknown_target_fails_to_mount() {
        let mut view = MemoryView::new();
        let err = view.mount("#elsewhere", &layout()).unwrap_err();
        assert!(err.is_mount());
        assert_eq!(view.mounted_at(), None);
    }

    #[test]
    fn records_messages_in_order() {
        let mut view = MemoryView::new();
        view.mount("#n8n-chat", &layout()).unwrap();
        view.append_message(Side::User, "hello");
        let typing = view.show_typing();
        assert!(view.is_typing());
        view.remove(typing);
        view.append_message(Side::Bot, "hi");
        assert!(!view.is_typing());
        assert_eq!(view.typing_shown(), 1);
        assert_eq!(
            view.messages(),
            vec![
                (Side::User, "hello".to_string()),
                (Side::Bot, "hi".to_string())
            ]
        );
        assert!(view.bubbles().iter().all(|b| b.animated));
    }

    #[test]
    fn clones_share_state() {
        let view = MemoryView::new();
        let mut handle = view.clone();
        handle.append_message(Side::Bot, "shared");
        assert_eq!(view.messages().len(), 1);
        handle.clear();
        assert!(view.messages().is_empty());
    }

    #[test]
    fn detach_empties_the_view() {
        let mut view = MemoryView::new();
        view.mount("#n8n-chat", &layout()).unwrap();
        view.append_message(Side::Bot, "bye");
        view.detach();
        assert!(view.is_detached());
        assert!(view.messages().is_empty());
    }

    #[test]
    fn sides_map_to_positions() {
        assert_eq!(Side::Bot.to_string(), "left");
        assert_eq!(Side::User.to_string(), "right");
    }
}
