//! Paced presentation of bubbles.
//!
//! The [`Presenter`] owns the mounted view.  It shows a reply's chunks one at
//! a time, holding a typing placeholder up for a delay proportional to the
//! length of the chunk about to appear, and it plays the greeting schedule.
//! After [`Presenter::detach`] every operation is a no-op, so a reveal that is
//! still sleeping when the widget is destroyed finishes without drawing.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, sleep, sleep_until};

use crate::config::{ChatConfig, TypingDelay};
use crate::error::Result;
use crate::observability::{BUBBLES_RENDERED, REVEAL_CHUNKS, REVEAL_DELAY};
use crate::view::{BubbleId, ChatView, Layout, Side};

/// Delay before the first greeting.
pub const GREETING_INITIAL_DELAY: Duration = Duration::from_millis(300);

/// Delay between greetings.
pub const GREETING_INTERVAL: Duration = Duration::from_millis(700);

struct Mounted {
    view: Box<dyn ChatView>,
    detached: bool,
}

/// Drives a mounted [`ChatView`].
pub struct Presenter {
    mounted: Mutex<Mounted>,
    typing: TypingDelay,
}

impl Presenter {
    /// Mount `view` at the configured target.
    pub fn mount(mut view: Box<dyn ChatView>, config: &ChatConfig) -> Result<Self> {
        view.mount(&config.target, &Layout::from(config))?;
        tracing::debug!(mount_target = %config.target, mode = %config.mode, "view mounted");
        Ok(Self {
            mounted: Mutex::new(Mounted {
                view,
                detached: false,
            }),
            typing: config.typing,
        })
    }

    /// The typing-delay parameters.
    pub fn typing(&self) -> TypingDelay {
        self.typing
    }

    /// Show a message, optionally scrolling it into view.
    pub fn add_message(&self, side: Side, text: &str, scroll: bool) -> Option<BubbleId> {
        let mut mounted = self.mounted.lock();
        if mounted.detached {
            return None;
        }
        let id = mounted.view.append_message(side, text);
        if scroll {
            mounted.view.scroll_to_bottom();
        }
        BUBBLES_RENDERED.click();
        Some(id)
    }

    /// Show the typing placeholder.
    pub fn show_typing(&self, scroll: bool) -> Option<BubbleId> {
        let mut mounted = self.mounted.lock();
        if mounted.detached {
            return None;
        }
        let id = mounted.view.show_typing();
        if scroll {
            mounted.view.scroll_to_bottom();
        }
        Some(id)
    }

    /// Remove a bubble shown earlier.
    pub fn remove(&self, id: Option<BubbleId>) {
        let Some(id) = id else {
            return;
        };
        let mut mounted = self.mounted.lock();
        if !mounted.detached {
            mounted.view.remove(id);
        }
    }

    /// Remove every bubble.
    pub fn clear(&self) {
        let mut mounted = self.mounted.lock();
        if !mounted.detached {
            mounted.view.clear();
        }
    }

    /// Detach the view.  Idempotent.
    pub fn detach(&self) {
        let mut mounted = self.mounted.lock();
        if !mounted.detached {
            mounted.view.detach();
            mounted.detached = true;
        }
    }

    /// Whether the view has been detached.
    pub fn is_detached(&self) -> bool {
        self.mounted.lock().detached
    }

    /// Show `chunks` in order on `side`.
    ///
    /// The first chunk appears at once and is scrolled to.  Each later chunk
    /// is preceded by a typing placeholder that stays up for
    /// [`TypingDelay::for_chunk`] of that chunk.  The lock is never held
    /// across the sleep, so other sends and user input proceed meanwhile.
    pub async fn reveal(&self, chunks: &[String], side: Side) {
        REVEAL_CHUNKS.add(chunks.len() as f64);
        for (idx, chunk) in chunks.iter().enumerate() {
            if self.is_detached() {
                tracing::debug!(remaining = chunks.len() - idx, "view detached mid-reveal");
                return;
            }
            if idx > 0 {
                let placeholder = self.show_typing(false);
                let delay = self.typing.for_chunk(chunk);
                REVEAL_DELAY.add(delay.as_secs_f64());
                sleep(delay).await;
                self.remove(placeholder);
            }
            self.add_message(side, chunk, idx == 0);
        }
    }

    /// Show greetings on the bot side at 300 ms, then every 700 ms.
    pub async fn greet(&self, messages: &[String]) {
        let start = Instant::now();
        for (idx, message) in messages.iter().enumerate() {
            let offset = GREETING_INITIAL_DELAY + GREETING_INTERVAL * idx as u32;
            sleep_until(start + offset).await;
            if self.add_message(Side::Bot, message, true).is_none() {
                return;
            }
        }
    }
}
