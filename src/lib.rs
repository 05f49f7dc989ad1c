//! An embeddable chat widget that relays messages to an HTTP webhook.
//!
//! A [`ChatWidget`] mounts onto a [`ChatView`], sends what the user types to
//! a webhook under a session id, and shows the reply as a paced sequence of
//! bubbles produced by [`split_into_chunks`].

// Public modules
pub mod chat;
pub mod chunker;
pub mod config;
pub mod error;
pub mod presenter;
pub mod render;
pub mod session;
pub mod view;
pub mod webhook;
pub mod widget;

mod observability;

// Re-exports
pub use chunker::split_into_chunks;
pub use config::{ChatConfig, ChatOptions, HttpMethod, I18n, Mode, Theme, TypingDelay};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::TerminalView;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use view::{BubbleId, ChatView, Layout, MemoryView, Side};
pub use webhook::{WebhookClient, WebhookReply};
pub use widget::{ChatWidget, SendOutcome};
