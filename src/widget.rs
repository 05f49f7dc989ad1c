//! The chat widget.
//!
//! A [`ChatWidget`] is what construction hands back.  It owns the resolved
//! configuration, the session, the webhook client and the presenter, and it
//! runs one send flow per user message.  Sends are not serialized: two sends
//! in flight interleave their bubbles.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::task::TaskTracker;

use crate::chunker::split_into_chunks;
use crate::config::{ChatConfig, ChatOptions};
use crate::error::{Error, Result};
use crate::observability::FALLBACK_REPLIES;
use crate::presenter::Presenter;
use crate::session::{Session, SessionStore};
use crate::view::{ChatView, Side};
use crate::webhook::WebhookClient;

/// What one send put on screen.
#[derive(Clone, Debug)]
pub enum SendOutcome {
    /// The reply was revealed as these chunks.
    Replied {
        /// Chunks in presentation order.
        chunks: Vec<String>,
    },
    /// The webhook answered with a non-success status; an error bubble was shown.
    Rejected {
        /// The HTTP status.
        status: u16,
    },
    /// The webhook could not be reached; an error bubble was shown.
    Failed(Error),
    /// The widget was destroyed before the reply could be shown.
    Destroyed,
}

impl SendOutcome {
    /// True when the reply made it to the view.
    pub fn is_replied(&self) -> bool {
        matches!(self, SendOutcome::Replied { .. })
    }

    /// The chunks shown, if any.
    pub fn chunks(&self) -> &[String] {
        match self {
            SendOutcome::Replied { chunks } => chunks,
            _ => &[],
        }
    }
}

struct Inner {
    config: ChatConfig,
    client: WebhookClient,
    presenter: Presenter,
    session: Mutex<Session>,
    tasks: TaskTracker,
    settling: AsyncMutex<()>,
}

/// One mounted chat widget.
///
/// Cloning is cheap; clones drive the same widget.
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<Inner>,
}

impl ChatWidget {
    /// Resolve `options`, open the session, mount `view` and start the greetings.
    ///
    /// Must be called from within a tokio runtime.  Configuration problems
    /// and an unmountable target are returned here; nothing after
    /// construction returns transport errors as `Err`.
    pub fn create(
        options: ChatOptions,
        view: Box<dyn ChatView>,
        store: Box<dyn SessionStore>,
    ) -> Result<Self> {
        let config = ChatConfig::resolve(options)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::configuration(
                "ChatWidget::create must be called within a tokio runtime",
                None,
            ));
        }
        let session = Session::open(&config, store)?;
        let client = WebhookClient::new(&config)?;
        let presenter = Presenter::mount(view, &config)?;
        tracing::debug!(
            url = %config.webhook_url,
            session_id = session.id(),
            "chat widget created"
        );
        let widget = Self {
            inner: Arc::new(Inner {
                config,
                client,
                presenter,
                session: Mutex::new(session),
                tasks: TaskTracker::new(),
                settling: AsyncMutex::new(()),
            }),
        };
        if !widget.inner.config.initial_messages.is_empty() {
            let inner = Arc::clone(&widget.inner);
            widget.inner.tasks.spawn(async move {
                inner.presenter.greet(&inner.config.initial_messages).await;
            });
        }
        Ok(widget)
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    /// Show `text` as a user bubble, send it and show the reply.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        self.inner.presenter.add_message(Side::User, text, true);
        self.inner.send_flow(text).await
    }

    /// Submit what the user typed.
    ///
    /// The input is trimmed and blank input is ignored.  The send runs on a
    /// tracked task; [`ChatWidget::settle`] waits for it.  Returns whether
    /// anything was sent.
    pub fn submit(&self, input: &str) -> bool {
        let text = input.trim();
        if text.is_empty() {
            return false;
        }
        self.inner.presenter.add_message(Side::User, text, true);
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        self.inner.tasks.spawn(async move {
            inner.send_flow(&text).await;
        });
        true
    }

    /// Show a bubble without sending anything.
    pub fn add_message(&self, text: &str, side: Side) {
        self.inner.presenter.add_message(side, text, true);
    }

    /// Remove every bubble.
    pub fn clear(&self) {
        self.inner.presenter.clear();
    }

    /// Detach the view.  Sends still in flight finish without drawing.
    pub fn destroy(&self) {
        self.inner.presenter.detach();
        tracing::debug!("chat widget destroyed");
    }

    /// Whether [`ChatWidget::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.presenter.is_detached()
    }

    /// The current session id.
    pub fn session_id(&self) -> String {
        self.inner.session.lock().id().to_string()
    }

    /// Start a new session and return its id.
    pub fn reset_session(&self) -> Result<String> {
        let mut session = self.inner.session.lock();
        match session.reset() {
            Ok(id) => Ok(id.to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "could not persist the new session id");
                Err(err)
            }
        }
    }

    /// Wait for the greetings and every submitted send to finish.
    ///
    /// Concurrent callers take turns, so one caller reopening the tracker
    /// never strands another mid-wait.
    pub async fn settle(&self) {
        let _turn = self.inner.settling.lock().await;
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }
}

impl Inner {
    async fn send_flow(&self, text: &str) -> SendOutcome {
        let session_id = self.session.lock().id().to_string();
        let placeholder = self.presenter.show_typing(true);
        let result = self.client.exchange(&session_id, text).await;
        self.presenter.remove(placeholder);
        if self.presenter.is_detached() {
            return SendOutcome::Destroyed;
        }
        let i18n = &self.config.i18n;
        let reply = match result {
            Ok(reply) => reply,
            Err(Error::Status { status_code, .. }) => {
                self.presenter
                    .add_message(Side::Bot, &i18n.rejection_message(status_code), true);
                return SendOutcome::Rejected {
                    status: status_code,
                };
            }
            Err(err) => {
                self.presenter.add_message(Side::Bot, &i18n.error_message, true);
                return SendOutcome::Failed(err);
            }
        };
        let text = match reply.reply_text() {
            Some(text) => text,
            None => {
                FALLBACK_REPLIES.click();
                i18n.fallback_response.clone()
            }
        };
        let chunks = split_into_chunks(&text, self.config.max_bubble_length);
        tracing::debug!(chunks = chunks.len(), "revealing reply");
        self.presenter.reveal(&chunks, Side::Bot).await;
        if self.presenter.is_detached() {
            return SendOutcome::Destroyed;
        }
        SendOutcome::Replied { chunks }
    }
}
