//! Widget options and the resolved configuration.
//!
//! [`ChatOptions`] is what a caller hands in: every field is optional and the
//! serde shape matches the camelCase option objects used by n8n chat embeds, so
//! an existing options file loads unchanged.  [`ChatConfig`] is the immutable
//! result of merging those options over the defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};

/// Default maximum characters per bubble.
pub const DEFAULT_MAX_BUBBLE_LENGTH: usize = 200;

/// Default typing delay per character, in milliseconds.
pub const DEFAULT_MS_PER_CHAR: u64 = 20;

/// Default typing delay added to every chunk, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 300;

/// Default webhook timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_TARGET: &str = "#n8n-chat";
const DEFAULT_INPUT_KEY: &str = "chatInput";
const DEFAULT_SESSION_KEY: &str = "sessionId";
const DEFAULT_INPUT_PLACEHOLDER: &str = "Type your message...";
const DEFAULT_SEND_BUTTON_TEXT: &str = "Send";
const DEFAULT_ERROR_MESSAGE: &str = "Connection error. Please try again.";
const DEFAULT_FALLBACK_RESPONSE: &str = "Sorry, I couldn't process that.";
const DEFAULT_INITIAL_MESSAGES: &[&str] = &["Hey there! 👋", "How can I help you today?"];

//////////////////////////////////////////// Enums ////////////////////////////////////////////

/// HTTP method used to reach the webhook.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Payload encoded as query parameters.
    Get,
    /// Payload encoded as a JSON body.
    #[default]
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(Error::configuration(
                format!("unsupported method {s:?} (expected GET or POST)"),
                Some("webhookConfig.method".to_string()),
            )),
        }
    }
}

/// How the widget occupies its mount target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A floating window.
    Window,
    /// The whole target.
    #[default]
    Fullscreen,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Window => write!(f, "window"),
            Mode::Fullscreen => write!(f, "fullscreen"),
        }
    }
}

/////////////////////////////////////////// Options ///////////////////////////////////////////

/// Request settings for the webhook.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOptions {
    /// GET or POST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Extra request headers; these win over the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Colors and fonts handed to the view when it mounts.
///
/// Values are free-form strings (CSS colors, font stacks); views interpret
/// what they can and ignore the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Accent color for user bubbles and buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    /// Background for bot bubbles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_message_background: Option<String>,
    /// Background for user bubbles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message_background: Option<String>,
    /// Main background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Main text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Bubble border radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<String>,
}

/// User-facing strings, each optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nOptions {
    /// Placeholder for the input field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_placeholder: Option<String>,
    /// Label of the send button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_button_text: Option<String>,
    /// Shown when the webhook cannot be reached or rejects the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Shown when the reply carries no usable text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_response: Option<String>,
    /// Append the HTTP status to the error message for rejected requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_error_status: Option<bool>,
}

/// Typing-delay settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingOptions {
    /// Milliseconds per character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms_per_char: Option<u64>,
    /// Milliseconds added to every chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay: Option<u64>,
}

/// Caller-supplied options.  Only `webhook_url` is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    /// The webhook endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Request settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_config: Option<WebhookOptions>,
    /// Where the view mounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Window or fullscreen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Greeting bubbles shown on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_messages: Option<Vec<String>>,
    /// Payload field carrying the user message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_input_key: Option<String>,
    /// Payload field carrying the session id; also names the storage key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_session_key: Option<String>,
    /// Reuse and persist the session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_previous_session: Option<bool>,
    /// Extra fields merged into every payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Colors and fonts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    /// User-facing strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i18n: Option<I18nOptions>,
    /// Typing-delay settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_indicator: Option<TypingOptions>,
    /// Characters per bubble before a chunk is re-split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bubble_length: Option<usize>,
    /// Whether views animate new bubbles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_animations: Option<bool>,
}

impl ChatOptions {
    /// Options for the given webhook with everything else defaulted.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(webhook_url.into()),
            ..Self::default()
        }
    }

    /// Load options from a file; `.json` files are JSON, anything else YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(serde_yaml::from_str(&contents)?)
        }
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.webhook_config.get_or_insert_with(Default::default).method = Some(method);
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.webhook_config
            .get_or_insert_with(Default::default)
            .headers
            .get_or_insert_with(Default::default)
            .insert(name.into(), value.into());
        self
    }

    /// Sets the mount target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the greeting bubbles.
    pub fn with_initial_messages(mut self, messages: Vec<String>) -> Self {
        self.initial_messages = Some(messages);
        self
    }

    /// Sets whether the session id is reused and persisted.
    pub fn with_load_previous_session(mut self, enabled: bool) -> Self {
        self.load_previous_session = Some(enabled);
        self
    }

    /// Adds a metadata field to every payload.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Default::default)
            .insert(key.into(), value);
        self
    }

    /// Sets the typing delay.
    pub fn with_typing(mut self, ms_per_char: u64, base_delay: u64) -> Self {
        self.typing_indicator = Some(TypingOptions {
            ms_per_char: Some(ms_per_char),
            base_delay: Some(base_delay),
        });
        self
    }

    /// Sets the maximum bubble length.
    pub fn with_max_bubble_length(mut self, max: usize) -> Self {
        self.max_bubble_length = Some(max);
        self
    }

    /// Overlay `other` on top of `self`: every field `other` sets wins.
    ///
    /// Used to let command-line flags override an options file.
    pub fn overlay(self, other: ChatOptions) -> ChatOptions {
        ChatOptions {
            webhook_url: other.webhook_url.or(self.webhook_url),
            webhook_config: merge_webhook(self.webhook_config, other.webhook_config),
            target: other.target.or(self.target),
            mode: other.mode.or(self.mode),
            initial_messages: other.initial_messages.or(self.initial_messages),
            chat_input_key: other.chat_input_key.or(self.chat_input_key),
            chat_session_key: other.chat_session_key.or(self.chat_session_key),
            load_previous_session: other.load_previous_session.or(self.load_previous_session),
            metadata: other.metadata.or(self.metadata),
            theme: other.theme.or(self.theme),
            i18n: other.i18n.or(self.i18n),
            typing_indicator: other.typing_indicator.or(self.typing_indicator),
            max_bubble_length: other.max_bubble_length.or(self.max_bubble_length),
            enable_animations: other.enable_animations.or(self.enable_animations),
        }
    }
}

fn merge_webhook(
    base: Option<WebhookOptions>,
    over: Option<WebhookOptions>,
) -> Option<WebhookOptions> {
    match (base, over) {
        (Some(base), Some(over)) => Some(WebhookOptions {
            method: over.method.or(base.method),
            headers: over.headers.or(base.headers),
            timeout_secs: over.timeout_secs.or(base.timeout_secs),
        }),
        (base, over) => over.or(base),
    }
}

/////////////////////////////////////////// Config ////////////////////////////////////////////

/// Resolved user-facing strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct I18n {
    /// Placeholder for the input field.
    pub input_placeholder: String,
    /// Label of the send button.
    pub send_button_text: String,
    /// Shown when the webhook cannot be reached or rejects the request.
    pub error_message: String,
    /// Shown when the reply carries no usable text.
    pub fallback_response: String,
    /// Append the HTTP status to the error message for rejected requests.
    pub show_error_status: bool,
}

impl Default for I18n {
    fn default() -> Self {
        Self {
            input_placeholder: DEFAULT_INPUT_PLACEHOLDER.to_string(),
            send_button_text: DEFAULT_SEND_BUTTON_TEXT.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
            show_error_status: false,
        }
    }
}

impl I18n {
    /// The text of the error bubble for a request rejected with `status`.
    pub fn rejection_message(&self, status: u16) -> String {
        if self.show_error_status {
            format!("{} (HTTP {status})", self.error_message)
        } else {
            self.error_message.clone()
        }
    }
}

/// Typing-delay parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypingDelay {
    /// Milliseconds per character.
    pub ms_per_char: u64,
    /// Milliseconds added to every chunk.
    pub base_delay: u64,
}

impl Default for TypingDelay {
    fn default() -> Self {
        Self {
            ms_per_char: DEFAULT_MS_PER_CHAR,
            base_delay: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl TypingDelay {
    /// How long the typing placeholder stays up before `chunk` appears.
    pub fn for_chunk(&self, chunk: &str) -> Duration {
        let chars = crate::chunker::char_len(chunk) as u64;
        Duration::from_millis(
            chars
                .saturating_mul(self.ms_per_char)
                .saturating_add(self.base_delay),
        )
    }
}

/// The immutable configuration of one widget.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// The webhook endpoint.
    pub webhook_url: Url,
    /// GET or POST.
    pub method: HttpMethod,
    /// Caller headers, validated.
    pub headers: BTreeMap<String, String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Where the view mounts.
    pub target: String,
    /// Window or fullscreen.
    pub mode: Mode,
    /// Greeting bubbles shown on creation.
    pub initial_messages: Vec<String>,
    /// Payload field carrying the user message.
    pub chat_input_key: String,
    /// Payload field carrying the session id.
    pub chat_session_key: String,
    /// Reuse and persist the session id.
    pub load_previous_session: bool,
    /// Extra fields merged into every payload.
    pub metadata: Map<String, Value>,
    /// Colors and fonts.
    pub theme: Theme,
    /// User-facing strings.
    pub i18n: I18n,
    /// Typing-delay parameters.
    pub typing: TypingDelay,
    /// Characters per bubble before a chunk is re-split.
    pub max_bubble_length: usize,
    /// Whether views animate new bubbles.
    pub enable_animations: bool,
}

impl ChatConfig {
    /// The default configuration for a webhook.
    pub fn default_for(webhook_url: Url) -> Self {
        Self {
            webhook_url,
            method: HttpMethod::Post,
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            target: DEFAULT_TARGET.to_string(),
            mode: Mode::Fullscreen,
            initial_messages: DEFAULT_INITIAL_MESSAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chat_input_key: DEFAULT_INPUT_KEY.to_string(),
            chat_session_key: DEFAULT_SESSION_KEY.to_string(),
            load_previous_session: true,
            metadata: Map::new(),
            theme: Theme::default(),
            i18n: I18n::default(),
            typing: TypingDelay::default(),
            max_bubble_length: DEFAULT_MAX_BUBBLE_LENGTH,
            enable_animations: true,
        }
    }

    /// Merge `options` over the defaults, validating as we go.
    pub fn resolve(options: ChatOptions) -> Result<Self> {
        let url = options
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::configuration("webhookUrl is required", Some("webhookUrl".to_string()))
            })?;
        let webhook_url = Url::parse(url).map_err(|err| {
            Error::configuration(
                format!("invalid webhookUrl {url:?}: {err}"),
                Some("webhookUrl".to_string()),
            )
        })?;
        if !matches!(webhook_url.scheme(), "http" | "https") {
            return Err(Error::configuration(
                format!("webhookUrl must be http or https, got {}", webhook_url.scheme()),
                Some("webhookUrl".to_string()),
            ));
        }

        let mut config = Self::default_for(webhook_url);

        if let Some(webhook) = options.webhook_config {
            if let Some(method) = webhook.method {
                config.method = method;
            }
            if let Some(headers) = webhook.headers {
                for (name, value) in &headers {
                    validate_header(name, value)?;
                }
                config.headers = headers;
            }
            if let Some(secs) = webhook.timeout_secs {
                if secs == 0 {
                    return Err(Error::configuration(
                        "timeout must be at least one second",
                        Some("webhookConfig.timeoutSecs".to_string()),
                    ));
                }
                config.timeout = Duration::from_secs(secs);
            }
        }
        if let Some(target) = options.target {
            config.target = target;
        }
        if let Some(mode) = options.mode {
            config.mode = mode;
        }
        if let Some(messages) = options.initial_messages {
            config.initial_messages = messages;
        }
        if let Some(key) = options.chat_input_key {
            config.chat_input_key = non_empty_key(key, "chatInputKey")?;
        }
        if let Some(key) = options.chat_session_key {
            config.chat_session_key = non_empty_key(key, "chatSessionKey")?;
        }
        if let Some(load) = options.load_previous_session {
            config.load_previous_session = load;
        }
        if let Some(metadata) = options.metadata {
            config.metadata = metadata;
        }
        if let Some(theme) = options.theme {
            config.theme = theme;
        }
        if let Some(i18n) = options.i18n {
            let defaults = I18n::default();
            config.i18n = I18n {
                input_placeholder: i18n.input_placeholder.unwrap_or(defaults.input_placeholder),
                send_button_text: i18n.send_button_text.unwrap_or(defaults.send_button_text),
                error_message: i18n.error_message.unwrap_or(defaults.error_message),
                fallback_response: i18n.fallback_response.unwrap_or(defaults.fallback_response),
                show_error_status: i18n.show_error_status.unwrap_or(defaults.show_error_status),
            };
        }
        if let Some(typing) = options.typing_indicator {
            config.typing = TypingDelay {
                ms_per_char: typing.ms_per_char.unwrap_or(DEFAULT_MS_PER_CHAR),
                base_delay: typing.base_delay.unwrap_or(DEFAULT_BASE_DELAY_MS),
            };
        }
        if let Some(max) = options.max_bubble_length {
            if max == 0 {
                return Err(Error::configuration(
                    "maxBubbleLength must be positive",
                    Some("maxBubbleLength".to_string()),
                ));
            }
            config.max_bubble_length = max;
        }
        if let Some(animate) = options.enable_animations {
            config.enable_animations = animate;
        }
        Ok(config)
    }

    /// The storage key the session id lives under.
    pub fn storage_key(&self) -> String {
        format!("n8n-chat-session-{}", self.chat_session_key)
    }
}

impl TryFrom<ChatOptions> for ChatConfig {
    type Error = Error;

    fn try_from(options: ChatOptions) -> Result<Self> {
        Self::resolve(options)
    }
}

fn validate_header(name: &str, value: &str) -> Result<()> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
        Error::configuration(
            format!("invalid header name {name:?}"),
            Some("webhookConfig.headers".to_string()),
        )
    })?;
    HeaderValue::from_str(value).map_err(|_| {
        Error::configuration(
            format!("invalid value for header {name:?}"),
            Some("webhookConfig.headers".to_string()),
        )
    })?;
    Ok(())
}

fn non_empty_key(key: String, param: &str) -> Result<String> {
    if key.trim().is_empty() {
        Err(Error::configuration(
            format!("{param} must not be empty"),
            Some(param.to_string()),
        ))
    } else {
        Ok(key)
    }
}
