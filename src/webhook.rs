//! The webhook exchange.
//!
//! One user message becomes one HTTP request carrying the session id, the
//! message and any configured metadata.  The reply body is parsed
//! best-effort and the bot's text is pulled out of it.

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Response};
use serde_json::{Map, Value};
use url::Url;

use crate::config::{ChatConfig, HttpMethod};
use crate::error::{Error, Result};
use crate::observability::{
    WEBHOOK_REJECTIONS, WEBHOOK_REQUEST_DURATION, WEBHOOK_REQUEST_ERRORS, WEBHOOK_REQUESTS,
};

/// The `action` every payload carries.
pub const SEND_MESSAGE_ACTION: &str = "sendMessage";

/// Reply fields consulted in order.
pub const REPLY_FIELDS: [&str; 3] = ["output", "text", "message"];

/// Longest slice of an error body kept in a status error.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A parsed webhook response with a success status.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookReply {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body: JSON when it parses, the raw text otherwise, `null` when empty.
    pub body: Value,
}

impl WebhookReply {
    /// The bot's text, or `fallback` when the body carries none.
    pub fn text(&self, fallback: &str) -> String {
        extract_reply_text(&self.body, fallback)
    }

    /// The bot's text, if the body carries any.
    pub fn reply_text(&self) -> Option<String> {
        find_reply_text(&self.body)
    }
}

/// Client for one widget's webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: ReqwestClient,
    url: Url,
    method: HttpMethod,
    headers: HeaderMap,
    timeout: Duration,
    input_key: String,
    session_key: String,
    metadata: Map<String, Value>,
}

impl WebhookClient {
    /// Create a client from a resolved configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            url: config.webhook_url.clone(),
            method: config.method,
            headers: request_headers(config)?,
            timeout: config.timeout,
            input_key: config.chat_input_key.clone(),
            session_key: config.chat_session_key.clone(),
            metadata: config.metadata.clone(),
        })
    }

    /// The payload sent for `message`.  Metadata is merged last.
    pub fn payload(&self, session_id: &str, message: &str) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "action".to_string(),
            Value::String(SEND_MESSAGE_ACTION.to_string()),
        );
        payload.insert(
            self.session_key.clone(),
            Value::String(session_id.to_string()),
        );
        payload.insert(self.input_key.clone(), Value::String(message.to_string()));
        for (key, value) in &self.metadata {
            payload.insert(key.clone(), value.clone());
        }
        payload
    }

    /// The webhook URL with `payload` appended as query parameters.
    pub fn query_url(&self, payload: &Map<String, Value>) -> Url {
        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in payload {
                pairs.append_pair(key, &query_value(value));
            }
        }
        url
    }

    /// Send `message` and parse the reply.
    ///
    /// Non-success statuses come back as [`Error::Status`] whatever the body
    /// holds; everything else that goes wrong is a transport error.
    pub async fn exchange(&self, session_id: &str, message: &str) -> Result<WebhookReply> {
        WEBHOOK_REQUESTS.click();
        let start = Instant::now();
        let result = self.exchange_inner(session_id, message).await;
        WEBHOOK_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Err(Error::Status { status_code, .. }) => {
                WEBHOOK_REJECTIONS.click();
                tracing::warn!(status = status_code, "webhook rejected the message");
            }
            Err(err) => {
                WEBHOOK_REQUEST_ERRORS.click();
                tracing::warn!(error = %err, "webhook exchange failed");
            }
            Ok(reply) => {
                tracing::debug!(status = reply.status, "webhook replied");
            }
        }
        result
    }

    async fn exchange_inner(&self, session_id: &str, message: &str) -> Result<WebhookReply> {
        let payload = self.payload(session_id, message);
        let request = match self.method {
            HttpMethod::Get => self
                .client
                .request(Method::GET, self.query_url(&payload))
                .headers(self.headers.clone()),
            HttpMethod::Post => self
                .client
                .request(Method::POST, self.url.clone())
                .headers(self.headers.clone())
                .body(serde_json::to_vec(&payload)?),
        };
        tracing::debug!(method = %self.method, url = %self.url, "sending webhook request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;

        let status = response.status();
        let (content_type, raw) = read_body(response).await?;
        if !status.is_success() {
            let excerpt: String = raw.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(Error::status(status.as_u16(), excerpt));
        }
        let body = parse_body(content_type.as_deref(), &raw)?;
        Ok(WebhookReply {
            status: status.as_u16(),
            body,
        })
    }
}

async fn read_body(response: Response) -> Result<(Option<String>, String)> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .map(String::from);
    let raw = response.text().await.map_err(|e| {
        if e.is_timeout() {
            Error::timeout(format!("Reading the reply timed out: {}", e), None)
        } else {
            Error::http_client(
                format!("Failed to read response: {}", e),
                Some(Box::new(e)),
            )
        }
    })?;
    Ok((content_type, raw))
}

/// Default headers, then the caller's on top.
fn request_headers(config: &ChatConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if config.method == HttpMethod::Post {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            Error::configuration(
                format!("invalid header name {name:?}"),
                Some("webhookConfig.headers".to_string()),
            )
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            Error::configuration(
                format!("invalid value for header {name}"),
                Some("webhookConfig.headers".to_string()),
            )
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Strings go into the query verbatim; everything else as JSON.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a response body.
///
/// An empty body is `null`.  A JSON content type must parse; any other body
/// is tried as JSON and kept as a string when it is not.
pub fn parse_body(content_type: Option<&str>, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(raw).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    } else {
        Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

/// Pull the bot's text out of a parsed body.
///
/// A string body is the text.  An object contributes its first present
/// `output`, `text` or `message` field, JSON-encoding values that are not
/// strings.  Null and empty strings count as absent.
pub fn extract_reply_text(body: &Value, fallback: &str) -> String {
    find_reply_text(body).unwrap_or_else(|| fallback.to_string())
}

/// Like [`extract_reply_text`], but `None` where the fallback would be used.
pub fn find_reply_text(body: &Value) -> Option<String> {
    match body {
        Value::String(text) => present(body).map(|_| text.clone()),
        Value::Object(map) => REPLY_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(present)),
        _ => None,
    }
}

fn present(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
