use biometrics::{Collector, Counter, Moments};

pub(crate) static WEBHOOK_REQUESTS: Counter = Counter::new("hookchat.webhook.requests");
pub(crate) static WEBHOOK_REQUEST_ERRORS: Counter =
    Counter::new("hookchat.webhook.request_errors");
pub(crate) static WEBHOOK_REJECTIONS: Counter = Counter::new("hookchat.webhook.rejections");
pub(crate) static WEBHOOK_REQUEST_DURATION: Moments =
    Moments::new("hookchat.webhook.request_duration_seconds");

pub(crate) static BUBBLES_RENDERED: Counter = Counter::new("hookchat.presenter.bubbles_rendered");
pub(crate) static FALLBACK_REPLIES: Counter = Counter::new("hookchat.presenter.fallback_replies");
pub(crate) static REVEAL_DELAY: Moments = Moments::new("hookchat.presenter.reveal_delay_seconds");
pub(crate) static REVEAL_CHUNKS: Moments = Moments::new("hookchat.presenter.reveal_chunks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&WEBHOOK_REQUESTS);
    collector.register_counter(&WEBHOOK_REQUEST_ERRORS);
    collector.register_counter(&WEBHOOK_REJECTIONS);
    collector.register_moments(&WEBHOOK_REQUEST_DURATION);

    collector.register_counter(&BUBBLES_RENDERED);
    collector.register_counter(&FALLBACK_REPLIES);
    collector.register_moments(&REVEAL_DELAY);
    collector.register_moments(&REVEAL_CHUNKS);
}
