//! End-to-end tests of the widget against a mock webhook.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use hookchat::config::I18nOptions;
    use hookchat::{
        ChatOptions, ChatWidget, HttpMethod, MemorySessionStore, MemoryView, Result,
        SendOutcome, SessionStore, Side, TypingDelay,
    };

    const FIRST: &str = "Hi there, thanks for reaching out to us today.";
    const SECOND: &str = "How can I help you with your account this afternoon?";

    struct Shared(Arc<MemorySessionStore>);

    impl SessionStore for Shared {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
    }

    fn options(server: &MockServer) -> ChatOptions {
        ChatOptions::new(format!("{}/webhook/chat", server.uri()))
            .with_initial_messages(vec![])
            .with_typing(1, 5)
    }

    fn widget(options: ChatOptions, view: &MemoryView) -> ChatWidget {
        ChatWidget::create(
            options,
            Box::new(view.clone()),
            Box::new(MemorySessionStore::new()),
        )
        .unwrap()
    }

    fn bot(text: &str) -> (Side, String) {
        (Side::Bot, text.to_string())
    }

    fn user(text: &str) -> (Side, String) {
        (Side::User, text.to_string())
    }

    async fn only_request_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn post_sends_the_payload_and_reveals_the_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": format!("{FIRST}\n\n{SECOND}")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_value("n8n-chat-session-sessionId", "abc");
        let view = MemoryView::new();
        let widget = ChatWidget::create(
            options(&server).with_metadata("userId", json!("u-1")),
            Box::new(view.clone()),
            Box::new(store),
        )
        .unwrap();
        assert_eq!(widget.session_id(), "abc");

        let outcome = widget.send_message("Hello").await;
        assert_eq!(outcome.chunks(), [FIRST.to_string(), SECOND.to_string()]);
        assert_eq!(view.messages(), vec![user("Hello"), bot(FIRST), bot(SECOND)]);
        assert!(!view.is_typing());

        assert_eq!(
            only_request_body(&server).await,
            json!({
                "action": "sendMessage",
                "sessionId": "abc",
                "chatInput": "Hello",
                "userId": "u-1",
            })
        );
    }

    #[tokio::test]
    async fn second_chunk_waits_for_its_typing_delay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": format!("{FIRST}\n\n{SECOND}")})),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server).with_typing(2, 40), &view);
        widget.send_message("Hello").await;

        let bubbles = view.bubbles();
        assert_eq!(bubbles.len(), 3);
        let delay = TypingDelay {
            ms_per_char: 2,
            base_delay: 40,
        }
        .for_chunk(SECOND);
        assert!(bubbles[2].shown_at - bubbles[1].shown_at >= delay);
        // one placeholder while waiting on the webhook, one before the second chunk
        assert_eq!(view.typing_shown(), 2);
    }

    #[tokio::test]
    async fn short_paragraphs_share_a_bubble() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": "Hi there.\n\nHow can I help?"})),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        let outcome = widget.send_message("Hello").await;
        assert_eq!(outcome.chunks(), ["Hi there. How can I help?".to_string()]);
        assert_eq!(
            view.messages(),
            vec![user("Hello"), bot("Hi there. How can I help?")]
        );
    }

    #[tokio::test]
    async fn server_error_shows_one_error_bubble() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        let outcome = widget.send_message("Hello").await;
        assert!(matches!(outcome, SendOutcome::Rejected { status: 500 }));
        assert_eq!(
            view.messages(),
            vec![user("Hello"), bot("Connection error. Please try again.")]
        );
        assert!(!view.is_typing());
    }

    #[tokio::test]
    async fn error_status_can_be_shown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let mut options = options(&server);
        options.i18n = Some(I18nOptions {
            error_message: Some("Try later.".to_string()),
            show_error_status: Some(true),
            ..I18nOptions::default()
        });
        let widget = widget(options, &view);
        widget.send_message("Hello").await;
        assert_eq!(
            view.messages(),
            vec![user("Hello"), bot("Try later. (HTTP 503)")]
        );
    }

    #[tokio::test]
    async fn error_page_labelled_json_is_still_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_raw("<html><body>Bad Gateway</body></html>", "application/json"),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let mut options = options(&server);
        options.i18n = Some(I18nOptions {
            show_error_status: Some(true),
            ..I18nOptions::default()
        });
        let widget = widget(options, &view);
        let outcome = widget.send_message("Hello").await;
        assert!(matches!(outcome, SendOutcome::Rejected { status: 502 }));
        assert_eq!(
            view.messages(),
            vec![
                user("Hello"),
                bot("Connection error. Please try again. (HTTP 502)")
            ]
        );
    }

    #[tokio::test]
    async fn empty_object_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        let outcome = widget.send_message("Hello").await;
        assert!(outcome.is_replied());
        assert_eq!(
            view.messages(),
            vec![user("Hello"), bot("Sorry, I couldn't process that.")]
        );
    }

    #[tokio::test]
    async fn plain_text_body_is_the_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Just plain words, with no JSON around them at all."),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        widget.send_message("Hello").await;
        assert_eq!(
            view.messages(),
            vec![
                user("Hello"),
                bot("Just plain words, with no JSON around them at all.")
            ]
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        let outcome = widget.send_message("Hello").await;
        assert!(matches!(outcome, SendOutcome::Failed(_)));
        assert_eq!(
            view.messages(),
            vec![user("Hello"), bot("Connection error. Please try again.")]
        );
    }

    #[tokio::test]
    async fn get_sends_the_payload_as_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webhook/chat"))
            .and(query_param("action", "sendMessage"))
            .and(query_param("chatInput", "What's up?"))
            .and(query_param("count", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"text": "Nothing much, just answering webhooks."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(
            options(&server)
                .with_method(HttpMethod::Get)
                .with_metadata("count", json!(3)),
            &view,
        );
        widget.send_message("What's up?").await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.is_empty());
        let session = requests[0]
            .url
            .query_pairs()
            .find(|(key, _)| key == "sessionId")
            .map(|(_, value)| value.into_owned());
        assert_eq!(session, Some(widget.session_id()));
        assert_eq!(
            view.messages(),
            vec![
                user("What's up?"),
                bot("Nothing much, just answering webhooks.")
            ]
        );
    }

    #[tokio::test]
    async fn caller_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "secret"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!("Authenticated and ready to help you out.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(
            options(&server)
                .with_header("X-Api-Key", "secret")
                .with_header("Content-Type", "application/json; charset=utf-8"),
            &view,
        );
        let outcome = widget.send_message("Hello").await;
        assert_eq!(
            outcome.chunks(),
            ["Authenticated and ready to help you out.".to_string()]
        );
    }

    #[tokio::test]
    async fn unreachable_webhook_shows_the_error_message() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let view = MemoryView::new();
        let widget = widget(
            ChatOptions::new(format!("http://127.0.0.1:{port}/webhook"))
                .with_initial_messages(vec![]),
            &view,
        );
        let outcome = widget.send_message("Anyone there?").await;
        match outcome {
            SendOutcome::Failed(err) => assert!(err.is_transport()),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(
            view.messages(),
            vec![
                user("Anyone there?"),
                bot("Connection error. Please try again.")
            ]
        );
        assert!(!view.is_typing());
    }

    #[tokio::test]
    async fn submit_trims_and_settle_waits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Received your message loud and clear."})),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        assert!(widget.submit("  ping  "));
        assert!(!widget.submit("   "));
        widget.settle().await;

        assert_eq!(
            view.messages(),
            vec![user("ping"), bot("Received your message loud and clear.")]
        );
        assert_eq!(only_request_body(&server).await["chatInput"], json!("ping"));
    }

    #[tokio::test]
    async fn overlapping_sends_interleave() {
        const A1: &str = "The first reply opens with this long sentence.";
        const A2: &str = "The first reply closes with this long sentence.";
        const B1: &str = "The second reply opens with this long sentence.";
        const B2: &str = "The second reply closes with this long sentence.";

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"chatInput": "one"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"output": format!("{A1}\n\n{A2}")})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"chatInput": "two"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": format!("{B1}\n\n{B2}")}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        // each second chunk waits roughly 10 * 47 + 200 ms
        let view = MemoryView::new();
        let widget = widget(options(&server).with_typing(10, 200), &view);
        assert!(widget.submit("one"));
        assert!(widget.submit("two"));
        widget.settle().await;

        assert_eq!(
            view.messages(),
            vec![
                user("one"),
                user("two"),
                bot(A1),
                bot(B1),
                bot(A2),
                bot(B2)
            ]
        );
    }

    #[tokio::test]
    async fn session_survives_a_second_widget() {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::new());
        let first = ChatWidget::create(
            options(&server),
            Box::new(MemoryView::new()),
            Box::new(Shared(store.clone())),
        )
        .unwrap();
        let second = ChatWidget::create(
            options(&server),
            Box::new(MemoryView::new()),
            Box::new(Shared(store.clone())),
        )
        .unwrap();
        assert_eq!(first.session_id(), second.session_id());

        let fresh = ChatWidget::create(
            options(&server).with_load_previous_session(false),
            Box::new(MemoryView::new()),
            Box::new(Shared(store.clone())),
        )
        .unwrap();
        assert_ne!(fresh.session_id(), first.session_id());
    }

    #[tokio::test]
    async fn destroyed_widget_draws_nothing_more() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"output": "Too late to matter."})),
            )
            .mount(&server)
            .await;

        let view = MemoryView::new();
        let widget = widget(options(&server), &view);
        widget.destroy();
        let outcome = widget.send_message("Hello").await;
        assert!(matches!(outcome, SendOutcome::Destroyed));
        assert!(view.messages().is_empty());
    }
}
