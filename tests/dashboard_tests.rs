use jetview::broker::BrokerGateway;
use jetview::config::HubConfig;
use jetview::dashboard::router;
use jetview::AdminEngine;
use serde_json::{json, Value};
use tokio::net::TcpListener;

mod helpers;
use helpers::{stream, test_broker_config, MockBroker};

/// Serves the admin router on an ephemeral port and returns its base url.
async fn serve(gateway: BrokerGateway) -> String {
    let engine = AdminEngine::new(gateway, HubConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(engine)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn get(url: &str) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

#[cfg(test)]
mod dashboard_tests {
    use super::*;

    #[tokio::test]
    async fn test_streams_with_and_without_trailing_slash() {
        let (gateway, _) = MockBroker::new()
            .with_streams(vec![stream("ORDERS", 10, 100, 2)])
            .into_gateway();
        let base = serve(gateway).await;

        for path in ["/api/streams", "/api/streams/"] {
            let body = get(&format!("{}{}", base, path)).await;
            assert_eq!(body["error"], Value::Null);
            assert_eq!(body["response"][0]["name"], "ORDERS");
            assert_eq!(body["response"][0]["messages"], 10);
        }
    }

    #[tokio::test]
    async fn test_missing_parameter_reported_in_envelope() {
        let (gateway, calls) = MockBroker::new().into_gateway();
        let base = serve(gateway).await;

        let body = get(&format!("{}/api/stream_info", base)).await;
        assert_eq!(body, json!({"error": "stream in query not specified", "response": null}));

        let body = get(&format!("{}/api/read?ack=1", base)).await;
        assert_eq!(body["error"], "subject in query not specified");

        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_broker_reported_in_envelope() {
        let base = serve(BrokerGateway::inactive(&test_broker_config())).await;

        let body = get(&format!("{}/api/streams", base)).await;
        assert_eq!(body, json!({"error": "connect not active", "response": null}));

        let health = get(&format!("{}/api/health", base)).await;
        assert_eq!(health["active"], false);
        assert_eq!(health["clients"], 0);
    }

    #[tokio::test]
    async fn test_read_acks_when_requested() {
        let (gateway, calls) = MockBroker::new()
            .with_message("orders.new", b"hello", Default::default())
            .into_gateway();
        let base = serve(gateway).await;

        let body = get(&format!("{}/api/read?subject=orders.new&ack=true", base)).await;

        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["response"]["data"], "aGVsbG8=");
        assert!(calls.lock().iter().any(|c| c == "ack"));
    }

    #[tokio::test]
    async fn test_send_accepts_form_body() {
        let mock = MockBroker::new();
        let published = mock.published();
        let (gateway, _) = mock.into_gateway();
        let base = serve(gateway).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/send/", base))
            .form(&[("subject", "orders.new"), ("data", "aGVsbG8=")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body, json!({"error": null, "response": null}));
        assert_eq!(&published.lock()[0].1[..], b"hello");
    }

    #[tokio::test]
    async fn test_post_read_takes_ack_from_query_and_subject_from_body() {
        let (gateway, calls) = MockBroker::new()
            .with_message("orders.new", b"hello", Default::default())
            .into_gateway();
        let base = serve(gateway).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/read/?ack=1", base))
            .form(&[("subject", "orders.new")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["error"], Value::Null);
        assert_eq!(*calls.lock(), vec!["pull_subscribe:orders.new", "fetch", "ack", "unsubscribe"]);
    }

    #[tokio::test]
    async fn test_post_without_body_reads_query() {
        let (gateway, calls) = MockBroker::new()
            .with_message("orders.new", b"hello", Default::default())
            .into_gateway();
        let base = serve(gateway).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/read/?subject=orders.new&ack=1", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["response"]["subject"], "orders.new");
        assert!(calls.lock().iter().any(|c| c == "ack"));
    }

    #[tokio::test]
    async fn test_post_body_ack_is_ignored() {
        let (gateway, calls) = MockBroker::new()
            .with_message("orders.new", b"hello", Default::default())
            .into_gateway();
        let base = serve(gateway).await;

        reqwest::Client::new()
            .post(format!("{}/api/read", base))
            .form(&[("subject", "orders.new"), ("ack", "1")])
            .send()
            .await
            .unwrap();

        assert!(calls.lock().iter().any(|c| c == "nak"));
        assert!(!calls.lock().iter().any(|c| c == "ack"));
    }

    #[tokio::test]
    async fn test_send_accepts_multipart_body() {
        let mock = MockBroker::new();
        let published = mock.published();
        let (gateway, _) = mock.into_gateway();
        let base = serve(gateway).await;

        let form = reqwest::multipart::Form::new()
            .text("subject", "orders.new")
            .text("data", "aGVsbG8=");
        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/send/", base))
            .multipart(form)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body, json!({"error": null, "response": null}));
        let published = published.lock();
        assert_eq!(published[0].0, "orders.new");
        assert_eq!(&published[0].1[..], b"hello");
    }
}
