use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(3);

/// Asks a flag's decision logic API whether a pilot is enrolled.
#[derive(Debug, Clone)]
pub struct DecisionClient {
    http: reqwest::Client,
}

impl DecisionClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Issues `GET <url>?feature=<flag name>&id=<external id>`.
    ///
    /// Any 2xx means enrolled. Every other status, and every network failure,
    /// is an error rather than a silent "not enrolled".
    pub async fn is_enrolled(&self, url: &str, feature: &str, external_id: &str) -> Result<bool> {
        let response = self
            .http
            .get(url)
            .query(&[("feature", feature), ("id", external_id)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }

        Err(Error::Transport(format!(
            "{url} answered {} for feature {feature}",
            status.as_u16()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Answers with a status picked by the `id` parameter.
    async fn decide(State(seen): State<Seen>, Query(params): Query<HashMap<String, String>>) -> StatusCode {
        let id = params.get("id").cloned().unwrap_or_default();
        seen.lock().unwrap().push(params);
        match id.as_str() {
            "ok" => StatusCode::OK,
            "accepted" => StatusCode::NO_CONTENT,
            "deny" => StatusCode::FORBIDDEN,
            "moved" => StatusCode::FOUND,
            "slow" => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    async fn start_delegate() -> (String, Seen) {
        let seen = Seen::default();
        let router = Router::new()
            .route("/decide", get(decide))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        (format!("http://{addr}/decide"), seen)
    }

    #[tokio::test]
    async fn test_success_statuses_enroll() {
        let (url, seen) = start_delegate().await;
        let client = DecisionClient::new(DEFAULT_DECISION_TIMEOUT).unwrap();

        assert!(client.is_enrolled(&url, "beta", "ok").await.unwrap());
        assert!(client.is_enrolled(&url, "beta", "accepted").await.unwrap());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["feature"], "beta");
        assert_eq!(seen[0]["id"], "ok");
        assert_eq!(seen[1]["id"], "accepted");
    }

    #[tokio::test]
    async fn test_other_statuses_are_transport_errors() {
        let (url, seen) = start_delegate().await;
        let client = DecisionClient::new(DEFAULT_DECISION_TIMEOUT).unwrap();

        for (id, code) in [("deny", "403"), ("moved", "302"), ("boom", "500")] {
            match client.is_enrolled(&url, "beta", id).await {
                Err(Error::Transport(msg)) => {
                    assert!(msg.contains(code), "{msg}");
                    assert!(msg.contains("beta"), "{msg}");
                }
                other => panic!("expected a transport error for {id}, got {other:?}"),
            }
        }

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_query_values_are_encoded() {
        let (url, seen) = start_delegate().await;
        let client = DecisionClient::new(DEFAULT_DECISION_TIMEOUT).unwrap();

        let result = client.is_enrolled(&url, "new checkout&v=2", "user 42").await;
        assert!(matches!(result, Err(Error::Transport(_))));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["feature"], "new checkout&v=2");
        assert_eq!(seen[0]["id"], "user 42");
        assert!(!seen[0].contains_key("v"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_error() {
        let (url, _seen) = start_delegate().await;
        let client = DecisionClient::new(Duration::from_millis(100)).unwrap();

        let result = client.is_enrolled(&url, "beta", "slow").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
