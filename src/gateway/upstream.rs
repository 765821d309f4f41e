use super::*;
use serde::Deserialize;

/// Provider that delegates passage retrieval to a secondary HTTP endpoint
/// returning `{"text": string}` (typically another instance's `/gemini`
/// route).
pub struct UpstreamProvider {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl UpstreamProvider {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            url,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    text: String,
}

#[async_trait]
impl TextProvider for UpstreamProvider {
    async fn fetch_passage(&self) -> GatewayResult<String> {
        let response = tokio::time::timeout(self.timeout, self.client.get(&self.url).send())
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
            .map_err(|e| GatewayError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::ApiError(format!(
                "Upstream returned status: {}",
                response.status()
            )));
        }

        let parsed: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(e.to_string()))?;

        Ok(strip_markdown(&parsed.text))
    }

    fn name(&self) -> &str {
        "upstream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response on an ephemeral port.
    async fn one_shot_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetches_and_cleans_text() {
        let url = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 31\r\n\r\n{\"text\": \"# A **quick** brown\"}",
        )
        .await;

        let provider = UpstreamProvider::new(url, Duration::from_secs(2));
        let passage = provider.fetch_passage().await.unwrap();
        assert_eq!(passage, "A quick brown");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_api_error() {
        let url = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n",
        )
        .await;

        let provider = UpstreamProvider::new(url, Duration::from_secs(2));
        let err = provider.fetch_passage().await.unwrap_err();
        assert!(matches!(err, GatewayError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() {
        let url = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 18\r\n\r\n{\"words\": \"wrong\"}",
        )
        .await;

        let provider = UpstreamProvider::new(url, Duration::from_secs(2));
        let err = provider.fetch_passage().await.unwrap_err();
        assert!(matches!(err, GatewayError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_unresponsive_upstream_times_out() {
        // Accept the connection but never answer.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let provider =
            UpstreamProvider::new(format!("http://{}", addr), Duration::from_millis(200));
        let err = provider.fetch_passage().await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
    }
}
