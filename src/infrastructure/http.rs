use crate::domain::money::Balance;
use crate::domain::ports::BalanceSource;
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct BalancePayload {
    balance: Decimal,
}

/// Wallet endpoints answer with either `{ "balance": .. }` or the same object
/// wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BalanceEnvelope {
    Nested { data: BalancePayload },
    Flat(BalancePayload),
}

impl From<BalanceEnvelope> for Balance {
    fn from(envelope: BalanceEnvelope) -> Self {
        match envelope {
            BalanceEnvelope::Nested { data } | BalanceEnvelope::Flat(data) => {
                Balance::new(data.balance)
            }
        }
    }
}

/// Parses a balance response body.
pub fn parse_balance(body: &[u8]) -> Result<Balance> {
    let envelope: BalanceEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.into())
}

/// Reads the wallet balance from a REST endpoint.
///
/// `Clone` shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpBalanceSource {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpBalanceSource {
    /// Builds a source for `endpoint`, sending `token` as a bearer token when
    /// present. Each request is bounded by `timeout`.
    pub fn new(endpoint: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        match endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ReconcileError::InvalidConfig(format!(
                    "balance endpoint must be http or https, got '{other}'"
                )));
            }
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BalanceSource for HttpBalanceSource {
    async fn fetch_balance(&self) -> Result<Balance> {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.bytes().await?;
        parse_balance(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_flat_and_nested() {
        assert_eq!(
            parse_balance(br#"{"balance": 150.5}"#).unwrap(),
            Balance::new(dec!(150.5))
        );
        assert_eq!(
            parse_balance(br#"{"data": {"balance": "42.10", "currency": "EGP"}}"#).unwrap(),
            Balance::new(dec!(42.10))
        );
    }

    #[test]
    fn test_parse_rejects_missing_balance() {
        assert!(matches!(
            parse_balance(br#"{"data": {"total": 1}}"#),
            Err(ReconcileError::Json(_))
        ));
        assert!(parse_balance(b"not json").is_err());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let endpoint = Url::parse("ftp://wallet.example.com/balance").unwrap();
        assert!(matches!(
            HttpBalanceSource::new(endpoint, None, Duration::from_secs(1)),
            Err(ReconcileError::InvalidConfig(_))
        ));
    }

    /// Serves one canned HTTP response and returns the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        let url = Url::parse(&format!("http://{addr}/api/wallet/balance")).unwrap();
        (url, handle)
    }

    #[tokio::test]
    async fn test_fetch_balance_over_http() {
        let (url, server) = serve_once("200 OK", r#"{"data":{"balance":250}}"#).await;
        let source =
            HttpBalanceSource::new(url, Some("secret".to_string()), Duration::from_secs(5)).unwrap();

        let balance = source.fetch_balance().await.unwrap();
        assert_eq!(balance, Balance::new(dec!(250)));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/wallet/balance"));
        assert!(request.contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_fetch_balance_error_status() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"error":"down"}"#).await;
        let source = HttpBalanceSource::new(url, None, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            source.fetch_balance().await,
            Err(ReconcileError::Http(_))
        ));
        server.await.unwrap();
    }
}
