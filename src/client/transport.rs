use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Sends one API request and unwraps the `{success, data|message}` envelope.
///
/// `path` is relative to the `/api` prefix and may carry a query string.
/// Successful responses yield `data`, or `Value::Null` for message-only
/// envelopes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        (**self).request(method, path, body).await
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl HttpTransport {
    pub fn new(server: &str, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            base_url: Arc::from(server.trim_end_matches('/')),
            token: token.map(Arc::from),
        }
    }

    fn send_blocking(
        agent: &ureq::Agent,
        url: &str,
        method: Method,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let mut request = agent
            .request(method.as_str(), url)
            .set("accept", "application/json");
        if let Some(token) = token {
            request = request.set("authorization", &format!("Bearer {token}"));
        }
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        match result {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|err| ClientError::Transport(err.to_string()))?;
                unwrap_envelope(&text, 200)
            }
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().unwrap_or_default();
                match unwrap_envelope(&text, status) {
                    Err(err) => Err(err),
                    Ok(_) => Err(ClientError::Api {
                        status,
                        message: format!("request failed with status {status}"),
                    }),
                }
            }
            Err(err) => Err(ClientError::Transport(err.to_string())),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let agent = self.agent.clone();
        let url = format!("{}/api{}", self.base_url, path);
        let token = self.token.clone();
        tokio::task::spawn_blocking(move || {
            Self::send_blocking(&agent, &url, method, token.as_deref(), body)
        })
        .await?
    }
}

fn unwrap_envelope(text: &str, status: u16) -> Result<Value, ClientError> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) if status < 400 => return Err(err.into()),
        Err(_) => {
            return Err(ClientError::Api {
                status,
                message: format!("request failed with status {status}"),
            })
        }
    };
    if envelope.success && status < 400 {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }
    Err(ClientError::Api {
        status,
        message: envelope
            .message
            .unwrap_or_else(|| format!("request failed with status {status}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_data() {
        let value = unwrap_envelope(r#"{"success":true,"data":[1,2]}"#, 200).expect("data");
        assert_eq!(value, serde_json::json!([1, 2]));
    }

    #[test]
    fn message_envelope_yields_null() {
        let value =
            unwrap_envelope(r#"{"success":true,"message":"Goal deleted"}"#, 200).expect("null");
        assert!(value.is_null());
    }

    #[test]
    fn error_envelope_surfaces_message_and_status() {
        let err = unwrap_envelope(r#"{"success":false,"message":"task cannot be empty"}"#, 400)
            .expect_err("error");
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "task cannot be empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_error_body_still_reports_status() {
        let err = unwrap_envelope("Method Not Allowed", 405).expect_err("error");
        assert_eq!(err.to_string(), "request failed with status 405");
    }
}
