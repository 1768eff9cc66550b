//! REST document-store client
//!
//! Talks to the managed document API that fronts the cloud database. Every
//! document lives under `users/{userId}/{collection}/{id}`, with conversation
//! messages nested as `users/{userId}/conversations/{id}/messages/{msgId}`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{Document, RemoteStore};
use crate::error::{Error, Result};

/// `RemoteStore` implementation over the managed document API
#[derive(Clone)]
pub struct RestRemoteStore {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl RestRemoteStore {
    /// Create a client for the given API endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            auth_token: None,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Attach a bearer token sent with every request
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.endpoint.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    async fn get_documents(&self, url: String) -> Result<Vec<Document>> {
        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        Ok(response.json::<Vec<Document>>().await?)
    }

    async fn put_document(&self, url: String, doc: &Document) -> Result<()> {
        let mut request = self.client.put(&url).json(doc);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn list(&self, user_id: &str, collection: &str) -> Result<Vec<Document>> {
        self.get_documents(self.url(&["users", user_id, collection]))
            .await
    }

    async fn put(&self, user_id: &str, collection: &str, id: &str, doc: &Document) -> Result<()> {
        self.put_document(self.url(&["users", user_id, collection, id]), doc)
            .await
    }

    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Document>> {
        self.get_documents(self.url(&[
            "users",
            user_id,
            "conversations",
            conversation_id,
            "messages",
        ]))
        .await
    }

    async fn put_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        doc: &Document,
    ) -> Result<()> {
        self.put_document(
            self.url(&[
                "users",
                user_id,
                "conversations",
                conversation_id,
                "messages",
                message_id,
            ]),
            doc,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(Error::InvalidInput("endpoint must not be empty".into()));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "endpoint must include http:// or https://".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
    }

    #[test]
    fn test_normalize_endpoint_trims_trailing_slash() {
        let endpoint = normalize_endpoint("https://api.example.com/v1/".to_string()).unwrap();
        assert_eq!(endpoint, "https://api.example.com/v1");
    }

    #[test]
    fn test_url_layout() {
        let store = RestRemoteStore::new("https://api.example.com").unwrap();
        assert_eq!(
            store.url(&["users", "u1", "conversations", "c1", "messages", "m1"]),
            "https://api.example.com/users/u1/conversations/c1/messages/m1"
        );
    }

    #[test]
    fn test_parse_api_error_prefers_message() {
        let body = r#"{"error":"bad","message":"Document rejected"}"#;
        let parsed = parse_api_error(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(parsed, "Document rejected (422)");
    }

    #[test]
    fn test_parse_api_error_empty_body() {
        let parsed = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(parsed, "HTTP 500");
    }
}
