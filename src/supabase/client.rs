// SPDX-License-Identifier: MPL-2.0

use crate::config::{BackendConfig, MESSAGES_TABLE, USERS_TABLE};
use crate::supabase::types::{Message, NewMessage, NewUser, User};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid backend configuration: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    /// Expected outcome of a row lookup, not a failure.
    #[error("row not found")]
    NotFound,
    /// Unique-constraint violation, e.g. a concurrently registered nickname.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Wraps the hosted PostgREST surface so the rest of the app only sees our
/// own types.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let key = HeaderValue::from_str(&config.anon_key)
            .map_err(|e| ClientError::Config(format!("invalid api key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
            .map_err(|e| ClientError::Config(format!("invalid api key: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Point lookup by nickname. Empty result set maps to
    /// [`ClientError::NotFound`].
    pub async fn find_user(&self, nickname: &str) -> Result<User, ClientError> {
        let filter = format!("eq.{nickname}");
        let resp = self
            .http
            .get(self.table_url(USERS_TABLE))
            .query(&[("select", "*"), ("nickname", filter.as_str())])
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let rows: Vec<User> = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        rows.into_iter().next().ok_or(ClientError::NotFound)
    }

    /// Register a new user with an empty status message. A concurrently
    /// taken nickname surfaces as [`ClientError::Conflict`].
    pub async fn create_user(
        &self,
        nickname: &str,
        avatar: &str,
        pin: &str,
    ) -> Result<User, ClientError> {
        let row = NewUser {
            nickname,
            avatar,
            pin,
            status_message: "",
        };

        let resp = self
            .http
            .post(self.table_url(USERS_TABLE))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let rows: Vec<User> = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse("insert returned no row".into()))
    }

    /// Update the caller's status message and return the stored row.
    pub async fn update_status(
        &self,
        nickname: &str,
        status_message: &str,
    ) -> Result<User, ClientError> {
        let filter = format!("eq.{nickname}");
        let resp = self
            .http
            .patch(self.table_url(USERS_TABLE))
            .query(&[("nickname", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status_message": status_message }))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let rows: Vec<User> = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        rows.into_iter().next().ok_or(ClientError::NotFound)
    }

    /// Full history of the shared log, ascending by creation time. Ordering
    /// is done server-side; the client never re-sorts.
    pub async fn list_messages(&self) -> Result<Vec<Message>, ClientError> {
        let resp = self
            .http
            .get(self.table_url(MESSAGES_TABLE))
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Append to the shared log. No row is returned; the change feed delivers
    /// the echo.
    pub async fn send_message(&self, message: &NewMessage) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.table_url(MESSAGES_TABLE))
            .header("Prefer", "return=minimal")
            .json(message)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::check(resp).await?;
        Ok(())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = Self::error_message(&body);

        // PostgREST reports unique-key violations as 409 / code 23505.
        if status == StatusCode::CONFLICT || body.contains("23505") {
            return Err(ClientError::Conflict(message));
        }

        Err(ClientError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    /// Pull the human-readable `message` out of a PostgREST error body,
    /// falling back to the raw text.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from))
            .unwrap_or_else(|| body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_message_prefers_postgrest_field() {
        let body = r#"{"code":"23505","message":"duplicate key value"}"#;
        assert_eq!(SupabaseClient::error_message(body), "duplicate key value");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(SupabaseClient::error_message("<html>"), "<html>");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = SupabaseClient::new(&BackendConfig {
            url: "https://example.supabase.co/".into(),
            anon_key: "anon".into(),
        })
        .unwrap();
        assert_eq!(
            client.table_url("chatlog"),
            "https://example.supabase.co/rest/v1/chatlog"
        );
    }
}
