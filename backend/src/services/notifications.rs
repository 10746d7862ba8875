use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::constants::PUSH_REQUEST_TIMEOUT_SECS;
use crate::models::NotificationKind;
use crate::store::{RemoteStore, StoreError, get_json, paths};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push service rejected notification: {0}")]
    Rejected(String),

    #[error("Could not resolve recipient: {0}")]
    Store(#[from] StoreError),
}

/// Delivers like/match notifications. Callers log failures; nothing retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, sender_id: &str, receiver_id: &str, kind: NotificationKind) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, sender_id: &str, receiver_id: &str, kind: NotificationKind) -> Result<(), NotifyError> {
        tracing::info!("Notification {:?}: {} -> {}", kind, sender_id, receiver_id);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: String,
    data: PushData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushData<'a> {
    kind: NotificationKind,
    sender_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Option<PushTicket>,
}

#[derive(Debug, Deserialize)]
struct PushTicket {
    status: String,
    message: Option<String>,
}

/// Sends Expo-style push messages to the receiver's `users/{id}/pushToken`.
#[derive(Clone)]
pub struct PushNotifier {
    client: Client,
    store: Arc<dyn RemoteStore>,
    endpoint: String,
    access_token: Option<String>,
}

impl PushNotifier {
    pub fn new(store: Arc<dyn RemoteStore>, endpoint: String, access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            store,
            endpoint,
            access_token,
        }
    }

    async fn display_name(&self, user_id: &str) -> String {
        let path = format!("{}/username", paths::user(user_id));
        match get_json::<String>(self.store.as_ref(), &path).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            _ => "Someone".to_string(),
        }
    }
}

fn message_body(kind: NotificationKind, sender_name: &str) -> String {
    match kind {
        NotificationKind::Like => format!("{} liked your profile", sender_name),
        NotificationKind::Match => format!("You and {} liked each other", sender_name),
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn send(&self, sender_id: &str, receiver_id: &str, kind: NotificationKind) -> Result<(), NotifyError> {
        let token_path = format!("{}/pushToken", paths::user(receiver_id));
        let Some(token) = get_json::<String>(self.store.as_ref(), &token_path).await? else {
            tracing::debug!("No push token for {}, skipping {:?} notification", receiver_id, kind);
            return Ok(());
        };

        let sender_name = self.display_name(sender_id).await;
        let message = PushMessage {
            to: &token,
            title: kind.title(),
            body: message_body(kind, &sender_name),
            data: PushData { kind, sender_id },
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .timeout(Duration::from_secs(PUSH_REQUEST_TIMEOUT_SECS));
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!("HTTP {}", response.status())));
        }

        let body: PushResponse = response.json().await?;
        if let Some(ticket) = body.data {
            if ticket.status == "error" {
                return Err(NotifyError::Rejected(ticket.message.unwrap_or_else(|| "unknown error".to_string())));
            }
        }

        tracing::debug!("Delivered {:?} notification {} -> {}", kind, sender_id, receiver_id);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_message_body() {
        assert_eq!(message_body(NotificationKind::Like, "amy"), "amy liked your profile");
        assert_eq!(message_body(NotificationKind::Match, "amy"), "You and amy liked each other");
    }

    #[tokio::test]
    async fn test_push_skipped_without_token() {
        let store = Arc::new(MemoryStore::new());
        let notifier = PushNotifier::new(store, "http://127.0.0.1:9/unreachable".to_string(), None);

        // No token stored, so no request is attempted.
        notifier.send("a", "b", NotificationKind::Like).await.unwrap();
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        LogNotifier.send("a", "b", NotificationKind::Match).await.unwrap();
    }
}
