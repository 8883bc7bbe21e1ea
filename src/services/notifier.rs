use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::models::petition::{Petition, PetitionStatus};

/// Fire-and-forget bridge to the notification collaborator (email/WhatsApp
/// fan-out lives behind a webhook, outside this service). Delivery failures
/// are logged and never affect the transition that triggered them.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
    token: Option<Secret<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeEvent {
    pub event: &'static str,
    pub petition_id: Uuid,
    pub creator_id: Uuid,
    pub status: PetitionStatus,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.notify_webhook_url.clone(),
            token: config.notify_webhook_token.clone(),
        }
    }

    #[cfg(test)]
    pub fn for_tests(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            token: None,
        }
    }

    /// Announces a status change without awaiting delivery.
    pub fn petition_status_changed(&self, petition: &Petition) {
        if self.webhook_url.is_none() {
            return;
        }

        let notifier = self.clone();
        let event = StatusChangeEvent {
            event: "petition.status_changed",
            petition_id: petition.id,
            creator_id: petition.creator_id,
            status: petition.status,
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                tracing::warn!(
                    petition_id = %event.petition_id,
                    status = %event.status,
                    error = %e,
                    "Notification webhook delivery failed"
                );
            }
        });
    }

    async fn send(&self, event: &StatusChangeEvent) -> Result<(), reqwest::Error> {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => return Ok(()),
        };

        let mut request = self.client.post(url).json(event);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn petition(status: PetitionStatus) -> Petition {
        let now = Utc::now();
        Petition {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            creator_name: "Ada".to_string(),
            creator_email: "ada@example.org".to_string(),
            title: "Fix the bridge".to_string(),
            pricing_tier: crate::models::petition::PricingTier::Basic,
            status,
            decision: None,
            resubmission_count: 0,
            resubmission_history: Json(vec![]),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_send_posts_event_payload() {
        let server = MockServer::start().await;
        let petition = petition(PetitionStatus::Approved);

        Mock::given(method("POST"))
            .and(path("/hooks/petitions"))
            .and(body_partial_json(serde_json::json!({
                "event": "petition.status_changed",
                "status": "approved",
                "petition_id": petition.id,
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::for_tests(Some(format!("{}/hooks/petitions", server.uri())));
        let event = StatusChangeEvent {
            event: "petition.status_changed",
            petition_id: petition.id,
            creator_id: petition.creator_id,
            status: petition.status,
        };

        notifier.send(&event).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::for_tests(Some(server.uri()));
        let event = StatusChangeEvent {
            event: "petition.status_changed",
            petition_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            status: PetitionStatus::Rejected,
        };

        assert!(notifier.send(&event).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_without_webhook_url() {
        let notifier = Notifier::for_tests(None);
        let event = StatusChangeEvent {
            event: "petition.status_changed",
            petition_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            status: PetitionStatus::Approved,
        };

        // No URL configured: a no-op, not an error.
        notifier.send(&event).await.unwrap();
    }
}
