//! HTTP client for the platform's notification endpoints.
//!
//! Every request carries the configured bearer token. Non-success
//! responses surface the response body (or `HTTP <status>` when the body is
//! empty) so callers can log something meaningful.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};

use labelpulse_core::{Notification, NotificationRepository, RepoResult, UnreadCount};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Client for the annotation platform notification API
pub struct NotificationApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl NotificationApiClient {
    /// Create a new notification API client
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("LabelPulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `GET /notifications/unread-count`
    pub async fn fetch_unread_count(&self) -> Result<UnreadCount, ApiError> {
        let response = self
            .send(self.request(Method::GET, "/notifications/unread-count"))
            .await?;
        let count: UnreadCount = response.json().await?;

        tracing::debug!(
            unread = count.unread_count,
            "[NotificationApi] Fetched unread count"
        );
        Ok(count)
    }

    /// `GET /notifications?limit={limit}`
    pub async fn fetch_notifications(&self, limit: u32) -> Result<Vec<Notification>, ApiError> {
        let request = self
            .request(Method::GET, "/notifications")
            .query(&[("limit", limit)]);
        let notifications: Vec<Notification> = self.send(request).await?.json().await?;

        tracing::debug!(
            count = notifications.len(),
            limit,
            "[NotificationApi] Fetched notifications"
        );
        Ok(notifications)
    }

    /// `PATCH /notifications/{id}/read`
    pub async fn send_mark_read(&self, id: &str) -> Result<(), ApiError> {
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::InvalidId(id.to_string()));
        }

        let path = format!("/notifications/{}/read", id);
        self.send(self.request(Method::PATCH, &path)).await?;

        tracing::debug!(id, "[NotificationApi] Marked notification read");
        Ok(())
    }

    /// `PATCH /notifications/mark-all-read`
    pub async fn send_mark_all_read(&self) -> Result<(), ApiError> {
        self.send(self.request(Method::PATCH, "/notifications/mark-all-read"))
            .await?;

        tracing::debug!("[NotificationApi] Marked all notifications read");
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.config.url(path));
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                body
            };
            tracing::debug!(
                status = status.as_u16(),
                body = %body,
                "[NotificationApi] Request rejected"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl NotificationRepository for NotificationApiClient {
    async fn unread_count(&self) -> RepoResult<UnreadCount> {
        Ok(self.fetch_unread_count().await?)
    }

    async fn list(&self, limit: u32) -> RepoResult<Vec<Notification>> {
        Ok(self.fetch_notifications(limit).await?)
    }

    async fn mark_read(&self, id: &str) -> RepoResult<()> {
        Ok(self.send_mark_read(id).await?)
    }

    async fn mark_all_read(&self) -> RepoResult<()> {
        Ok(self.send_mark_all_read().await?)
    }
}
