//! History fetcher: one page of past notifications over HTTP.

use std::sync::Arc;

use chrono::Utc;
use notifeed_core::{FeedError, HistoryQuery, NotificationItem, items_from_history, parse_history_body};
use url::Url;

use crate::config::{ConfigError, FeedConfig};
use crate::session::{Credentials, SessionSource};

pub struct HistoryFetcher {
    client: reqwest::Client,
    url: Url,
    session: Arc<dyn SessionSource>,
}

impl HistoryFetcher {
    pub fn new(config: &FeedConfig, session: Arc<dyn SessionSource>) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("notifeed/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: config.history_url()?,
            session,
        })
    }

    /// Resolve the session, then fetch. Fails with [`FeedError::Auth`]
    /// before any network activity when the session is incomplete.
    pub async fn fetch(&self, query: &HistoryQuery) -> Result<Vec<NotificationItem>, FeedError> {
        let creds = self.session.credentials()?;
        self.fetch_with(&creds, query).await
    }

    /// Fetch with already-resolved credentials. Items are filtered,
    /// normalized and kept in server order.
    pub async fn fetch_with(
        &self,
        creds: &Credentials,
        query: &HistoryQuery,
    ) -> Result<Vec<NotificationItem>, FeedError> {
        tracing::debug!(
            url = %self.url,
            page = query.page,
            page_size = query.page_size,
            unread_only = query.unread_only,
            "history: fetching page"
        );

        let response = self
            .client
            .get(self.url.clone())
            .query(&query.query_pairs())
            .bearer_auth(&creds.token)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Transport(format!("unexpected status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        let raws = parse_history_body(&body)?;
        let received = raws.len();
        let items = items_from_history(raws, Utc::now());

        tracing::debug!(received, kept = items.len(), "history: page received");
        Ok(items)
    }

    pub fn session(&self) -> &Arc<dyn SessionSource> {
        &self.session
    }
}
