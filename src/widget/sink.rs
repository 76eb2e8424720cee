use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::TravelStats;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("failed to write widget data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode widget data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("widget endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("widget endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

/// Destination shared with the out-of-process widget.
#[async_trait]
pub trait WidgetSink: Send + Sync {
    /// Store the four widget values
    async fn write(&self, stats: &TravelStats) -> Result<(), WidgetError>;

    /// Ask the widget host to re-render from the stored values
    async fn reload(&self) -> Result<(), WidgetError>;
}

/// Writes widget values as JSON into a file shared with the widget host.
///
/// The refresh signal is a sibling `.reload` file holding the time of the
/// request, which the host watches.
pub struct FileWidgetSink {
    path: PathBuf,
}

impl FileWidgetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn reload_marker(&self) -> PathBuf {
        let mut marker = self.path.clone().into_os_string();
        marker.push(".reload");
        PathBuf::from(marker)
    }
}

#[async_trait]
impl WidgetSink for FileWidgetSink {
    async fn write(&self, stats: &TravelStats) -> Result<(), WidgetError> {
        let payload = serde_json::to_vec_pretty(stats)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        // readers only ever see a complete file
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), WidgetError> {
        let requested_at = chrono::Utc::now().to_rfc3339();
        tokio::fs::write(self.reload_marker(), requested_at).await?;
        Ok(())
    }
}

/// Posts widget values to an HTTP endpoint, then optionally pings a reload URL.
pub struct WebhookWidgetSink {
    client: reqwest::Client,
    data_url: String,
    reload_url: Option<String>,
}

impl WebhookWidgetSink {
    pub fn new(data_url: impl Into<String>, reload_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            data_url: data_url.into(),
            reload_url,
        }
    }
}

#[async_trait]
impl WidgetSink for WebhookWidgetSink {
    async fn write(&self, stats: &TravelStats) -> Result<(), WidgetError> {
        let response = self.client.post(&self.data_url).json(stats).send().await?;
        if !response.status().is_success() {
            return Err(WidgetError::Status(response.status()));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), WidgetError> {
        let Some(url) = self.reload_url.as_deref() else {
            return Ok(());
        };

        let response = self.client.post(url).send().await?;
        if !response.status().is_success() {
            return Err(WidgetError::Status(response.status()));
        }
        Ok(())
    }
}
