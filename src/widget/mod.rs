//! Home-screen widget synchronisation
//!
//! The widget shows four integers computed by the store. Delivery is
//! fire-and-forget: see [`WidgetDispatcher`].

pub mod dispatcher;
pub mod sink;

pub use dispatcher::WidgetDispatcher;
pub use sink::{FileWidgetSink, WebhookWidgetSink, WidgetError, WidgetSink};

use crate::config::{WidgetConfig, WidgetMode};
use std::sync::Arc;
use std::time::Duration;

/// Start a dispatcher for the configured sink, if any.
pub fn spawn_from_config(config: &WidgetConfig) -> Option<WidgetDispatcher> {
    let sink: Arc<dyn WidgetSink> = match config.mode {
        WidgetMode::None => return None,
        WidgetMode::File => {
            tracing::info!("Publishing widget data to {}", config.file_path);
            Arc::new(FileWidgetSink::new(&config.file_path))
        }
        WidgetMode::Webhook => {
            let url = config.webhook_url.clone()?;
            tracing::info!("Publishing widget data to {}", url);
            Arc::new(WebhookWidgetSink::new(url, config.reload_url.clone()))
        }
    };

    Some(WidgetDispatcher::spawn(
        sink,
        Duration::from_millis(config.debounce_ms),
    ))
}
