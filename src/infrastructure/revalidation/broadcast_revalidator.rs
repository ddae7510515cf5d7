use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::application::ports::revalidation_port::{RevalidationPort, RevalidationSignal};

#[derive(Clone)]
pub struct BroadcastRevalidator {
    sender: broadcast::Sender<RevalidationSignal>,
}

impl BroadcastRevalidator {
    pub fn new(sender: broadcast::Sender<RevalidationSignal>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl RevalidationPort for BroadcastRevalidator {
    async fn revalidate(&self, path: &str) -> anyhow::Result<()> {
        let signal = RevalidationSignal {
            path: path.to_string(),
            at: Utc::now(),
        };
        match self.sender.send(signal) {
            Ok(receivers) => {
                tracing::debug!(%path, receivers, "revalidation_published");
                Ok(())
            }
            // Nobody listening; the next page load fetches fresh data anyway.
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }
}
