//! In-memory notifier using tokio broadcast channels.
//!
//! This implementation is suitable for:
//! - Single process deployments and the operator CLI
//! - Development and testing
//!
//! Notices are only visible to subscribers in the same process. It also keeps
//! a bounded history so callers without a live subscription can inspect what
//! was sent.

use async_trait::async_trait;
use crewdeck_notify::{Notice, NoticeStream, Notifier, NotifyError, Recipient};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const CHANNEL_CAPACITY: usize = 100;
const HISTORY_CAPACITY: usize = 1000;

/// In-memory notifier keyed by recipient.
#[derive(Clone)]
pub struct MemoryNotifier {
    channels: Arc<DashMap<Recipient, broadcast::Sender<Notice>>>,
    history: Arc<Mutex<VecDeque<Notice>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY))),
        }
    }

    /// Notices sent so far, oldest first (bounded).
    pub fn sent(&self) -> Vec<Notice> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Get or create a broadcast channel for a recipient
    fn get_or_create_channel(&self, recipient: &Recipient) -> broadcast::Sender<Notice> {
        self.channels
            .entry(recipient.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn remember(&self, notice: &Notice) {
        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(notice.clone());
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        self.remember(&notice);
        for recipient in &notice.recipients {
            let tx = self.get_or_create_channel(recipient);
            // No receivers is fine: the recipient just isn't online.
            let _ = tx.send(notice.clone());
        }
        tracing::debug!(
            kind = ?notice.kind,
            partner_id = %notice.partner_id,
            recipients = notice.recipients.len(),
            "notice delivered in-process"
        );
        Ok(())
    }

    async fn subscribe(&self, recipient: &Recipient) -> Result<NoticeStream, NotifyError> {
        let rx = self.get_or_create_channel(recipient).subscribe();

        // Lagged receivers drop the missed notices rather than erroring out.
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());

        Ok(Box::pin(stream))
    }
}
