//! Notification sinks
//!
//! A sink failure is logged and forgotten; nothing here can reach back
//! into an order transaction.

use async_trait::async_trait;
use shared::OrderNotification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("Receiver rejected notification: HTTP {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &OrderNotification) -> Result<(), SinkError>;
}

/// Writes every notification to the application log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, n: &OrderNotification) -> Result<(), SinkError> {
        tracing::info!(
            order_id = %n.order_id,
            order_number = %n.order_number,
            owner_id = %n.owner_id,
            kind = ?n.kind,
            status = %n.status,
            "{}",
            n.message
        );
        Ok(())
    }
}

/// POSTs the notification JSON to an external receiver (mailer, push service)
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, notification: &OrderNotification) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(10))
            .json(notification)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Drain one sink channel until it closes or shutdown is requested
pub async fn run_sink(
    sink: Box<dyn NotificationSink>,
    mut rx: mpsc::Receiver<Arc<OrderNotification>>,
    shutdown: CancellationToken,
) {
    tracing::debug!(sink = sink.name(), "Notification sink started");
    loop {
        tokio::select! {
            next = rx.recv() => {
                let Some(notification) = next else {
                    tracing::debug!(sink = sink.name(), "Notification channel closed");
                    break;
                };
                if let Err(e) = sink.deliver(&notification).await {
                    tracing::warn!(
                        sink = sink.name(),
                        order_id = %notification.order_id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{NotificationKind, OrderStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(Arc<AtomicUsize>);

    #[async_trait]
    impl NotificationSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(&self, _: &OrderNotification) -> Result<(), SinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Rejected(500))
        }
    }

    #[tokio::test]
    async fn test_failing_sink_keeps_draining() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_sink(
            Box::new(CountingSink(delivered.clone())),
            rx,
            CancellationToken::new(),
        ));

        for i in 0..3 {
            tx.send(Arc::new(OrderNotification {
                id: i.to_string(),
                order_id: format!("o{i}"),
                order_number: String::new(),
                owner_id: "u1".into(),
                kind: NotificationKind::StatusChanged,
                status: OrderStatus::Confirmed,
                message: String::new(),
                timestamp: 0,
            }))
            .await
            .unwrap();
        }
        drop(tx);
        handle.await.unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
    }
}
