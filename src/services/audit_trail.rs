//! Audit trail: bounded queue + background writer.
//!
//! Callers record entries fire-and-forget; the worker drains them to the
//! configured [`AuditSink`]. Sink failures are logged and counted, never
//! re-raised to the code that produced the entry. A full queue drops the
//! entry and increments an observable counter so backlog pressure is
//! visible instead of unbounded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::models::AuditEntry;
use crate::domain::ports::AuditSink;

enum AuditMessage {
    Entry(Box<AuditEntry>),
    /// Barrier: acked once every prior entry has been offered to the sink.
    Flush(oneshot::Sender<()>),
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct AuditTrailStats {
    pub recorded: u64,
    pub dropped: u64,
    pub sink_failures: u64,
}

/// Handle used by services to record audit entries.
///
/// Cloneable; all clones feed the same worker.
#[derive(Clone)]
pub struct AuditTrail {
    tx: mpsc::Sender<AuditMessage>,
    recorded: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    sink_failures: Arc<AtomicU64>,
}

impl AuditTrail {
    /// Spawn the background worker draining into `sink`.
    ///
    /// The returned [`JoinHandle`] completes once every sender clone is
    /// dropped and the queue has drained.
    pub fn spawn(sink: Arc<dyn AuditSink>, queue_capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AuditMessage>(queue_capacity.max(1));
        let sink_failures = Arc::new(AtomicU64::new(0));
        let worker_failures = Arc::clone(&sink_failures);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    AuditMessage::Entry(entry) => {
                        if let Err(err) = sink.append(&entry).await {
                            worker_failures.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(
                                action = entry.action.as_str(),
                                error = %err,
                                "audit sink write failed"
                            );
                        }
                    }
                    AuditMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        (
            Self {
                tx,
                recorded: Arc::new(AtomicU64::new(0)),
                dropped: Arc::new(AtomicU64::new(0)),
                sink_failures,
            },
            handle,
        )
    }

    /// Record an entry without blocking the caller's critical path.
    ///
    /// The attempt is unconditional; on a full queue the entry is dropped
    /// and counted.
    pub fn record(&self, entry: AuditEntry) {
        match self.tx.try_send(AuditMessage::Entry(Box::new(entry))) {
            Ok(()) => {
                self.recorded.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %err, "audit queue full, entry dropped");
            }
        }
    }

    /// Wait until everything recorded so far has been offered to the sink.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub fn stats(&self) -> AuditTrailStats {
        AuditTrailStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}
