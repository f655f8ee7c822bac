//! Trailing-edge debounced persistence of the design.
//!
//! Mutations only poke the scheduler; one background task owns the save
//! path, so at most one persistence write is ever in flight.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::document::serializer::document_fingerprint;
use crate::error::DesignerError;
use crate::store::adapter::{PERSISTENCE_ADDRESS, StoreAdapter};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{SyncDirection, SyncEvent};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last mutation before saving
    pub delay: Duration,
    /// Persistence location the document is written to
    pub address: String,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SAVE_DELAY,
            address: PERSISTENCE_ADDRESS.to_string(),
        }
    }
}

/// User-visible save indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved { fingerprint: String },
    Failed { reason: String, consecutive: u32 },
}

enum Command {
    Mutated,
    Flush(oneshot::Sender<Result<(), DesignerError>>),
}

pub struct AutoSaveScheduler {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    saves: Rc<Cell<u64>>,
    task: JoinHandle<()>,
}

impl AutoSaveScheduler {
    /// Start the save task. `source` produces the serialized design at save
    /// time. Must run inside a `tokio::task::LocalSet`.
    pub fn spawn<A, F>(
        store: Rc<A>,
        source: F,
        config: AutoSaveConfig,
        tracer: Rc<TraceLogger>,
    ) -> Self
    where
        A: StoreAdapter + 'static,
        F: Fn() -> Result<String, DesignerError> + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let saves = Rc::new(Cell::new(0));

        let worker = SaveWorker {
            store,
            source,
            address: config.address,
            status: status_tx,
            saves: Rc::clone(&saves),
            consecutive_failures: 0,
            tracer,
        };
        let task = tokio::task::spawn_local(run(worker, config.delay, rx));

        Self {
            tx,
            status,
            saves,
            task,
        }
    }

    /// Record a design mutation; restarts the quiet period.
    pub fn notify_mutated(&self) {
        let _ = self.tx.send(Command::Mutated);
    }

    /// Save immediately, cancelling any pending debounce, and report the
    /// outcome.
    pub async fn flush(&self) -> Result<(), DesignerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .map_err(|_| DesignerError::PersistenceFailed("autosave task stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| DesignerError::PersistenceFailed("autosave task stopped".into()))?
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Persistence operations attempted so far.
    pub fn save_count(&self) -> u64 {
        self.saves.get()
    }

    /// Stop accepting mutations, write any pending save and wait for the
    /// task to finish.
    pub async fn shutdown(self) {
        let AutoSaveScheduler { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "autosave task ended abnormally");
            }
        }
    }
}

struct SaveWorker<A, F> {
    store: Rc<A>,
    source: F,
    address: String,
    status: watch::Sender<SaveStatus>,
    saves: Rc<Cell<u64>>,
    consecutive_failures: u32,
    tracer: Rc<TraceLogger>,
}

impl<A, F> SaveWorker<A, F>
where
    A: StoreAdapter,
    F: Fn() -> Result<String, DesignerError>,
{
    async fn persist(&mut self) -> Result<(), DesignerError> {
        self.saves.set(self.saves.get() + 1);
        self.status.send_replace(SaveStatus::Saving);

        let event = SyncEvent::now(SyncDirection::Save).with_address(&self.address);

        let text = match (self.source)() {
            Ok(text) => text,
            Err(e) => {
                self.tracer.log(&event.failed(&e));
                return Err(self.fail(e.to_string()));
            }
        };

        match self.store.write(&self.address, &text).await {
            Ok(()) => {
                let fingerprint = document_fingerprint(&text);
                info!(address = %self.address, %fingerprint, "design saved");
                self.tracer.log(&event.with_detail(&fingerprint));
                self.consecutive_failures = 0;
                self.status.send_replace(SaveStatus::Saved { fingerprint });
                Ok(())
            }
            Err(e) => {
                self.tracer.log(&event.failed(&e));
                Err(self.fail(e.to_string()))
            }
        }
    }

    fn fail(&mut self, reason: String) -> DesignerError {
        self.consecutive_failures += 1;
        warn!(
            address = %self.address,
            consecutive = self.consecutive_failures,
            %reason,
            "design save failed"
        );
        self.status.send_replace(SaveStatus::Failed {
            reason: reason.clone(),
            consecutive: self.consecutive_failures,
        });
        DesignerError::PersistenceFailed(reason)
    }
}

async fn run<A, F>(
    mut worker: SaveWorker<A, F>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) where
    A: StoreAdapter,
    F: Fn() -> Result<String, DesignerError>,
{
    let mut pending = false;

    loop {
        let command = if pending {
            match tokio::time::timeout(delay, rx.recv()).await {
                Ok(command) => command,
                Err(_quiet) => {
                    pending = false;
                    debug!("autosave quiet period elapsed");
                    // failures are already reported through the status
                    let _ = worker.persist().await;
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Mutated) => pending = true,
            Some(Command::Flush(reply)) => {
                pending = false;
                let result = worker.persist().await;
                let _ = reply.send(result);
            }
            None => {
                if pending {
                    let _ = worker.persist().await;
                }
                break;
            }
        }
    }
}
