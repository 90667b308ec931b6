use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const QUEUE_CAPACITY: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Progress {
        stage: String,
        percent: f64,
        message: String,
        current_superblock: Option<u32>,
        total_superblocks: Option<u32>,
    },
    Complete {
        message: String,
    },
    Error {
        message: String,
    },
}

/// A bounded single-producer/single-consumer progress channel. `send` is
/// non-blocking and silently discards the event when the queue is full,
/// per the transport contract in §5.
#[derive(Clone)]
pub struct ProgressSender {
    tx: SyncSender<ProgressEvent>,
}

pub struct ProgressReceiver {
    rx: Receiver<ProgressEvent>,
}

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = sync_channel(QUEUE_CAPACITY);
    (ProgressSender { tx }, ProgressReceiver { rx })
}

impl ProgressSender {
    pub fn send(&self, event: ProgressEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("progress queue full, discarding event");
            }
        }
    }

    pub fn stage(&self, stage: &str, percent: f64, message: &str) {
        self.send(ProgressEvent::Progress {
            stage: stage.to_string(),
            percent,
            message: message.to_string(),
            current_superblock: None,
            total_superblocks: None,
        });
    }
}

impl ProgressReceiver {
    pub fn try_iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        self.rx.try_iter()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// A cancellation token threaded into every pipeline stage; stages check
/// it at loop headers rather than relying on ad-hoc done flags (§9).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawns a heartbeat thread that emits a synthetic progress event every
/// `interval` until `stop` is set, so clients watching
/// `/partition/stream` can distinguish slow work from a hang (§5).
pub fn spawn_heartbeat(sender: ProgressSender, interval: Duration, stop: CancellationToken) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let start = std::time::Instant::now();
        while !stop.is_cancelled() {
            std::thread::sleep(interval);
            if stop.is_cancelled() {
                break;
            }
            sender.send(ProgressEvent::Progress {
                stage: "heartbeat".to_string(),
                percent: 0.0,
                message: format!("still working, {:.0}s elapsed", start.elapsed().as_secs_f64()),
                current_superblock: None,
                total_superblocks: None,
            });
        }
    })
}
