// src/notifier/mod.rs

//! Live-reload notifications.
//!
//! Pipelines and reload-only watch rules call [`Notifier::reload`] after
//! output changed. The call is fire-and-forget: it never blocks and never
//! fails the caller.
//!
//! - [`NoopNotifier`] is used for one-shot runs with no server attached.
//! - [`LiveReload`] fans each notification out to every browser connected
//!   to the dev server (see [`server`]).

use std::ffi::OsString;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, trace};

pub mod server;

pub use server::{spawn_server, ServerHandle};

/// Payload sent to connected clients. Clients only learn that something
/// changed; the paths are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub changed: Vec<PathBuf>,
}

/// Side channel telling live clients to reload.
pub trait Notifier: Send + Sync + Debug {
    fn reload(&self, changed: &[PathBuf]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn reload(&self, changed: &[PathBuf]) {
        trace!(count = changed.len(), "reload requested with no live clients");
    }
}

/// A pipeline write to `app/*.html` both notifies directly and fires a
/// reload-only watch rule moments later; the second call is dropped when it
/// names the same files within this window.
pub const DUPLICATE_WINDOW: Duration = Duration::from_millis(500);

/// Broadcast-backed notifier shared by the dev server and every pipeline.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadEvent>,
    last: Arc<Mutex<Option<(Instant, Vec<OsString>)>>>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new(16)
    }
}

impl LiveReload {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Record this reload; `true` when it repeats the previous one.
    ///
    /// Paths are compared by file name because the watcher reports
    /// canonical paths while pipelines report root-joined ones.
    fn is_repeat(&self, changed: &[PathBuf]) -> bool {
        let names: Vec<OsString> = changed
            .iter()
            .filter_map(|p| p.file_name().map(ToOwned::to_owned))
            .collect();
        let now = Instant::now();

        let Ok(mut last) = self.last.lock() else {
            return false;
        };
        let repeat = match last.as_ref() {
            Some((at, previous)) => {
                now.duration_since(*at) < DUPLICATE_WINDOW
                    && !names.is_empty()
                    && names.iter().all(|n| previous.contains(n))
            }
            None => false,
        };
        if !repeat {
            *last = Some((now, names));
        }
        repeat
    }
}

impl Notifier for LiveReload {
    fn reload(&self, changed: &[PathBuf]) {
        if self.is_repeat(changed) {
            debug!(changed = changed.len(), "reload already sent for these files");
            return;
        }
        let event = ReloadEvent {
            changed: changed.to_vec(),
        };
        // No receivers just means no browser is connected yet.
        match self.tx.send(event) {
            Ok(clients) => debug!(clients, changed = changed.len(), "sent live reload"),
            Err(_) => trace!("live reload with no connected clients"),
        }
    }
}
