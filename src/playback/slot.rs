//! Per-asset load state with an off-thread loader.
//!
//! A loader thread publishes exactly one result into a bounded(1) channel; the
//! render thread consumes it with [`AssetSlot::poll`], which never blocks.
//! Requesting a new path drops the old receiver, so a superseded loader's
//! result is discarded when it tries to send.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};

use crate::error::FacemimeError;

/// Externally visible readiness of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Empty,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetState::Empty => write!(f, "empty"),
            AssetState::Loading => write!(f, "loading"),
            AssetState::Ready => write!(f, "ready"),
            AssetState::Failed => write!(f, "failed"),
        }
    }
}

enum Slot<T> {
    Empty,
    Loading(Receiver<Result<T, FacemimeError>>),
    Ready(Arc<T>),
    Failed(String),
}

/// Holds one asset through `Empty -> Loading -> Ready | Failed`.
pub struct AssetSlot<T> {
    label: &'static str,
    path: Option<PathBuf>,
    slot: Slot<T>,
}

impl<T: Send + 'static> AssetSlot<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            path: None,
            slot: Slot::Empty,
        }
    }

    /// Start loading `path` on a background thread, replacing whatever was held.
    pub fn request<F>(&mut self, path: PathBuf, load: F)
    where
        F: FnOnce(&Path) -> Result<T, FacemimeError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let thread_path = path.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-loader", self.label))
            .spawn(move || {
                let result = load(&thread_path);
                // Receiver is gone if the path was replaced meanwhile.
                let _ = tx.send(result);
            });

        self.slot = match spawned {
            Ok(_) => {
                tracing::debug!("Loading {} from {}", self.label, path.display());
                Slot::Loading(rx)
            }
            Err(e) => {
                tracing::warn!("Failed to spawn {} loader: {}", self.label, e);
                Slot::Failed(format!("failed to spawn loader: {}", e))
            }
        };
        self.path = Some(path);
    }

    /// Drop the asset and any in-flight load.
    pub fn clear(&mut self) {
        self.slot = Slot::Empty;
        self.path = None;
    }

    /// Consume a finished load, if any. Returns true when the state changed.
    pub fn poll(&mut self) -> bool {
        let outcome = match &self.slot {
            Slot::Loading(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => Err(self.loader_vanished()),
            },
            _ => return false,
        };
        self.settle(outcome);
        true
    }

    /// Block until the in-flight load settles or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> AssetState {
        let outcome = match &self.slot {
            Slot::Loading(rx) => match rx.recv_timeout(timeout) {
                Ok(result) => Some(result),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Err(self.loader_vanished())),
            },
            _ => None,
        };
        if let Some(outcome) = outcome {
            self.settle(outcome);
        }
        self.state()
    }

    pub fn state(&self) -> AssetState {
        match self.slot {
            Slot::Empty => AssetState::Empty,
            Slot::Loading(_) => AssetState::Loading,
            Slot::Ready(_) => AssetState::Ready,
            Slot::Failed(_) => AssetState::Failed,
        }
    }

    /// The loaded asset, when ready.
    pub fn get(&self) -> Option<&Arc<T>> {
        match &self.slot {
            Slot::Ready(asset) => Some(asset),
            _ => None,
        }
    }

    /// Why the last load failed.
    pub fn error(&self) -> Option<&str> {
        match &self.slot {
            Slot::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn settle(&mut self, outcome: Result<T, FacemimeError>) {
        let path = self
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.slot = match outcome {
            Ok(asset) => {
                tracing::info!("{} ready: {}", self.label, path);
                Slot::Ready(Arc::new(asset))
            }
            Err(e) => {
                tracing::warn!("{} failed to load from {}: {}", self.label, path, e);
                Slot::Failed(e.to_string())
            }
        };
    }

    fn loader_vanished(&self) -> FacemimeError {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{} loader exited without a result", self.label),
        )
        .into()
    }
}

impl<T> fmt::Debug for AssetSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot {
            Slot::Empty => AssetState::Empty,
            Slot::Loading(_) => AssetState::Loading,
            Slot::Ready(_) => AssetState::Ready,
            Slot::Failed(_) => AssetState::Failed,
        };
        f.debug_struct("AssetSlot")
            .field("label", &self.label)
            .field("path", &self.path)
            .field("state", &state)
            .finish()
    }
}
