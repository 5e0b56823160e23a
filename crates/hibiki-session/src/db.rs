use std::path::Path;

use tokio::sync::{mpsc, oneshot};

use hibiki_core::error::HibikiError;
use hibiki_core::models::WatchState;
use hibiki_core::storage::Storage;

/// Async handle to the storage actor.
///
/// `Storage` is synchronous rusqlite; a dedicated thread owns the connection
/// and serves commands, so progress checkpoints never block the event loop.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

enum DbCommand {
    WatchState {
        series_id: String,
        reply: oneshot::Sender<Result<Option<WatchState>, HibikiError>>,
    },
    SetWatchState {
        series_id: String,
        episode: u32,
        position_seconds: f64,
        reply: oneshot::Sender<Result<(), HibikiError>>,
    },
    PlaybackRate {
        reply: oneshot::Sender<Result<Option<f64>, HibikiError>>,
    },
    SetPlaybackRate {
        rate: f64,
        reply: oneshot::Sender<Result<(), HibikiError>>,
    },
}

impl DbHandle {
    pub fn open(path: &Path) -> Option<Self> {
        let storage = Storage::open(path)
            .map_err(|e| tracing::error!("Failed to open database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    /// In-memory database (for tests).
    pub fn open_memory() -> Option<Self> {
        let storage = Storage::open_memory()
            .map_err(|e| tracing::error!("Failed to open in-memory database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    fn spawn(storage: Storage) -> Option<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))
            .map_err(|e| tracing::error!("Failed to spawn DB thread: {e}"))
            .ok()?;

        Some(Self { tx })
    }

    pub async fn watch_state(&self, series_id: &str) -> Result<Option<WatchState>, HibikiError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::WatchState {
            series_id: series_id.to_string(),
            reply,
        });
        rx.await
            .unwrap_or_else(|_| Err(HibikiError::Config("DB actor closed".into())))
    }

    pub async fn set_watch_state(
        &self,
        series_id: &str,
        episode: u32,
        position_seconds: f64,
    ) -> Result<(), HibikiError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::SetWatchState {
            series_id: series_id.to_string(),
            episode,
            position_seconds,
            reply,
        });
        rx.await
            .unwrap_or_else(|_| Err(HibikiError::Config("DB actor closed".into())))
    }

    pub async fn playback_rate(&self) -> Result<Option<f64>, HibikiError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::PlaybackRate { reply });
        rx.await
            .unwrap_or_else(|_| Err(HibikiError::Config("DB actor closed".into())))
    }

    pub async fn set_playback_rate(&self, rate: f64) -> Result<(), HibikiError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::SetPlaybackRate { rate, reply });
        rx.await
            .unwrap_or_else(|_| Err(HibikiError::Config("DB actor closed".into())))
    }
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::WatchState { series_id, reply } => {
                let _ = reply.send(storage.watch_state(&series_id));
            }
            DbCommand::SetWatchState {
                series_id,
                episode,
                position_seconds,
                reply,
            } => {
                let _ = reply.send(storage.set_watch_state(&series_id, episode, position_seconds));
            }
            DbCommand::PlaybackRate { reply } => {
                let _ = reply.send(storage.playback_rate());
            }
            DbCommand::SetPlaybackRate { rate, reply } => {
                let _ = reply.send(storage.set_playback_rate(rate));
            }
        }
    }
}
