//! Logo fetch queue.
//!
//! ```text
//!   Paginator ── enqueue(FetchTask) ──▶ unbounded FIFO ──▶ FetchWorker (one task)
//!                                                              │
//!                                     AssetCache ◀── lookup / store
//!                                                              │
//!   UI loop ◀──────────── UiEvent::LogoReady { id, path } ─────┘
//! ```
//!
//! Exactly one worker drains the queue, so all fetches are serialized
//! globally, not per channel. A failed task is logged and skipped; the worker
//! only exits when cancelled or when every queue handle is gone.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cache::{looks_like_image, AssetCache};
use crate::config::FetchConfig;
use crate::error::FetchSkip;
use crate::playlist::ChannelId;
use crate::protocol::UiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub channel_id: ChannelId,
    /// May be empty: the task then resolves to "no icon" without touching
    /// the network.
    pub logo_url: String,
    pub channel_name: String,
}

/// Producer side of the queue. Cheap to clone; `enqueue` never blocks.
#[derive(Debug, Clone)]
pub struct FetchQueue {
    tx: mpsc::UnboundedSender<FetchTask>,
}

impl FetchQueue {
    /// A queue plus the receiving end a [`FetchWorker`] drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FetchTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: FetchTask) {
        if self.tx.send(task).is_err() {
            debug!("fetch queue: worker gone, dropping task");
        }
    }
}

/// HTTP client + cache write-through for a single task.
#[derive(Debug, Clone)]
pub struct LogoFetcher {
    client: reqwest::Client,
    cache: AssetCache,
}

impl LogoFetcher {
    pub fn new(config: &FetchConfig, cache: AssetCache) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client, cache })
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Resolve a task to a cached icon file, downloading on a cache miss.
    pub async fn resolve(&self, task: &FetchTask) -> Result<PathBuf, FetchSkip> {
        let logo_url = task.logo_url.trim();
        if logo_url.is_empty() {
            return Err(FetchSkip::NoLogo);
        }

        if self.cache.path_for(&task.channel_name).is_none() {
            return Err(FetchSkip::UnusableName(task.channel_name.clone()));
        }

        if let Some(path) = self.cache.lookup(&task.channel_name).await {
            trace!("fetch: cache hit for {:?}", task.channel_name);
            return Ok(path);
        }

        let scheme_ok = {
            let lower = logo_url.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        };
        if !scheme_ok {
            return Err(FetchSkip::UnsupportedScheme(logo_url.to_string()));
        }

        let response = self.client.get(logo_url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchSkip::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        if !looks_like_image(&bytes) {
            return Err(FetchSkip::NotAnImage);
        }

        let path = self.cache.store(&task.channel_name, &bytes).await?;
        Ok(path)
    }
}

enum WorkerState {
    Idle {
        rx: mpsc::UnboundedReceiver<FetchTask>,
        fetcher: LogoFetcher,
    },
    Running {
        handle: JoinHandle<()>,
        cancel: CancellationToken,
    },
    Stopped,
}

/// Owner of the single background worker. Tasks enqueued before `start`
/// wait in the queue.
pub struct FetchWorker {
    state: WorkerState,
    delivery: mpsc::Sender<UiEvent>,
}

/// Create a queue and the (not yet started) worker that drains it.
pub fn fetch_queue(fetcher: LogoFetcher, delivery: mpsc::Sender<UiEvent>) -> (FetchQueue, FetchWorker) {
    let (queue, rx) = FetchQueue::channel();
    (queue, FetchWorker::new(rx, fetcher, delivery))
}

impl FetchWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<FetchTask>,
        fetcher: LogoFetcher,
        delivery: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            state: WorkerState::Idle { rx, fetcher },
            delivery,
        }
    }

    /// Start the worker if it is idle. Returns `true` only on the call that
    /// actually started it.
    pub fn ensure_started(&mut self) -> bool {
        match std::mem::replace(&mut self.state, WorkerState::Stopped) {
            WorkerState::Idle { rx, fetcher } => {
                let cancel = CancellationToken::new();
                let handle = tokio::spawn(run_worker(
                    rx,
                    fetcher,
                    self.delivery.clone(),
                    cancel.clone(),
                ));
                self.state = WorkerState::Running { handle, cancel };
                true
            }
            running @ WorkerState::Running { .. } => {
                self.state = running;
                false
            }
            WorkerState::Stopped => {
                debug!("fetch worker: start requested after shutdown, ignoring");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.state, WorkerState::Running { handle, .. } if !handle.is_finished())
    }

    /// Signal the worker to stop and wait up to `timeout` for it.
    pub async fn shutdown(&mut self, timeout: Duration) {
        match std::mem::replace(&mut self.state, WorkerState::Stopped) {
            WorkerState::Running { handle, cancel } => {
                cancel.cancel();
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(())) => info!("fetch worker: joined"),
                    Ok(Err(e)) => warn!("fetch worker: ended abnormally: {}", e),
                    Err(_) => warn!("fetch worker: did not stop within {:?}", timeout),
                }
            }
            WorkerState::Idle { .. } => debug!("fetch worker: shutdown before start"),
            WorkerState::Stopped => {}
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<FetchTask>,
    fetcher: LogoFetcher,
    delivery: mpsc::Sender<UiEvent>,
    cancel: CancellationToken,
) {
    info!("fetch worker: started, cache at {:?}", fetcher.cache().dir());

    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(task) => task,
                None => break,
            },
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = fetcher.resolve(&task) => outcome,
        };

        match outcome {
            Ok(path) => {
                let event = UiEvent::LogoReady {
                    id: task.channel_id,
                    path,
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = delivery.send(event) => {
                        if sent.is_err() {
                            debug!("fetch worker: UI channel closed");
                            break;
                        }
                    }
                }
            }
            Err(FetchSkip::NoLogo) => {
                trace!("fetch: {} has no logo", task.channel_id);
            }
            Err(skip @ (FetchSkip::Http(_) | FetchSkip::Status(_) | FetchSkip::Io(_))) => {
                warn!("fetch: {} ({}) skipped: {}", task.channel_id, task.logo_url, skip);
            }
            Err(skip) => {
                debug!("fetch: {} skipped: {}", task.channel_id, skip);
            }
        }
    }

    info!("fetch worker: stopped");
}
