use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use telemetry_logging::{telemetry_debug, telemetry_error, telemetry_warn};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::{ApiClient, FetchSettings, ReqwestApiClient};
use crate::scheduler::{PollScheduler, RefreshAction};
use crate::{
    ApiResponse, EngineEvent, FailureKind, FetchError, Generation, RequestSeq, RequestTarget,
};

/// Receives engine events on a runtime thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build api client: {0}")]
    Client(#[from] FetchError),
    #[error("failed to start engine thread: {0}")]
    Thread(String),
}

enum EngineCommand {
    Fetch {
        channel: String,
        seq: RequestSeq,
        target: RequestTarget,
    },
    Post {
        target: RequestTarget,
    },
    StartPolling {
        channel: String,
        interval: Duration,
    },
    StopPolling {
        channel: String,
    },
    BeginGeneration(Generation),
    Shutdown,
}

/// Runs fetches and polling timers off the UI thread. Results come back
/// through the [`EventSink`] given at spawn time.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    cancel: CancellationToken,
    generation: Generation,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn spawn(
        client: Arc<dyn ApiClient>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("telemetry-engine".to_string())
            .spawn(move || run(runtime, cmd_rx, client, sink, worker_cancel))
            .map_err(|err| EngineError::Thread(err.to_string()))?;

        Ok(Self {
            cmd_tx,
            cancel,
            generation: 0,
            worker: Some(worker),
        })
    }

    /// Engine talking to `base_url` over HTTP, reporting into a channel.
    pub fn connect(
        base_url: &str,
        settings: FetchSettings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let client = Arc::new(ReqwestApiClient::new(base_url, settings)?);
        let (event_tx, event_rx) = mpsc::channel();
        let handle = Self::spawn(client, Arc::new(ChannelEventSink::new(event_tx)))?;
        Ok((handle, event_rx))
    }

    pub fn fetch(&self, channel: impl Into<String>, seq: RequestSeq, target: RequestTarget) {
        self.send(EngineCommand::Fetch {
            channel: channel.into(),
            seq,
            target,
        });
    }

    pub fn post(&self, target: RequestTarget) {
        self.send(EngineCommand::Post { target });
    }

    pub fn start_polling(&self, channel: impl Into<String>, interval: Duration) {
        self.send(EngineCommand::StartPolling {
            channel: channel.into(),
            interval,
        });
    }

    pub fn stop_polling(&self, channel: impl Into<String>) {
        self.send(EngineCommand::StopPolling {
            channel: channel.into(),
        });
    }

    /// Generation that fetches and timers started now are tagged with.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Stops every timer and cancels the in-flight fetches of the current
    /// generation, then starts a new one. Cancelled fetches still report a
    /// `Cancelled` completion, tagged with the generation they belonged to.
    pub fn begin_generation(&mut self) -> Generation {
        self.generation += 1;
        self.send(EngineCommand::BeginGeneration(self.generation));
        self.generation
    }

    /// Stops every timer and cancels in-flight fetches. Each cancelled fetch
    /// still reports a `Cancelled` completion before this returns.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            telemetry_warn!("engine thread is gone; command dropped");
        }
    }

    fn close(&mut self) {
        self.cancel.cancel();
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                telemetry_error!("engine thread panicked");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn run(
    runtime: Runtime,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    client: Arc<dyn ApiClient>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    let mut scheduler = PollScheduler::new(runtime.handle().clone());
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut generation: Generation = 0;
    let mut generation_cancel = cancel.child_token();

    while let Ok(command) = cmd_rx.recv() {
        in_flight.retain(|task| !task.is_finished());
        match command {
            EngineCommand::Fetch {
                channel,
                seq,
                target,
            } => {
                telemetry_debug!("fetch {channel}#{seq} {}", target.path_and_query);
                let client = client.clone();
                let sink = sink.clone();
                let cancel = generation_cancel.clone();
                in_flight.push(runtime.spawn(async move {
                    let result = send_cancellable(client.as_ref(), &target, &cancel).await;
                    sink.emit(EngineEvent::FetchCompleted {
                        channel,
                        seq,
                        generation,
                        result,
                    });
                }));
            }
            EngineCommand::Post { target } => {
                let client = client.clone();
                let sink = sink.clone();
                let cancel = cancel.clone();
                in_flight.push(runtime.spawn(async move {
                    let result = send_cancellable(client.as_ref(), &target, &cancel).await;
                    sink.emit(EngineEvent::PostCompleted {
                        path: target.path_and_query,
                        result,
                    });
                }));
            }
            EngineCommand::StartPolling { channel, interval } => {
                let sink = sink.clone();
                let tick_channel = channel.clone();
                let action: RefreshAction = Arc::new(move || {
                    sink.emit(EngineEvent::RefreshDue {
                        channel: tick_channel.clone(),
                        generation,
                    });
                });
                if let Err(err) = scheduler.start(&channel, interval, action) {
                    telemetry_error!("{err}");
                }
            }
            EngineCommand::StopPolling { channel } => {
                scheduler.stop(&channel);
            }
            EngineCommand::BeginGeneration(next) => {
                scheduler.stop_all();
                generation_cancel.cancel();
                generation_cancel = cancel.child_token();
                telemetry_debug!("generation {generation} ended, starting {next}");
                generation = next;
            }
            EngineCommand::Shutdown => break,
        }
    }

    scheduler.stop_all();
    cancel.cancel();
    runtime.block_on(async {
        for task in in_flight {
            let _ = task.await;
        }
    });
}

async fn send_cancellable(
    client: &dyn ApiClient,
    target: &RequestTarget,
    cancel: &CancellationToken,
) -> Result<ApiResponse, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::new(FailureKind::Cancelled, "request cancelled")),
        result = client.send(target) => result,
    }
}
