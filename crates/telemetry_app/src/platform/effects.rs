use std::collections::HashSet;
use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;
use telemetry_core::{
    ApiBody, ApiRequest, ChannelId, Effect, HttpMethod, KeyValueStore, Msg, PageKind,
    SelectionBridge, SyncFailure,
};
use telemetry_engine::{
    ApiResponse, EngineEvent, EngineHandle, EventSink, FailureKind, FetchError, Generation,
    Method, RequestSeq, RequestTarget,
};
use telemetry_logging::{telemetry_debug, telemetry_info, telemetry_warn};

use super::app::AppEvent;

/// Forwards engine events into the app's single event queue.
pub struct AppEventSink {
    tx: mpsc::Sender<AppEvent>,
}

impl AppEventSink {
    pub fn new(tx: mpsc::Sender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for AppEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(AppEvent::Engine(event));
    }
}

/// Executes core effects against the engine and the selection store, and
/// turns engine events back into messages.
pub struct EffectRunner<S: KeyValueStore> {
    engine: EngineHandle,
    bridge: SelectionBridge<S>,
    /// Engine generation of the current page. Events tagged with an older
    /// one belong to a page that has since been left.
    generation: Generation,
    /// Fetches issued by the current page.
    issued: HashSet<(String, RequestSeq)>,
}

impl<S: KeyValueStore> EffectRunner<S> {
    pub fn new(engine: EngineHandle, bridge: SelectionBridge<S>) -> Self {
        Self {
            generation: engine.generation(),
            engine,
            bridge,
            issued: HashSet::new(),
        }
    }

    /// Runs `effects` in order. Returns the page to load when one of them
    /// navigates away.
    pub fn run(&mut self, effects: Vec<Effect>) -> Option<PageKind> {
        let mut navigate = None;
        for effect in effects {
            match effect {
                Effect::StartPolling {
                    channel,
                    interval_ms,
                } => {
                    self.engine
                        .start_polling(channel.as_str(), Duration::from_millis(interval_ms));
                }
                Effect::StopPolling { channel } => self.engine.stop_polling(channel.as_str()),
                Effect::Fetch {
                    channel,
                    seq,
                    request,
                } => {
                    telemetry_info!("fetch {channel}#{seq} {}", request.path_and_query());
                    self.issued.insert((channel.as_str().to_string(), seq));
                    self.engine.fetch(channel.as_str(), seq, to_target(&request));
                }
                Effect::Post { request } => {
                    telemetry_info!("post {}", request.path);
                    self.engine.post(to_target(&request));
                }
                Effect::WriteSelection { asset_id } => {
                    match self.bridge.set_selection(&asset_id) {
                        Ok(()) => telemetry_info!("selection written: {asset_id}"),
                        Err(err) => telemetry_warn!("cannot write selection {asset_id}: {err}"),
                    }
                }
                Effect::Navigate { page } => navigate = Some(page),
            }
        }
        navigate
    }

    /// Reads and clears the hand-over left by the previous page.
    pub fn consume_selection(&mut self) -> Option<String> {
        match self.bridge.consume_selection() {
            Ok(selection) => {
                telemetry_info!("selection consumed: {:?}", selection);
                selection
            }
            Err(err) => {
                telemetry_warn!("cannot read selection: {err}");
                None
            }
        }
    }

    /// Stops the timers and cancels the fetches of the page being left.
    /// Sequence numbers restart with the next page, so its events are told
    /// apart by generation.
    pub fn reset_page(&mut self) {
        self.issued.clear();
        self.generation = self.engine.begin_generation();
    }

    pub fn to_msg(&mut self, event: EngineEvent) -> Option<Msg> {
        match event {
            EngineEvent::RefreshDue {
                channel,
                generation,
            } => {
                if generation != self.generation {
                    telemetry_debug!("dropping {channel} tick from generation {generation}");
                    return None;
                }
                Some(Msg::RefreshDue {
                    channel: ChannelId::new(channel),
                })
            }
            EngineEvent::FetchCompleted {
                channel,
                seq,
                generation,
                result,
            } => {
                if generation != self.generation {
                    telemetry_debug!(
                        "dropping completion {channel}#{seq} from generation {generation}"
                    );
                    return None;
                }
                if !self.issued.remove(&(channel.clone(), seq)) {
                    telemetry_debug!("dropping completion {channel}#{seq} never issued");
                    return None;
                }
                if let Err(err) = &result {
                    telemetry_warn!("fetch {channel}#{seq} failed: {err}");
                }
                Some(Msg::FetchCompleted {
                    channel: ChannelId::new(channel),
                    seq,
                    result: to_sync_result(result),
                    received_at: Utc::now(),
                })
            }
            EngineEvent::PostCompleted { path, result } => {
                match result {
                    Ok(response) if response.json["success"] == true => {
                        telemetry_info!("post {path} done");
                    }
                    Ok(response) => telemetry_warn!("post {path} rejected: {}", response.json),
                    Err(err) => telemetry_warn!("post {path} failed: {err}"),
                }
                None
            }
        }
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

fn to_target(request: &ApiRequest) -> RequestTarget {
    RequestTarget {
        method: match request.method {
            HttpMethod::Get => Method::Get,
            HttpMethod::Post => Method::Post,
        },
        path_and_query: request.path_and_query(),
        body: request.body.clone(),
    }
}

fn to_sync_result(result: Result<ApiResponse, FetchError>) -> Result<ApiBody, SyncFailure> {
    match result {
        Ok(response) => Ok(ApiBody {
            status: response.status,
            json: response.json,
        }),
        Err(err) => Err(to_sync_failure(err)),
    }
}

fn to_sync_failure(err: FetchError) -> SyncFailure {
    match err.kind {
        FailureKind::Timeout => SyncFailure::Timeout,
        FailureKind::Cancelled => SyncFailure::Cancelled,
        FailureKind::HttpStatus(code) => SyncFailure::HttpStatus(code),
        FailureKind::Malformed => SyncFailure::Malformed(err.message),
        FailureKind::TooLarge { .. } => SyncFailure::Malformed(err.kind.to_string()),
        FailureKind::InvalidUrl | FailureKind::Network => SyncFailure::Transport(err.message),
    }
}
