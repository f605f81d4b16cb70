//! Telemetry engine: HTTP client, polling timers and effect execution.
mod engine;
mod fetch;
mod persist;
mod scheduler;
mod types;

pub use engine::{ChannelEventSink, EngineError, EngineHandle, EventSink};
pub use fetch::{ApiClient, FetchSettings, ReqwestApiClient};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use scheduler::{PollScheduler, RefreshAction, ScheduleError};
pub use types::{
    ApiResponse, EngineEvent, FailureKind, FetchError, Generation, Method, RequestSeq,
    RequestTarget,
};
