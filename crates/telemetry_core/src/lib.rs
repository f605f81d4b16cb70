//! Telemetry core: pure state machine for the live dashboard pages.
mod api;
mod bindings;
mod channel;
mod command_log;
mod effect;
mod msg;
mod query;
mod selection;
mod sequence;
mod state;
mod update;
mod view_model;

pub use api::{
    clear_history_request, reading_text, ApiBody, ApiRequest, AssetRecord, CommandStats,
    HttpMethod, Payload, RequestSpec, SearchResults, SessionMetrics, SessionProfile,
    SessionRecord, SyncFailure,
};
pub use bindings::{
    BindingError, ChannelBinding, ChannelSource, PageBindings, PageKind, PageSettings,
};
pub use channel::ChannelId;
pub use command_log::{CommandEvent, CommandLog, CommandLogTracker, DEFAULT_LOG_CAPACITY};
pub use effect::Effect;
pub use msg::Msg;
pub use query::{FilterField, SearchQuery, SortOrder, DEFAULT_SEARCH_LIMIT};
pub use selection::{
    KeyValueStore, MemoryStore, SelectionBridge, SelectionError, SELECTION_KEY,
};
pub use sequence::{Admission, ChannelSequencer, RequestSeq};
pub use state::{AppState, Completion};
pub use update::update;
pub use view_model::{
    AppViewModel, CommandLogView, FilterOptions, FilterView, PanelContent, PanelStatus,
    PanelView, SessionRow,
};
