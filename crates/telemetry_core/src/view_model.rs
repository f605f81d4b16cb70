use chrono::{DateTime, Utc};

use crate::{
    AssetRecord, ChannelId, CommandEvent, CommandStats, FilterField, PageKind, SessionMetrics,
    SortOrder,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub page: PageKind,
    pub query_term: String,
    pub sort: SortOrder,
    pub filters: Vec<FilterView>,
    pub selected_asset: Option<String>,
    pub panels: Vec<PanelView>,
    pub command_logs: Vec<CommandLogView>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn panel(&self, channel: &str) -> Option<&PanelView> {
        self.panels.iter().find(|p| p.channel.as_str() == channel)
    }

    pub fn command_log(&self, channel: &str) -> Option<&CommandLogView> {
        self.command_logs
            .iter()
            .find(|log| log.channel.as_str() == channel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOptions {
    Pending,
    Available(Vec<String>),
    /// The backend cannot offer values for this field; it is left out of searches.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterView {
    pub field: FilterField,
    pub value: Option<String>,
    pub options: FilterOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    Idle,
    Loading,
    Ready,
    /// Error indicator; the last good content is still shown alongside it.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub channel: ChannelId,
    pub status: PanelStatus,
    pub content: PanelContent,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Waiting,
    NoAssetsFound,
    Assets {
        rows: Vec<AssetRecord>,
        total: u64,
        count: u64,
    },
    NoSessions,
    Sessions(Vec<SessionRow>),
    Metrics(SessionMetrics),
    Stats(CommandStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub session_id: String,
    pub user: String,
    pub role: Option<String>,
    pub activity: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogView {
    pub channel: ChannelId,
    /// Newest first.
    pub entries: Vec<CommandEvent>,
    /// Cumulative counts, sorted by kind.
    pub counts: Vec<(String, u64)>,
    pub total: u64,
    pub capacity: usize,
}
