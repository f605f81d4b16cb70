use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::api::clear_history_request;
use crate::view_model::{
    AppViewModel, CommandLogView, FilterOptions, FilterView, PanelContent, PanelStatus, PanelView,
    SessionRow,
};
use crate::{
    Admission, ApiBody, ChannelId, ChannelSequencer, ChannelSource, CommandLogTracker,
    CommandStats, Effect, FilterField, PageKind, PageSettings, Payload, RequestSeq, RequestSpec,
    SearchQuery, SearchResults, SessionMetrics, SessionRecord, SortOrder, SyncFailure,
};

#[derive(Debug, Clone, PartialEq, Default)]
enum PanelBody {
    #[default]
    Empty,
    Assets(SearchResults),
    Sessions(Vec<SessionRecord>),
    Metrics(SessionMetrics),
    Stats(CommandStats),
}

#[derive(Debug, Clone, PartialEq)]
struct Panel {
    status: PanelStatus,
    body: PanelBody,
    updated_at: Option<DateTime<Utc>>,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            status: PanelStatus::Idle,
            body: PanelBody::Empty,
            updated_at: None,
        }
    }
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed(SyncFailure),
    /// Filter options could not be loaded; the filter is disabled, not an error.
    Degraded(FilterField),
    Stale,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    settings: PageSettings,
    query: SearchQuery,
    filter_options: BTreeMap<FilterField, FilterOptions>,
    selected_asset: Option<String>,
    panels: BTreeMap<ChannelId, Panel>,
    sequencers: BTreeMap<ChannelId, ChannelSequencer>,
    tracker: CommandLogTracker,
    stale_discards: u64,
    loaded: bool,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(PageSettings::default_for(PageKind::Search))
    }
}

impl AppState {
    pub fn new(settings: PageSettings) -> Self {
        let panels = settings
            .bindings
            .channels
            .iter()
            .map(|binding| (binding.channel.clone(), Panel::default()))
            .collect();
        let filter_options = settings
            .bindings
            .filters
            .iter()
            .map(|field| (*field, FilterOptions::Pending))
            .collect();
        Self {
            query: SearchQuery::new(settings.search_limit),
            tracker: CommandLogTracker::new(settings.log_capacity),
            settings,
            filter_options,
            selected_asset: None,
            panels,
            sequencers: BTreeMap::new(),
            stale_discards: 0,
            loaded: false,
            dirty: false,
        }
    }

    pub fn page(&self) -> PageKind {
        self.settings.page()
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn selected_asset(&self) -> Option<&str> {
        self.selected_asset.as_deref()
    }

    pub fn tracker(&self) -> &CommandLogTracker {
        &self.tracker
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Completions dropped because a newer result had already been applied.
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    pub fn sequencer(&self, channel: &ChannelId) -> Option<&ChannelSequencer> {
        self.sequencers.get(channel)
    }

    /// Returns whether a render is due and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub(crate) fn set_term(&mut self, term: String) {
        if self.query.term != term {
            self.query.term = term;
            self.mark_dirty();
        }
    }

    /// Returns false when the page exposes no control for `field`.
    pub(crate) fn set_filter(&mut self, field: FilterField, value: &str) -> bool {
        if !self.settings.bindings.filters.contains(&field) {
            return false;
        }
        self.query.set_filter(field, value);
        self.mark_dirty();
        true
    }

    pub(crate) fn set_sort(&mut self, sort: SortOrder) {
        if self.query.sort != sort {
            self.query.sort = sort;
            self.mark_dirty();
        }
    }

    pub(crate) fn reset_query(&mut self) {
        self.query = SearchQuery::new(self.settings.search_limit);
        self.mark_dirty();
    }

    pub(crate) fn select_asset(&mut self, asset_id: Option<String>) {
        let asset_id = asset_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if self.selected_asset != asset_id {
            self.selected_asset = asset_id;
            self.mark_dirty();
        }
    }

    pub(crate) fn channel_for(&self, source: &ChannelSource) -> Option<ChannelId> {
        self.settings.bindings.channel_for(source).cloned()
    }

    /// Search query as sent: filters without a control or without backend
    /// support are left out.
    pub(crate) fn effective_query(&self) -> SearchQuery {
        let mut query = self.query.clone();
        query.filters.retain(|field, _| {
            !matches!(
                self.filter_options.get(field),
                None | Some(FilterOptions::Unavailable(_))
            )
        });
        query
    }

    fn request_for(&self, source: &ChannelSource) -> RequestSpec {
        match source {
            ChannelSource::SearchResults => RequestSpec::SearchAssets(self.effective_query()),
            ChannelSource::Sessions => match &self.selected_asset {
                Some(asset_id) => RequestSpec::AssetSessions(asset_id.clone()),
                None => RequestSpec::Sessions,
            },
            ChannelSource::SessionMetrics => RequestSpec::SessionMetrics,
            ChannelSource::CommandStats { context } => RequestSpec::CommandStats {
                context: context.clone(),
            },
        }
    }

    /// Tags a request on `channel` and returns the fetch to run.
    pub(crate) fn issue(&mut self, channel: &ChannelId, request: RequestSpec) -> Effect {
        let api_request = request.to_api_request();
        let seq = self
            .sequencers
            .entry(channel.clone())
            .or_default()
            .issue(request);
        if let Some(panel) = self.panels.get_mut(channel) {
            if panel.status == PanelStatus::Idle {
                panel.status = PanelStatus::Loading;
                self.dirty = true;
            }
        }
        Effect::Fetch {
            channel: channel.clone(),
            seq,
            request: api_request,
        }
    }

    /// Fetch for a bound channel built from the current controls; `None` for
    /// channels this page does not bind.
    pub(crate) fn refresh(&mut self, channel: &ChannelId) -> Option<Effect> {
        let source = self.settings.bindings.binding(channel)?.source.clone();
        let request = self.request_for(&source);
        Some(self.issue(channel, request))
    }

    /// Clears a channel's command log, plus the backend's copy when configured.
    pub(crate) fn clear_log(&mut self, channel: &ChannelId) -> Vec<Effect> {
        self.tracker.clear(channel);
        self.mark_dirty();
        if !self.settings.clear_remote_history {
            return Vec::new();
        }
        let context = match self.settings.bindings.binding(channel).map(|b| &b.source) {
            Some(ChannelSource::SearchResults) => "search".to_string(),
            Some(ChannelSource::Sessions | ChannelSource::SessionMetrics) => "session".to_string(),
            Some(ChannelSource::CommandStats { context }) => context.clone(),
            None => channel.as_str().to_string(),
        };
        vec![Effect::Post {
            request: clear_history_request(&context),
        }]
    }

    pub(crate) fn apply_completion(
        &mut self,
        channel: &ChannelId,
        seq: RequestSeq,
        result: Result<ApiBody, SyncFailure>,
        received_at: DateTime<Utc>,
    ) -> Completion {
        let admission = match self.sequencers.get_mut(channel) {
            Some(sequencer) => sequencer.admit(seq),
            None => Admission::Unknown,
        };
        let request = match admission {
            Admission::Fresh(request) => request,
            Admission::Stale => {
                self.stale_discards += 1;
                return Completion::Stale;
            }
            Admission::Unknown => return Completion::Unknown,
        };

        let decoded = result.and_then(|body| request.decode(&body));
        self.mark_dirty();

        if let RequestSpec::Suggestions(field) = request {
            return match decoded {
                Ok(payload) => {
                    let log_channel = self
                        .channel_for(&ChannelSource::SearchResults)
                        .unwrap_or_else(ChannelId::search);
                    for kind in request.inferred_kinds(&payload) {
                        self.tracker.record(&log_channel, kind, received_at);
                    }
                    if let Payload::Suggestions { values, .. } = payload {
                        self.filter_options
                            .insert(field, FilterOptions::Available(values));
                    }
                    Completion::Applied
                }
                Err(failure) => {
                    self.filter_options
                        .insert(field, FilterOptions::Unavailable(failure.to_string()));
                    Completion::Degraded(field)
                }
            };
        }

        match decoded {
            Ok(payload) => {
                for kind in request.inferred_kinds(&payload) {
                    self.tracker.record(channel, kind, received_at);
                }
                let panel = self.panels.entry(channel.clone()).or_default();
                panel.status = PanelStatus::Ready;
                panel.updated_at = Some(received_at);
                panel.body = match payload {
                    Payload::Assets(results) => PanelBody::Assets(results),
                    Payload::Sessions(sessions) => PanelBody::Sessions(sessions),
                    Payload::Metrics(metrics) => PanelBody::Metrics(metrics),
                    Payload::Stats(stats) => PanelBody::Stats(stats),
                    Payload::Suggestions { .. } => PanelBody::Empty,
                };
                Completion::Applied
            }
            Err(failure) => {
                let panel = self.panels.entry(channel.clone()).or_default();
                panel.status = PanelStatus::Failed(failure.to_string());
                Completion::Failed(failure)
            }
        }
    }

    pub fn view(&self) -> AppViewModel {
        let filters = self
            .settings
            .bindings
            .filters
            .iter()
            .map(|field| FilterView {
                field: *field,
                value: self.query.filter(*field).map(str::to_string),
                options: self
                    .filter_options
                    .get(field)
                    .cloned()
                    .unwrap_or(FilterOptions::Pending),
            })
            .collect();

        let panels = self
            .settings
            .bindings
            .channels
            .iter()
            .map(|binding| {
                let panel = self.panels.get(&binding.channel).cloned().unwrap_or_default();
                PanelView {
                    channel: binding.channel.clone(),
                    content: self.panel_content(&panel.body),
                    status: panel.status,
                    updated_at: panel.updated_at,
                }
            })
            .collect();

        let command_logs = self
            .settings
            .bindings
            .channels
            .iter()
            .map(|binding| self.command_log_view(&binding.channel))
            .collect();

        AppViewModel {
            page: self.page(),
            query_term: self.query.term.clone(),
            sort: self.query.sort,
            filters,
            selected_asset: self.selected_asset.clone(),
            panels,
            command_logs,
            dirty: self.dirty,
        }
    }

    fn panel_content(&self, body: &PanelBody) -> PanelContent {
        match body {
            PanelBody::Empty => PanelContent::Waiting,
            PanelBody::Assets(results) if results.count == 0 || results.assets.is_empty() => {
                PanelContent::NoAssetsFound
            }
            PanelBody::Assets(results) => {
                let mut rows = results.assets.clone();
                self.query.sort.sort(&mut rows);
                PanelContent::Assets {
                    rows,
                    total: results.total,
                    count: results.count,
                }
            }
            PanelBody::Sessions(sessions) if sessions.is_empty() => PanelContent::NoSessions,
            PanelBody::Sessions(sessions) => {
                PanelContent::Sessions(sessions.iter().map(session_row).collect())
            }
            PanelBody::Metrics(metrics) => PanelContent::Metrics(metrics.clone()),
            PanelBody::Stats(stats) => PanelContent::Stats(stats.clone()),
        }
    }

    fn command_log_view(&self, channel: &ChannelId) -> CommandLogView {
        match self.tracker.log(channel) {
            Some(log) => CommandLogView {
                channel: channel.clone(),
                entries: log.events().rev().cloned().collect(),
                counts: log
                    .counts_by_kind()
                    .iter()
                    .map(|(kind, count)| (kind.clone(), *count))
                    .collect(),
                total: log.total(),
                capacity: log.capacity(),
            },
            None => CommandLogView {
                channel: channel.clone(),
                entries: Vec::new(),
                counts: Vec::new(),
                total: 0,
                capacity: self.tracker.capacity(),
            },
        }
    }
}

fn session_row(session: &SessionRecord) -> SessionRow {
    let profile = session.profile().unwrap_or_default();
    SessionRow {
        session_id: session.session_id.clone().unwrap_or_else(|| "-".to_string()),
        user: profile
            .name
            .or_else(|| session.user_id.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        role: profile.role,
        activity: profile.activity,
        status: session.status.clone(),
    }
}
