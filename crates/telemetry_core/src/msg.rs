use chrono::{DateTime, Utc};

use crate::{ApiBody, ChannelId, FilterField, PageKind, RequestSeq, SortOrder, SyncFailure};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Page initialization, carrying the consumed cross-page selection.
    PageLoaded { selection: Option<String> },
    /// User edited the search box.
    QueryChanged(String),
    /// User pressed Enter in the search box.
    SearchSubmitted,
    /// User changed a categorical filter; a blank value clears it.
    FilterChanged { field: FilterField, value: String },
    SortChanged(SortOrder),
    /// Clear term, filters and the search log, then search again.
    ResetClicked,
    ClearLogClicked { channel: ChannelId },
    /// "View on dashboard" for a search result.
    ViewOnDashboard { asset_id: String },
    /// Dashboard asset picker; `None` shows all sessions.
    AssetSelected { asset_id: Option<String> },
    NavigateTo(PageKind),
    /// A channel's timer fired.
    RefreshDue { channel: ChannelId },
    /// A tagged fetch resolved, failed, timed out or was cancelled.
    FetchCompleted {
        channel: ChannelId,
        seq: RequestSeq,
        result: Result<ApiBody, SyncFailure>,
        received_at: DateTime<Utc>,
    },
    PageClosed,
}
