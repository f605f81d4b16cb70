use crate::{ApiRequest, ChannelId, PageKind, RequestSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// (Re)start the channel's timer; an existing timer for it is replaced.
    StartPolling { channel: ChannelId, interval_ms: u64 },
    StopPolling { channel: ChannelId },
    /// Issue a tagged fetch; its completion comes back as `Msg::FetchCompleted`.
    Fetch {
        channel: ChannelId,
        seq: RequestSeq,
        request: ApiRequest,
    },
    /// Fire-and-forget backend call.
    Post { request: ApiRequest },
    WriteSelection { asset_id: String },
    Navigate { page: PageKind },
}
