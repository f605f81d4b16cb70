use crate::{AppState, ChannelId, ChannelSource, Effect, Msg, PageKind, RequestSpec};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::PageLoaded { selection } => {
            // Re-initialization restarts timers rather than adding new ones;
            // the scheduler replaces an existing timer per channel.
            if state.page() == PageKind::Dashboard {
                state.select_asset(selection);
            }
            let filters = state.settings().bindings.filters.clone();
            let bindings = state.settings().bindings.channels.clone();

            let mut effects = Vec::with_capacity(filters.len() + bindings.len());
            for field in filters {
                effects.push(state.issue(
                    &ChannelId::suggestions(field),
                    RequestSpec::Suggestions(field),
                ));
            }
            for binding in bindings {
                effects.push(Effect::StartPolling {
                    channel: binding.channel,
                    interval_ms: binding.interval_ms,
                });
            }
            state.mark_loaded();
            state.mark_dirty();
            effects
        }
        Msg::QueryChanged(term) => {
            state.set_term(term);
            Vec::new()
        }
        Msg::SearchSubmitted => search(&mut state),
        Msg::FilterChanged { field, value } => {
            if state.set_filter(field, &value) {
                search(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::SortChanged(order) => {
            // Client-side only: the stored results are re-sorted on render.
            state.set_sort(order);
            Vec::new()
        }
        Msg::ResetClicked => match state.channel_for(&ChannelSource::SearchResults) {
            Some(channel) => {
                state.reset_query();
                let mut effects = state.clear_log(&channel);
                effects.extend(search(&mut state));
                effects
            }
            None => Vec::new(),
        },
        Msg::ClearLogClicked { channel } => state.clear_log(&channel),
        Msg::ViewOnDashboard { asset_id } => {
            let asset_id = asset_id.trim().to_string();
            if asset_id.is_empty() || state.page() == PageKind::Dashboard {
                Vec::new()
            } else {
                let mut effects = stop_all(&state);
                effects.push(Effect::WriteSelection { asset_id });
                effects.push(Effect::Navigate {
                    page: PageKind::Dashboard,
                });
                effects
            }
        }
        Msg::AssetSelected { asset_id } => {
            if state.page() != PageKind::Dashboard {
                Vec::new()
            } else {
                state.select_asset(asset_id);
                match state.channel_for(&ChannelSource::Sessions) {
                    Some(channel) => state.refresh(&channel).into_iter().collect(),
                    None => Vec::new(),
                }
            }
        }
        Msg::NavigateTo(page) => {
            if page == state.page() {
                Vec::new()
            } else {
                let mut effects = stop_all(&state);
                effects.push(Effect::Navigate { page });
                effects
            }
        }
        Msg::RefreshDue { channel } => state.refresh(&channel).into_iter().collect(),
        Msg::FetchCompleted {
            channel,
            seq,
            result,
            received_at,
        } => {
            state.apply_completion(&channel, seq, result, received_at);
            Vec::new()
        }
        Msg::PageClosed => stop_all(&state),
    };

    (state, effects)
}

/// User-initiated search outside the timer cadence. Shares the search
/// channel's sequence so an older periodic refresh cannot overwrite it.
fn search(state: &mut AppState) -> Vec<Effect> {
    match state.channel_for(&ChannelSource::SearchResults) {
        Some(channel) => state.refresh(&channel).into_iter().collect(),
        None => Vec::new(),
    }
}

fn stop_all(state: &AppState) -> Vec<Effect> {
    state
        .settings()
        .bindings
        .channels
        .iter()
        .map(|binding| Effect::StopPolling {
            channel: binding.channel.clone(),
        })
        .collect()
}
