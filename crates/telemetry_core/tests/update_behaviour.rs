use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use telemetry_core::{
    update, ApiBody, ApiRequest, AppState, ChannelId, Effect, FilterField, FilterOptions, HttpMethod,
    Msg, PageKind, PageSettings, PanelContent, PanelStatus, RequestSeq, SortOrder, SyncFailure,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(telemetry_logging::initialize_for_tests);
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn ok(json: Value) -> Result<ApiBody, SyncFailure> {
    Ok(ApiBody { status: 200, json })
}

fn fetches(effects: &[Effect], channel: &str) -> Vec<(RequestSeq, ApiRequest)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Fetch {
                channel: c,
                seq,
                request,
            } if c.as_str() == channel => Some((*seq, request.clone())),
            _ => None,
        })
        .collect()
}

fn complete(
    state: AppState,
    channel: &str,
    seq: RequestSeq,
    result: Result<ApiBody, SyncFailure>,
) -> AppState {
    let (state, effects) = update(
        state,
        Msg::FetchCompleted {
            channel: ChannelId::new(channel),
            seq,
            result,
            received_at: at(seq as i64),
        },
    );
    assert!(effects.is_empty());
    state
}

fn loaded_search_page() -> (AppState, Vec<Effect>) {
    update(
        AppState::new(PageSettings::default_for(PageKind::Search)),
        Msg::PageLoaded { selection: None },
    )
}

fn assets(names: &[&str]) -> Value {
    let rows: Vec<Value> = names
        .iter()
        .map(|name| json!({ "id": name.to_lowercase(), "name": name, "type": "pump" }))
        .collect();
    json!({ "success": true, "assets": rows, "total": names.len(), "count": names.len() })
}

#[test]
fn page_load_requests_suggestions_then_starts_timers() {
    init_logging();
    let (mut state, effects) = loaded_search_page();

    let suggestion_paths: Vec<_> = FilterField::ALL
        .iter()
        .flat_map(|field| fetches(&effects, ChannelId::suggestions(*field).as_str()))
        .map(|(_, request)| request.path_and_query())
        .collect();
    assert_eq!(
        suggestion_paths,
        vec![
            "/api/search/suggestions?field=type",
            "/api/search/suggestions?field=manufacturer",
            "/api/search/suggestions?field=status",
            "/api/search/suggestions?field=region",
        ]
    );
    assert_eq!(
        effects[4..].to_vec(),
        vec![
            Effect::StartPolling {
                channel: ChannelId::search(),
                interval_ms: 5_000
            },
            Effect::StartPolling {
                channel: ChannelId::new("stats"),
                interval_ms: 3_000
            },
        ]
    );
    assert!(state.is_loaded());
    assert!(state.consume_dirty());
}

#[test]
fn pump_compressor_search_with_no_hits_shows_empty_message() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, effects) = update(state, Msg::QueryChanged("pump".to_string()));
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::FilterChanged {
            field: FilterField::Type,
            value: "compressor".to_string(),
        },
    );
    let search = fetches(&effects, "search");
    assert_eq!(search.len(), 1);
    let (seq, request) = &search[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(
        request.path_and_query(),
        "/api/search/assets?q=pump&type=compressor&limit=50"
    );

    let state = complete(
        state,
        "search",
        *seq,
        ok(json!({
            "success": true,
            "assets": [],
            "total": 0,
            "count": 0,
            "query": "(pump) @type:{compressor}",
            "filters": { "type": "compressor" }
        })),
    );

    let view = state.view();
    let panel = view.panel("search").unwrap();
    assert_eq!(panel.status, PanelStatus::Ready);
    assert_eq!(panel.content, PanelContent::NoAssetsFound);
    let log = view.command_log("search").unwrap();
    assert_eq!(log.total, 1);
    assert_eq!(log.counts, vec![("ft_search".to_string(), 1)]);
}

#[test]
fn enter_submits_even_without_filter_changes() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, _) = update(state, Msg::QueryChanged("  valve ".to_string()));
    let (_state, effects) = update(state, Msg::SearchSubmitted);

    let search = fetches(&effects, "search");
    assert_eq!(
        search[0].1.path_and_query(),
        "/api/search/assets?q=valve&limit=50"
    );
}

#[test]
fn missing_backend_field_disables_filter_silently() {
    init_logging();
    let (state, effects) = loaded_search_page();
    let (region_seq, _) = fetches(&effects, "suggestions.region")[0].clone();
    let (type_seq, _) = fetches(&effects, "suggestions.type")[0].clone();

    let state = complete(
        state,
        "suggestions.region",
        region_seq,
        Ok(ApiBody {
            status: 400,
            json: json!({ "success": false, "error": "Field region is not available for suggestions" }),
        }),
    );
    let state = complete(
        state,
        "suggestions.type",
        type_seq,
        ok(json!({ "success": true, "field": "type", "suggestions": ["compressor", "pump"] })),
    );

    let (state, _) = update(
        state,
        Msg::FilterChanged {
            field: FilterField::Type,
            value: "pump".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::FilterChanged {
            field: FilterField::Region,
            value: "north".to_string(),
        },
    );

    let search = fetches(&effects, "search");
    assert_eq!(
        search[0].1.path_and_query(),
        "/api/search/assets?type=pump&limit=50"
    );

    let view = state.view();
    let region = view
        .filters
        .iter()
        .find(|f| f.field == FilterField::Region)
        .unwrap();
    assert!(matches!(region.options, FilterOptions::Unavailable(_)));
    let kind = view
        .filters
        .iter()
        .find(|f| f.field == FilterField::Type)
        .unwrap();
    assert_eq!(
        kind.options,
        FilterOptions::Available(vec!["compressor".to_string(), "pump".to_string()])
    );
    // No error banner on any panel.
    assert!(view
        .panels
        .iter()
        .all(|p| !matches!(p.status, PanelStatus::Failed(_))));
    // Suggestion lookups count as search-channel activity.
    assert_eq!(
        view.command_log("search").unwrap().counts,
        vec![("ft_tagvals".to_string(), 1)]
    );
}

#[test]
fn failure_keeps_previous_rows_and_shows_error() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, effects) = update(state, Msg::SearchSubmitted);
    let (first, _) = fetches(&effects, "search")[0].clone();
    let state = complete(state, "search", first, ok(assets(&["Pump A", "Pump B"])));

    let (state, effects) = update(
        state,
        Msg::RefreshDue {
            channel: ChannelId::search(),
        },
    );
    let (second, _) = fetches(&effects, "search")[0].clone();
    let state = complete(
        state,
        "search",
        second,
        Err(SyncFailure::Transport("connection refused".to_string())),
    );

    let view = state.view();
    let panel = view.panel("search").unwrap();
    assert_eq!(
        panel.status,
        PanelStatus::Failed("network error: connection refused".to_string())
    );
    let PanelContent::Assets { rows, .. } = &panel.content else {
        panic!("previous rows should stay visible");
    };
    assert_eq!(rows.len(), 2);
    // Failures record no backend commands.
    assert_eq!(view.command_log("search").unwrap().total, 1);
}

#[test]
fn application_failure_shows_server_text() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, effects) = update(state, Msg::SearchSubmitted);
    let (seq, _) = fetches(&effects, "search")[0].clone();
    let state = complete(
        state,
        "search",
        seq,
        Ok(ApiBody {
            status: 500,
            json: json!({ "success": false, "error": "Unknown index name" }),
        }),
    );

    assert_eq!(
        state.view().panel("search").unwrap().status,
        PanelStatus::Failed("backend error: Unknown index name".to_string())
    );
}

#[test]
fn sort_change_reorders_without_fetching() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, effects) = update(state, Msg::SearchSubmitted);
    let (seq, _) = fetches(&effects, "search")[0].clone();
    let state = complete(state, "search", seq, ok(assets(&["Valve", "Compressor", "pump"])));

    let (state, effects) = update(state, Msg::SortChanged(SortOrder::Name));
    assert!(effects.is_empty());

    let view = state.view();
    let PanelContent::Assets { rows, .. } = &view.panel("search").unwrap().content else {
        panic!("expected rows");
    };
    let names: Vec<_> = rows.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["Compressor", "pump", "Valve"]);
    assert_eq!(view.sort, SortOrder::Name);
}

#[test]
fn reset_clears_controls_and_log_then_searches() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, _) = update(state, Msg::QueryChanged("pump".to_string()));
    let (state, effects) = update(
        state,
        Msg::FilterChanged {
            field: FilterField::Status,
            value: "alarm".to_string(),
        },
    );
    let (seq, _) = fetches(&effects, "search")[0].clone();
    let state = complete(state, "search", seq, ok(assets(&["Pump A"])));
    assert_eq!(state.view().command_log("search").unwrap().total, 1);

    let (state, effects) = update(state, Msg::ResetClicked);

    let view = state.view();
    assert_eq!(view.query_term, "");
    assert!(view.filters.iter().all(|f| f.value.is_none()));
    assert_eq!(view.command_log("search").unwrap().total, 0);
    assert!(view.command_log("search").unwrap().counts.is_empty());
    assert_eq!(
        fetches(&effects, "search")[0].1.path_and_query(),
        "/api/search/assets?limit=50"
    );
    // Remote clearing is off by default.
    assert!(!effects.iter().any(|e| matches!(e, Effect::Post { .. })));
}

#[test]
fn clear_log_posts_to_backend_when_configured() {
    init_logging();
    let mut settings = PageSettings::default_for(PageKind::Search);
    settings.clear_remote_history = true;
    let (state, _) = update(AppState::new(settings), Msg::PageLoaded { selection: None });

    let (mut state, effects) = update(
        state,
        Msg::ClearLogClicked {
            channel: ChannelId::search(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::Post {
            request: telemetry_core::clear_history_request("search"),
        }]
    );
    assert!(state.consume_dirty());
}

#[test]
fn view_on_dashboard_writes_selection_and_navigates() {
    init_logging();
    let (state, _) = loaded_search_page();

    let (_state, effects) = update(
        state,
        Msg::ViewOnDashboard {
            asset_id: " well_07 ".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::StopPolling {
                channel: ChannelId::search()
            },
            Effect::StopPolling {
                channel: ChannelId::new("stats")
            },
            Effect::WriteSelection {
                asset_id: "well_07".to_string()
            },
            Effect::Navigate {
                page: PageKind::Dashboard
            },
        ]
    );
}

#[test]
fn blank_view_on_dashboard_is_ignored() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (_state, effects) = update(
        state,
        Msg::ViewOnDashboard {
            asset_id: "  ".to_string(),
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn command_stats_panel_shows_backend_counts() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (state, effects) = update(
        state,
        Msg::RefreshDue {
            channel: ChannelId::new("stats"),
        },
    );
    let (seq, request) = fetches(&effects, "stats")[0].clone();
    assert_eq!(request.path_and_query(), "/api/redis/stats?context=search");

    let state = complete(
        state,
        "stats",
        seq,
        ok(json!({
            "success": true,
            "stats": { "read_count": 7, "write_count": 2, "total_count": 9 },
            "context": "search"
        })),
    );

    let view = state.view();
    let PanelContent::Stats(stats) = &view.panel("stats").unwrap().content else {
        panic!("expected stats");
    };
    assert_eq!((stats.read_count, stats.write_count, stats.total_count), (7, 2, 9));
    assert_eq!(view.command_log("stats").unwrap().total, 1);
}

#[test]
fn unbound_channel_tick_is_ignored() {
    init_logging();
    let (state, _) = loaded_search_page();
    let (_state, effects) = update(
        state,
        Msg::RefreshDue {
            channel: ChannelId::session(),
        },
    );
    assert!(effects.is_empty());
}
