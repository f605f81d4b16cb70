use telemetry_core::{update, AppState, ChannelId, Effect, Msg, PageKind, PageSettings};

fn search_page() -> AppState {
    AppState::new(PageSettings::default_for(PageKind::Search))
}

#[test]
fn navigating_to_the_current_page_does_nothing() {
    let state = search_page();
    let (next, effects) = update(state.clone(), Msg::NavigateTo(PageKind::Search));

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn blank_view_request_does_not_navigate() {
    let (mut next, effects) = update(
        search_page(),
        Msg::ViewOnDashboard {
            asset_id: "   ".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}

#[test]
fn closing_the_page_stops_every_bound_timer() {
    let (_, effects) = update(search_page(), Msg::PageClosed);

    assert_eq!(
        effects,
        vec![
            Effect::StopPolling {
                channel: ChannelId::search(),
            },
            Effect::StopPolling {
                channel: ChannelId::new("stats"),
            },
        ]
    );
}

#[test]
fn view_on_dashboard_hands_over_then_navigates() {
    let (_, effects) = update(
        search_page(),
        Msg::ViewOnDashboard {
            asset_id: " well_07 ".to_string(),
        },
    );

    assert_eq!(
        effects.last(),
        Some(&Effect::Navigate {
            page: PageKind::Dashboard,
        })
    );
    assert!(effects.contains(&Effect::WriteSelection {
        asset_id: "well_07".to_string(),
    }));
}
