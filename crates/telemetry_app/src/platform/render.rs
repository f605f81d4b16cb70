use serde_json::Value;
use telemetry_core::{
    reading_text, AppViewModel, AssetRecord, CommandLogView, FilterOptions, FilterView, PageKind,
    PanelContent, PanelStatus, PanelView, SessionRow,
};

/// Most recent command log entries shown per channel.
pub const RECENT_COMMANDS: usize = 10;
const FILTER_OPTIONS_SHOWN: usize = 6;

pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    match view.page {
        PageKind::Search => {
            lines.push("=== Asset search ===".to_string());
            lines.push(format!(
                "query: \"{}\"  sort: {}",
                view.query_term,
                view.sort.label()
            ));
            for filter in &view.filters {
                lines.push(filter_line(filter));
            }
        }
        PageKind::Dashboard => {
            lines.push("=== Session dashboard ===".to_string());
            lines.push(format!(
                "asset: {}",
                view.selected_asset.as_deref().unwrap_or("all assets")
            ));
        }
    }

    for panel in &view.panels {
        lines.push(String::new());
        lines.push(panel_header(panel));
        lines.extend(panel_body(&panel.content));
    }

    for log in &view.command_logs {
        lines.push(String::new());
        lines.extend(command_log_lines(log));
    }
    lines
}

fn filter_line(filter: &FilterView) -> String {
    let value = filter.value.as_deref().unwrap_or("any");
    let options = match &filter.options {
        FilterOptions::Pending => "loading options".to_string(),
        FilterOptions::Available(values) if values.is_empty() => "no options".to_string(),
        FilterOptions::Available(values) => {
            let mut shown = values
                .iter()
                .take(FILTER_OPTIONS_SHOWN)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if values.len() > FILTER_OPTIONS_SHOWN {
                shown.push_str(&format!(", +{}", values.len() - FILTER_OPTIONS_SHOWN));
            }
            shown
        }
        FilterOptions::Unavailable(_) => "unavailable".to_string(),
    };
    format!("  {:<13} {:<16} [{}]", filter.field.param(), value, options)
}

fn panel_header(panel: &PanelView) -> String {
    let status = match &panel.status {
        PanelStatus::Idle => "idle".to_string(),
        PanelStatus::Loading => "loading".to_string(),
        PanelStatus::Ready => "ok".to_string(),
        PanelStatus::Failed(reason) => format!("error: {reason}"),
    };
    match panel.updated_at {
        Some(at) => format!(
            "--- {} [{}] updated {} ---",
            panel.channel,
            status,
            at.format("%H:%M:%S")
        ),
        None => format!("--- {} [{}] ---", panel.channel, status),
    }
}

fn panel_body(content: &PanelContent) -> Vec<String> {
    match content {
        PanelContent::Waiting => vec!["  waiting for data".to_string()],
        PanelContent::NoAssetsFound => vec!["  No assets found".to_string()],
        PanelContent::Assets { rows, total, count } => {
            let mut lines = vec![format!("  showing {count} of {total} assets")];
            lines.extend(rows.iter().map(asset_line));
            lines
        }
        PanelContent::NoSessions => vec!["  No active sessions".to_string()],
        PanelContent::Sessions(rows) => rows.iter().map(session_line).collect(),
        PanelContent::Metrics(metrics) => {
            let average = metrics
                .avg_session_duration
                .map(|seconds| format!("{seconds:.0}s"))
                .unwrap_or_else(|| "-".to_string());
            vec![format!(
                "  active sessions: {}  unique users: {}  avg duration: {}",
                metrics.total_active_sessions, metrics.unique_users, average
            )]
        }
        PanelContent::Stats(stats) => vec![format!(
            "  reads: {}  writes: {}  total: {}",
            stats.read_count, stats.write_count, stats.total_count
        )],
    }
}

fn asset_line(asset: &AssetRecord) -> String {
    let text = |value: &Option<String>| value.as_deref().unwrap_or("-").to_string();
    let reading =
        |value: Option<&Value>| reading_text(value).unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<12} {:<24} {:<12} {:<14} {:<10} {:<8} temp={} pressure={} flow={}",
        text(&asset.id),
        text(&asset.name),
        text(&asset.asset_type),
        text(&asset.manufacturer),
        text(&asset.status),
        text(&asset.region),
        reading(asset.temperature.as_ref()),
        reading(asset.pressure.as_ref()),
        reading(asset.flow_rate.as_ref()),
    )
}

fn session_line(row: &SessionRow) -> String {
    let mut line = format!("  {:<14} {:<20}", row.session_id, row.user);
    if let Some(role) = &row.role {
        line.push_str(&format!(" {role}"));
    }
    if let Some(activity) = &row.activity {
        line.push_str(&format!(" ({activity})"));
    }
    if let Some(status) = &row.status {
        line.push_str(&format!(" [{status}]"));
    }
    line
}

fn command_log_lines(log: &CommandLogView) -> Vec<String> {
    let counts = log
        .counts
        .iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut lines = vec![format!(
        "--- {} commands: {} total {} ---",
        log.channel, log.total, counts
    )];
    lines.extend(log.entries.iter().take(RECENT_COMMANDS).map(|event| {
        format!(
            "  {} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.kind
        )
    }));
    lines
}
