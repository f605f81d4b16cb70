use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use telemetry_core::{update, AppState, FilterField, Msg, PageKind, SelectionBridge};
use telemetry_engine::{EngineEvent, EngineHandle, ReqwestApiClient};
use telemetry_logging::{telemetry_debug, telemetry_info, telemetry_warn};

use super::effects::{AppEventSink, EffectRunner};
use super::input::{self, PageInput, HELP_DASHBOARD, HELP_SEARCH};
use super::render::render;
use super::selection_store::SessionFileStore;
use crate::config::DashboardConfig;

pub enum AppEvent {
    Input(String),
    InputClosed,
    Engine(EngineEvent),
}

/// Page to open and the controls it starts with.
#[derive(Debug, Clone, Default)]
pub struct Launch {
    pub page: Option<PageKind>,
    pub query: Option<String>,
    pub filters: Vec<(FilterField, String)>,
    pub asset: Option<String>,
}

pub fn run_app(config: DashboardConfig, launch: Launch, session_key: &str) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::channel();

    let client = ReqwestApiClient::new(&config.base_url, config.fetch_settings())
        .with_context(|| format!("cannot use backend at {}", config.base_url))?;
    let engine = EngineHandle::spawn(
        Arc::new(client),
        Arc::new(AppEventSink::new(event_tx.clone())),
    )?;
    let store = SessionFileStore::for_session(session_key);
    telemetry_info!("session store at {:?}", store.path());
    let runner = EffectRunner::new(engine, SelectionBridge::new(store));

    spawn_input_reader(event_tx);

    let mut app = App {
        config,
        runner,
        state: AppState::default(),
        notice: None,
        force_redraw: false,
    };
    let page = launch.page.unwrap_or(PageKind::Search);
    let result = app
        .start(page, launch)
        .and_then(|()| app.event_loop(&event_rx));
    app.runner.shutdown();
    result
}

fn spawn_input_reader(tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(AppEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    telemetry_warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
        let _ = tx.send(AppEvent::InputClosed);
    });
}

struct App {
    config: DashboardConfig,
    runner: EffectRunner<SessionFileStore>,
    state: AppState,
    /// Help text or the last input error, shown under the page.
    notice: Option<String>,
    force_redraw: bool,
}

impl App {
    fn start(&mut self, page: PageKind, launch: Launch) -> anyhow::Result<()> {
        self.load_page(page, launch.asset)?;
        if page == PageKind::Search {
            if let Some(term) = launch.query {
                self.dispatch(Msg::QueryChanged(term))?;
            }
            for (field, value) in launch.filters {
                self.dispatch(Msg::FilterChanged { field, value })?;
            }
        }
        self.redraw()
    }

    /// Tears down the current page and loads `page`, consuming any selection
    /// the previous page handed over.
    fn load_page(&mut self, page: PageKind, asset: Option<String>) -> anyhow::Result<()> {
        self.runner.reset_page();
        let settings = self.config.page_settings(page)?;
        settings
            .validate()
            .with_context(|| format!("invalid bindings for the {page} page"))?;

        let handed_over = self.runner.consume_selection();
        let selection = asset.or(handed_over);
        telemetry_info!("loading {page} page (selection: {:?})", selection);

        self.state = AppState::new(settings);
        self.dispatch(Msg::PageLoaded { selection })
    }

    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let state = std::mem::take(&mut self.state);
        let discarded = state.stale_discards();
        let completion = match &msg {
            Msg::FetchCompleted { channel, seq, .. } => Some(format!("{channel}#{seq}")),
            _ => None,
        };
        let (state, effects) = update(state, msg);
        self.state = state;
        if let Some(completion) = completion {
            if self.state.stale_discards() > discarded {
                telemetry_debug!("stale completion {completion} discarded");
            }
        }
        if let Some(page) = self.runner.run(effects) {
            self.load_page(page, None)?;
        }
        Ok(())
    }

    fn event_loop(&mut self, events: &mpsc::Receiver<AppEvent>) -> anyhow::Result<()> {
        while let Ok(event) = events.recv() {
            match event {
                AppEvent::Input(line) => match input::parse(self.state.page(), &line) {
                    Ok(Some(PageInput::Quit)) => break,
                    Ok(Some(PageInput::Help)) => {
                        self.notice = Some(match self.state.page() {
                            PageKind::Search => HELP_SEARCH.to_string(),
                            PageKind::Dashboard => HELP_DASHBOARD.to_string(),
                        });
                        self.force_redraw = true;
                    }
                    Ok(Some(page_input)) => {
                        self.notice = None;
                        let msgs = page_input.into_msgs(&self.state.settings().bindings);
                        for msg in msgs {
                            self.dispatch(msg)?;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        self.notice = Some(err.to_string());
                        self.force_redraw = true;
                    }
                },
                AppEvent::InputClosed => break,
                AppEvent::Engine(event) => {
                    if let Some(msg) = self.runner.to_msg(event) {
                        self.dispatch(msg)?;
                    }
                }
            }
            self.redraw()?;
        }
        self.dispatch(Msg::PageClosed)
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        let dirty = self.state.consume_dirty();
        let forced = std::mem::take(&mut self.force_redraw);
        if !dirty && !forced {
            return Ok(());
        }
        let view = self.state.view();
        let mut out = io::stdout().lock();
        if out.is_terminal() {
            write!(out, "\x1b[2J\x1b[H")?;
        }
        for line in render(&view) {
            writeln!(out, "{line}")?;
        }
        if let Some(notice) = &self.notice {
            writeln!(out)?;
            writeln!(out, "{notice}")?;
        }
        write!(out, "> ")?;
        out.flush()?;
        Ok(())
    }
}
