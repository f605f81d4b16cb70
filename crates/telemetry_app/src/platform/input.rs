//! Line-oriented page controls read from stdin.
use telemetry_core::{ChannelId, ChannelSource, FilterField, Msg, PageBindings, PageKind, SortOrder};
use thiserror::Error;

pub const HELP_SEARCH: &str = "\
search page:
  <text>                 search for <text> (empty line searches everything)
  :type|:manufacturer|:status|:region [value]
                         set a filter, no value clears it
  :sort relevance|name|type|status
  :reset                 clear search box, filters, sort and command log
  :clear [channel]       clear a command log
  :view <asset id>       open the asset on the dashboard
  :dashboard             open the dashboard
  :help  :quit";

pub const HELP_DASHBOARD: &str = "\
dashboard page:
  :select <asset id>     show sessions for one asset
  :unselect              show all sessions
  :clear [channel]       clear a command log
  :search                back to the search page
  :help  :quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInput {
    Search(String),
    Filter(FilterField, String),
    Sort(SortOrder),
    Reset,
    Clear(Option<ChannelId>),
    View(String),
    Select(Option<String>),
    Navigate(PageKind),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command ':{0}', try :help")]
    UnknownCommand(String),
    #[error(":{command} is not available on the {page} page")]
    NotOnThisPage { command: String, page: PageKind },
    #[error(":{0} needs an argument")]
    MissingArgument(String),
    #[error("unknown sort order '{0}', expected relevance, name, type or status")]
    UnknownSort(String),
}

/// `Ok(None)` for lines that do nothing on this page.
pub fn parse(page: PageKind, line: &str) -> Result<Option<PageInput>, InputError> {
    let line = line.trim();
    let Some(command_line) = line.strip_prefix(':') else {
        return Ok(match page {
            PageKind::Search => Some(PageInput::Search(line.to_string())),
            PageKind::Dashboard => None,
        });
    };

    let (command, argument) = match command_line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (command_line, ""),
    };
    let command = command.to_ascii_lowercase();
    let only_on = |expected: PageKind, input: PageInput| {
        if page == expected {
            Ok(Some(input))
        } else {
            Err(InputError::NotOnThisPage {
                command: command.clone(),
                page,
            })
        }
    };

    match command.as_str() {
        "q" | "quit" => Ok(Some(PageInput::Quit)),
        "h" | "help" => Ok(Some(PageInput::Help)),
        "clear" => Ok(Some(PageInput::Clear(
            (!argument.is_empty()).then(|| ChannelId::new(argument)),
        ))),
        "reset" => only_on(PageKind::Search, PageInput::Reset),
        "sort" => {
            let order = SortOrder::parse(argument)
                .ok_or_else(|| InputError::UnknownSort(argument.to_string()))?;
            only_on(PageKind::Search, PageInput::Sort(order))
        }
        "view" => {
            if argument.is_empty() {
                return Err(InputError::MissingArgument(command.clone()));
            }
            only_on(PageKind::Search, PageInput::View(argument.to_string()))
        }
        "dashboard" => only_on(PageKind::Search, PageInput::Navigate(PageKind::Dashboard)),
        "select" => {
            if argument.is_empty() {
                return Err(InputError::MissingArgument(command.clone()));
            }
            only_on(
                PageKind::Dashboard,
                PageInput::Select(Some(argument.to_string())),
            )
        }
        "unselect" => only_on(PageKind::Dashboard, PageInput::Select(None)),
        "search" => only_on(PageKind::Dashboard, PageInput::Navigate(PageKind::Search)),
        other => match FilterField::parse(other) {
            Some(field) => only_on(
                PageKind::Search,
                PageInput::Filter(field, argument.to_string()),
            ),
            None => Err(InputError::UnknownCommand(other.to_string())),
        },
    }
}

impl PageInput {
    /// Messages for the page state machine. `Help` and `Quit` are handled by
    /// the app loop and map to nothing.
    pub fn into_msgs(self, bindings: &PageBindings) -> Vec<Msg> {
        match self {
            PageInput::Search(term) => vec![Msg::QueryChanged(term), Msg::SearchSubmitted],
            PageInput::Filter(field, value) => vec![Msg::FilterChanged { field, value }],
            PageInput::Sort(order) => vec![Msg::SortChanged(order)],
            PageInput::Reset => vec![Msg::ResetClicked],
            PageInput::Clear(channel) => {
                let default_source = match bindings.page {
                    PageKind::Search => ChannelSource::SearchResults,
                    PageKind::Dashboard => ChannelSource::Sessions,
                };
                channel
                    .or_else(|| bindings.channel_for(&default_source).cloned())
                    .map(|channel| Msg::ClearLogClicked { channel })
                    .into_iter()
                    .collect()
            }
            PageInput::View(asset_id) => vec![Msg::ViewOnDashboard { asset_id }],
            PageInput::Select(asset_id) => vec![Msg::AssetSelected { asset_id }],
            PageInput::Navigate(page) => vec![Msg::NavigateTo(page)],
            PageInput::Help | PageInput::Quit => Vec::new(),
        }
    }
}
