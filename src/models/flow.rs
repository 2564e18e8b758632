use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::cart::CartItemKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchTab {
    #[default]
    Flights,
    Hotels,
    Tours,
}

impl SearchTab {
    pub const ALL: [SearchTab; 3] = [SearchTab::Flights, SearchTab::Hotels, SearchTab::Tours];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTab::Flights => "flights",
            SearchTab::Hotels => "hotels",
            SearchTab::Tours => "tours",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchTab::Flights => "Flights",
            SearchTab::Hotels => "Hotels",
            SearchTab::Tours => "Tours",
        }
    }

    /// Tab shown after a selection on this one; `None` once the last tab is done.
    pub fn next(&self) -> Option<SearchTab> {
        match self {
            SearchTab::Flights => Some(SearchTab::Hotels),
            SearchTab::Hotels => Some(SearchTab::Tours),
            SearchTab::Tours => None,
        }
    }
}

impl From<CartItemKind> for SearchTab {
    fn from(kind: CartItemKind) -> Self {
        match kind {
            CartItemKind::Flight => SearchTab::Flights,
            CartItemKind::Hotel => SearchTab::Hotels,
            CartItemKind::Tour => SearchTab::Tours,
        }
    }
}

impl FromStr for SearchTab {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse::<CartItemKind>().map(SearchTab::from)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    Searching,
    ResultsShown,
    ItemSelected,
}

/// Where the user is in the flights → hotels → tours search.
///
/// Tab advancing is a convenience only; `switch_tab` is always allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingFlow {
    pub tab: SearchTab,
    pub state: FlowState,
    pub query: String,
    /// Set once the user typed a destination; selections no longer overwrite it.
    pub destination_pinned: bool,
}

impl BookingFlow {
    pub fn begin_search(&mut self, tab: SearchTab, query: &str) {
        let query = query.trim();
        if query != self.query {
            self.destination_pinned = !query.is_empty();
        }
        self.tab = tab;
        self.query = query.to_string();
        self.state = FlowState::Searching;
    }

    pub fn show_results(&mut self) {
        if self.state == FlowState::Searching {
            self.state = FlowState::ResultsShown;
        }
    }

    pub fn switch_tab(&mut self, tab: SearchTab) {
        self.tab = tab;
        self.state = FlowState::Idle;
    }

    /// Records a selection of `kind` made for `destination` and advances the tab.
    pub fn select(&mut self, kind: CartItemKind, destination: &str) {
        if !self.destination_pinned && !destination.trim().is_empty() {
            self.query = destination.trim().to_string();
        }
        match SearchTab::from(kind).next() {
            Some(next) => {
                self.tab = next;
                self.state = FlowState::ItemSelected;
            }
            None => {
                self.tab = SearchTab::Tours;
                self.state = FlowState::Idle;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
