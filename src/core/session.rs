//! Search-and-select state machine
//!
//! Pure and synchronous: it never sleeps or touches the network. Every
//! event returns an [`Action`] telling the driver what to schedule. Each
//! input, submission and dismissal bumps a generation counter; timers and
//! responses carry the generation they were created for and are ignored
//! unless it is still current, so the last request always wins regardless
//! of completion order.

use std::time::Duration;

use crate::core::config::SearchConfig;
use crate::core::coords::BoundingBox;
use crate::core::error::Result;
use crate::core::geocoding::{Place, SearchQuery};

/// Where the session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing to show
    #[default]
    Idle,
    /// A request is in flight
    Pending,
    /// Results (possibly none) are available
    Settled,
}

/// Keys the result list reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// Inputs coming from the search control
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// The text field changed
    Input(String),
    Key(Key),
    /// A result was picked with the pointer
    Select(usize),
    /// The visible map area changed
    Viewport(BoundingBox),
    /// Interaction outside the control, or focus lost
    Dismiss,
}

/// What the driver has to do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Nothing,
    /// (Re)start the debounce timer for this generation
    Schedule { generation: u64, delay: Duration },
    /// Send this query now
    Issue { generation: u64, query: SearchQuery },
    /// The user picked a place
    Selected(Place),
}

/// Read-only view of the session, published after every event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSnapshot {
    pub phase: Phase,
    pub query: String,
    pub results: Vec<Place>,
    pub highlighted: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    config: SearchConfig,
    query: String,
    results: Vec<Place>,
    highlighted: Option<usize>,
    phase: Phase,
    viewbox: Option<BoundingBox>,
    generation: u64,
    scheduled: Option<u64>,
    in_flight: Option<u64>,
}

impl SearchSession {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            query: String::new(),
            results: Vec::new(),
            highlighted: None,
            phase: Phase::Idle,
            viewbox: None,
            generation: 0,
            scheduled: None,
            in_flight: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Place] {
        &self.results
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Highlight as a UI index, `-1` when nothing is highlighted
    pub fn highlighted_index(&self) -> isize {
        self.highlighted.map_or(-1, |i| i as isize)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation of the debounce timer that is allowed to fire, if any
    pub fn scheduled_generation(&self) -> Option<u64> {
        self.scheduled
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            phase: self.phase,
            query: self.query.clone(),
            results: self.results.clone(),
            highlighted: self.highlighted,
        }
    }

    pub fn handle(&mut self, event: SearchEvent) -> Action {
        match event {
            SearchEvent::Input(text) => self.on_input(text),
            SearchEvent::Key(key) => self.on_key(key),
            SearchEvent::Select(index) => self.select(index),
            SearchEvent::Viewport(bbox) => {
                self.viewbox = Some(bbox);
                Action::Nothing
            }
            SearchEvent::Dismiss => {
                self.dismiss();
                Action::Nothing
            }
        }
    }

    /// Text changed: settle at once when blank, otherwise restart the debounce
    pub fn on_input(&mut self, text: String) -> Action {
        self.query = text;
        self.generation += 1;
        self.in_flight = None;

        if self.query.trim().is_empty() {
            self.scheduled = None;
            self.settle(Vec::new());
            return Action::Nothing;
        }

        self.scheduled = Some(self.generation);
        Action::Schedule {
            generation: self.generation,
            delay: self.config.debounce,
        }
    }

    /// Debounce expired for `generation`
    pub fn on_timer(&mut self, generation: u64) -> Action {
        if self.scheduled != Some(generation) {
            log::debug!("Ignoring superseded search timer #{generation}");
            return Action::Nothing;
        }
        self.scheduled = None;
        self.issue(generation)
    }

    /// A request finished. Returns whether the result was applied.
    ///
    /// Failures settle with zero results; search is advisory and must not
    /// block typing.
    pub fn on_response(&mut self, generation: u64, result: Result<Vec<Place>>) -> bool {
        if self.in_flight != Some(generation) || generation != self.generation {
            log::debug!(
                "Discarding stale search response #{generation} (current #{})",
                self.generation
            );
            return false;
        }
        self.in_flight = None;

        let places = result.unwrap_or_else(|e| {
            log::warn!("Place search failed, showing no results: {e}");
            Vec::new()
        });
        self.settle(places);
        true
    }

    pub fn on_key(&mut self, key: Key) -> Action {
        match key {
            Key::ArrowDown => {
                self.move_highlight(1);
                Action::Nothing
            }
            Key::ArrowUp => {
                self.move_highlight(-1);
                Action::Nothing
            }
            Key::Enter => match self.highlighted {
                Some(index) if index < self.results.len() => self.select(index),
                _ => self.submit(),
            },
            Key::Escape => {
                self.dismiss();
                Action::Nothing
            }
        }
    }

    /// Finalizes the choice of `index`: emits it and clears the list
    pub fn select(&mut self, index: usize) -> Action {
        let Some(place) = self.results.get(index).cloned() else {
            return Action::Nothing;
        };
        self.query = place.label.clone();
        self.dismiss();
        Action::Selected(place)
    }

    /// Re-issues the current query right away, skipping the debounce
    pub fn submit(&mut self) -> Action {
        self.generation += 1;
        self.scheduled = None;
        self.in_flight = None;

        if self.query.trim().is_empty() {
            self.settle(Vec::new());
            return Action::Nothing;
        }
        self.issue(self.generation)
    }

    /// Clears results and highlight without selecting; anything pending is dropped
    pub fn dismiss(&mut self) {
        self.generation += 1;
        self.scheduled = None;
        self.in_flight = None;
        self.results.clear();
        self.highlighted = None;
        self.phase = Phase::Idle;
    }

    fn issue(&mut self, generation: u64) -> Action {
        self.in_flight = Some(generation);
        self.phase = Phase::Pending;
        Action::Issue {
            generation,
            query: SearchQuery {
                text: self.query.trim().to_string(),
                viewbox: self.viewbox,
                limit: self.config.limit,
            },
        }
    }

    fn settle(&mut self, mut places: Vec<Place>) {
        places.truncate(self.config.limit as usize);
        self.highlighted = if places.is_empty() { None } else { Some(0) };
        self.results = places;
        self.phase = Phase::Settled;
    }

    /// Cyclic move; no-op on an empty list
    fn move_highlight(&mut self, step: isize) {
        let len = self.results.len() as isize;
        if len == 0 {
            return;
        }
        let next = match self.highlighted {
            Some(current) => (current as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        self.highlighted = Some(next as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coords::Coordinate;
    use crate::core::error::Error;
    use crate::core::geocoding::PlaceId;

    fn place(id: u64, label: &str) -> Place {
        Place {
            id: PlaceId::Number(id),
            label: label.to_string(),
            coordinate: Coordinate::new(48.0 + id as f64, 2.0),
        }
    }

    fn three_places() -> Vec<Place> {
        vec![place(1, "Paris"), place(2, "Paris, Texas"), place(3, "Parigné")]
    }

    fn issued_generation(action: Action) -> u64 {
        match action {
            Action::Issue { generation, .. } => generation,
            other => panic!("Expected Issue, got {other:?}"),
        }
    }

    fn settled_session() -> SearchSession {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("pari".to_string());
        let generation = issued_generation(session.on_timer(1));
        assert!(session.on_response(generation, Ok(three_places())));
        session
    }

    #[test]
    fn test_debounce_only_latest_timer_fires() {
        let mut session = SearchSession::new(SearchConfig::default());
        assert_eq!(
            session.on_input("par".to_string()),
            Action::Schedule { generation: 1, delay: Duration::from_millis(300) }
        );
        assert!(matches!(
            session.on_input("pari".to_string()),
            Action::Schedule { generation: 2, .. }
        ));

        assert_eq!(session.on_timer(1), Action::Nothing);
        match session.on_timer(2) {
            Action::Issue { generation, query } => {
                assert_eq!(generation, 2);
                assert_eq!(query.text, "pari");
                assert_eq!(query.limit, 8);
            }
            other => panic!("Expected Issue, got {other:?}"),
        }
        assert_eq!(session.phase(), Phase::Pending);
        // A timer fires at most once
        assert_eq!(session.on_timer(2), Action::Nothing);
    }

    #[test]
    fn test_blank_query_settles_without_request() {
        let mut session = settled_session();
        assert_eq!(session.on_input("   ".to_string()), Action::Nothing);
        assert_eq!(session.phase(), Phase::Settled);
        assert!(session.results().is_empty());
        assert_eq!(session.highlighted_index(), -1);
        assert_eq!(session.scheduled_generation(), None);
    }

    #[test]
    fn test_settle_highlights_first_result() {
        let session = settled_session();
        assert_eq!(session.phase(), Phase::Settled);
        assert_eq!(session.results().len(), 3);
        assert_eq!(session.highlighted(), Some(0));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("par".to_string());
        let old = issued_generation(session.on_timer(1));
        session.on_input("pari".to_string());
        let new = issued_generation(session.on_timer(2));

        assert!(session.on_response(new, Ok(vec![place(9, "Paris")])));
        assert!(!session.on_response(old, Ok(three_places())));
        assert_eq!(session.results(), &[place(9, "Paris")]);
    }

    #[test]
    fn test_response_after_newer_keystroke_is_discarded() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("par".to_string());
        let old = issued_generation(session.on_timer(1));
        session.on_input("pari".to_string());

        assert!(!session.on_response(old, Ok(three_places())));
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_failure_settles_empty() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("pari".to_string());
        let generation = issued_generation(session.on_timer(1));
        assert!(session.on_response(
            generation,
            Err(Error::NetworkError("connection refused".to_string()))
        ));
        assert_eq!(session.phase(), Phase::Settled);
        assert!(session.results().is_empty());
        assert_eq!(session.highlighted(), None);
    }

    #[test]
    fn test_highlight_wraps_both_directions() {
        let mut session = settled_session();
        session.on_key(Key::ArrowDown);
        session.on_key(Key::ArrowDown);
        assert_eq!(session.highlighted(), Some(2));
        session.on_key(Key::ArrowDown);
        assert_eq!(session.highlighted(), Some(0));
        session.on_key(Key::ArrowUp);
        assert_eq!(session.highlighted(), Some(2));
    }

    #[test]
    fn test_arrows_on_empty_list_are_noops() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_key(Key::ArrowDown);
        session.on_key(Key::ArrowUp);
        assert_eq!(session.highlighted(), None);
    }

    #[test]
    fn test_enter_selects_and_clears() {
        let mut session = settled_session();
        session.on_key(Key::ArrowDown);
        assert_eq!(session.on_key(Key::Enter), Action::Selected(place(2, "Paris, Texas")));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.results().is_empty());
        assert_eq!(session.highlighted_index(), -1);
        assert_eq!(session.query(), "Paris, Texas");
    }

    #[test]
    fn test_escape_clears_without_selection() {
        let mut session = settled_session();
        assert_eq!(session.on_key(Key::Escape), Action::Nothing);
        assert!(session.results().is_empty());
        assert_eq!(session.highlighted(), None);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_dismiss_drops_in_flight_request() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("pari".to_string());
        let generation = issued_generation(session.on_timer(1));
        session.handle(SearchEvent::Dismiss);
        assert!(!session.on_response(generation, Ok(three_places())));
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_enter_without_highlight_reissues_immediately() {
        let mut session = SearchSession::new(SearchConfig::default());
        session.on_input("pari".to_string());
        match session.on_key(Key::Enter) {
            Action::Issue { generation, query } => {
                assert_eq!(generation, 2);
                assert_eq!(query.text, "pari");
            }
            other => panic!("Expected Issue, got {other:?}"),
        }
        // The pending debounce timer must not fire a second request
        assert_eq!(session.on_timer(1), Action::Nothing);
    }

    #[test]
    fn test_viewport_is_attached_to_queries() {
        let mut session = SearchSession::new(SearchConfig::default());
        let bbox = BoundingBox::from_flat(&[2.2, 48.8, 2.4, 48.9]).unwrap();
        session.handle(SearchEvent::Viewport(bbox));
        session.on_input("louvre".to_string());
        match session.on_timer(1) {
            Action::Issue { query, .. } => assert_eq!(query.viewbox, Some(bbox)),
            other => panic!("Expected Issue, got {other:?}"),
        }
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let mut session = settled_session();
        assert_eq!(session.select(7), Action::Nothing);
        assert_eq!(session.results().len(), 3);
    }
}
