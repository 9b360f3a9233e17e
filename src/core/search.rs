//! Async driver for [`SearchSession`]
//!
//! One task owns the session. Debounce timers and geocoder requests run as
//! spawned tasks that report back tagged with their generation; the session
//! decides whether the report still matters.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::config::SearchConfig;
use crate::core::error::{Error, Result};
use crate::core::geocoding::{Geocoder, Place};
use crate::core::session::{Action, Key, SearchEvent, SearchSession, SearchSnapshot};

enum Report {
    TimerFired(u64),
    Completed(u64, Result<Vec<Place>>),
}

/// Handle to a running search session
///
/// Dropping the handle stops the driver task.
pub struct SearchHandle {
    events: mpsc::UnboundedSender<SearchEvent>,
    snapshots: watch::Receiver<SearchSnapshot>,
    selections: mpsc::UnboundedReceiver<Place>,
    task: JoinHandle<()>,
}

/// Starts a session driven by `geocoder`
pub fn spawn_search<G>(geocoder: Arc<G>, config: SearchConfig) -> SearchHandle
where
    G: Geocoder + 'static,
{
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(SearchSnapshot::default());
    let (selection_tx, selection_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(drive(geocoder, config, events_rx, snapshot_tx, selection_tx));

    SearchHandle {
        events: events_tx,
        snapshots: snapshot_rx,
        selections: selection_rx,
        task,
    }
}

impl SearchHandle {
    pub fn send(&self, event: SearchEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| Error::InvalidInput("search session has stopped".to_string()))
    }

    pub fn input(&self, text: impl Into<String>) -> Result<()> {
        self.send(SearchEvent::Input(text.into()))
    }

    pub fn key(&self, key: Key) -> Result<()> {
        self.send(SearchEvent::Key(key))
    }

    pub fn dismiss(&self) -> Result<()> {
        self.send(SearchEvent::Dismiss)
    }

    /// Latest published state
    pub fn snapshot(&self) -> SearchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Waits until the published state satisfies `predicate`
    ///
    /// Returns `None` if the driver stopped first.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Option<SearchSnapshot>
    where
        F: Fn(&SearchSnapshot) -> bool,
    {
        loop {
            {
                let current = self.snapshots.borrow_and_update();
                if predicate(&current) {
                    return Some(current.clone());
                }
            }
            if self.snapshots.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Next place the user picked
    pub async fn next_selection(&mut self) -> Option<Place> {
        self.selections.recv().await
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive<G>(
    geocoder: Arc<G>,
    config: SearchConfig,
    mut events: mpsc::UnboundedReceiver<SearchEvent>,
    snapshots: watch::Sender<SearchSnapshot>,
    selections: mpsc::UnboundedSender<Place>,
) where
    G: Geocoder + 'static,
{
    let (report_tx, mut reports) = mpsc::unbounded_channel::<Report>();
    let mut session = SearchSession::new(config);
    let mut timer: Option<JoinHandle<()>> = None;

    loop {
        let action = tokio::select! {
            event = events.recv() => match event {
                Some(event) => session.handle(event),
                None => break,
            },
            Some(report) = reports.recv() => match report {
                Report::TimerFired(generation) => session.on_timer(generation),
                Report::Completed(generation, result) => {
                    session.on_response(generation, result);
                    Action::Nothing
                }
            },
        };

        match action {
            Action::Nothing => {}
            Action::Schedule { generation, delay } => {
                if let Some(previous) = timer.take() {
                    previous.abort();
                }
                let tx = report_tx.clone();
                timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Report::TimerFired(generation));
                }));
            }
            Action::Issue { generation, query } => {
                log::debug!("Searching '{}' (#{generation})", query.text);
                let geocoder = Arc::clone(&geocoder);
                let tx = report_tx.clone();
                tokio::spawn(async move {
                    let result = geocoder.search(&query).await;
                    let _ = tx.send(Report::Completed(generation, result));
                });
            }
            Action::Selected(place) => {
                log::debug!("Selected place {} ({})", place.id, place.label);
                let _ = selections.send(place);
            }
        }

        if session.scheduled_generation().is_none() {
            if let Some(previous) = timer.take() {
                previous.abort();
            }
        }

        let next = session.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    if let Some(previous) = timer.take() {
        previous.abort();
    }
}
