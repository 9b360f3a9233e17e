//! Search session driver tests on tokio's paused clock

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use butterfly_map::{
    spawn_search, Coordinate, Error, Geocoder, Key, Phase, Place, PlaceId, Result, SearchConfig,
    SearchHandle, SearchQuery,
};
use futures::future::BoxFuture;
use futures::FutureExt;

#[ctor::ctor]
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Geocoder answering from a fixed table, with optional per-query latency
#[derive(Default)]
struct ScriptedGeocoder {
    answers: HashMap<String, Vec<Place>>,
    latency: HashMap<String, Duration>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    fn answer(mut self, text: &str, labels: &[&str]) -> Self {
        let places = labels
            .iter()
            .enumerate()
            .map(|(i, label)| Place {
                id: PlaceId::Number(i as u64 + 1),
                label: label.to_string(),
                coordinate: Coordinate::new(48.85 + i as f64, 2.35),
            })
            .collect();
        self.answers.insert(text.to_string(), places);
        self
    }

    fn slow(mut self, text: &str, latency: Duration) -> Self {
        self.latency.insert(text.to_string(), latency);
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Geocoder for ScriptedGeocoder {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Vec<Place>>> {
        async move {
            self.queries.lock().unwrap().push(query.text.clone());
            if let Some(latency) = self.latency.get(&query.text) {
                tokio::time::sleep(*latency).await;
            }
            if self.failing {
                return Err(Error::NetworkError("connection reset".to_string()));
            }
            Ok(self.answers.get(&query.text).cloned().unwrap_or_default())
        }
        .boxed()
    }
}

fn start(geocoder: &Arc<ScriptedGeocoder>) -> SearchHandle {
    spawn_search(Arc::clone(geocoder), SearchConfig::default())
}

fn labels(places: &[Place]) -> Vec<&str> {
    places.iter().map(|p| p.label.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_sends_one_request() {
    let geocoder = Arc::new(ScriptedGeocoder::default().answer("pari", &["Paris", "Parigny"]));
    let mut search = start(&geocoder);

    search.input("p").unwrap();
    search.input("pa").unwrap();
    search.input("par").unwrap();
    search.input("pari").unwrap();

    let settled = search
        .wait_for(|s| s.phase == Phase::Settled)
        .await
        .unwrap();
    assert_eq!(settled.query, "pari");
    assert_eq!(labels(&settled.results), vec!["Paris", "Parigny"]);
    assert_eq!(settled.highlighted, Some(0));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(geocoder.queries(), vec!["pari"]);
}

#[tokio::test(start_paused = true)]
async fn test_request_waits_for_debounce() {
    let geocoder = Arc::new(ScriptedGeocoder::default().answer("gent", &["Gent"]));
    let mut search = start(&geocoder);
    let started = tokio::time::Instant::now();

    search.input("gent").unwrap();
    search.wait_for(|s| s.phase == Phase::Settled).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(geocoder.queries(), vec!["gent"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_response_does_not_overwrite_newer_results() {
    let geocoder = Arc::new(
        ScriptedGeocoder::default()
            .answer("par", &["Parma", "Parnu", "Paros"])
            .answer("pari", &["Paris"])
            .slow("par", Duration::from_secs(2)),
    );
    let mut search = start(&geocoder);

    search.input("par").unwrap();
    search.wait_for(|s| s.phase == Phase::Pending).await.unwrap();

    search.input("pari").unwrap();
    let settled = search
        .wait_for(|s| s.phase == Phase::Settled && s.query == "pari")
        .await
        .unwrap();
    assert_eq!(labels(&settled.results), vec!["Paris"]);

    // Let the slow "par" answer arrive; it must be discarded
    tokio::time::sleep(Duration::from_secs(5)).await;
    let latest = search.snapshot();
    assert_eq!(labels(&latest.results), vec!["Paris"]);
    assert_eq!(geocoder.queries(), vec!["par", "pari"]);
}

#[tokio::test(start_paused = true)]
async fn test_blank_query_settles_without_request() {
    let geocoder = Arc::new(ScriptedGeocoder::default());
    let mut search = start(&geocoder);

    search.input("   ").unwrap();
    let settled = search
        .wait_for(|s| s.phase == Phase::Settled)
        .await
        .unwrap();
    assert!(settled.results.is_empty());
    assert_eq!(settled.highlighted, None);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(geocoder.queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failure_shows_no_results() {
    let geocoder = Arc::new(ScriptedGeocoder {
        failing: true,
        ..Default::default()
    });
    let mut search = start(&geocoder);

    search.input("brussels").unwrap();
    let settled = search
        .wait_for(|s| s.phase == Phase::Settled)
        .await
        .unwrap();
    assert!(settled.results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_keyboard_selection_wraps_and_emits_place() {
    let geocoder = Arc::new(
        ScriptedGeocoder::default().answer("paris", &["Paris", "Paris, Texas", "Paris, Ontario"]),
    );
    let mut search = start(&geocoder);

    search.input("paris").unwrap();
    search.wait_for(|s| s.phase == Phase::Settled).await.unwrap();

    search.key(Key::ArrowUp).unwrap();
    let wrapped = search.wait_for(|s| s.highlighted == Some(2)).await.unwrap();
    assert_eq!(wrapped.results.len(), 3);

    search.key(Key::ArrowDown).unwrap();
    search.wait_for(|s| s.highlighted == Some(0)).await.unwrap();
    search.key(Key::ArrowDown).unwrap();
    search.key(Key::Enter).unwrap();

    let chosen = search.next_selection().await.unwrap();
    assert_eq!(chosen.label, "Paris, Texas");

    let cleared = search
        .wait_for(|s| s.phase == Phase::Idle)
        .await
        .unwrap();
    assert!(cleared.results.is_empty());
    assert_eq!(cleared.highlighted, None);
    assert_eq!(cleared.query, "Paris, Texas");
}

#[tokio::test(start_paused = true)]
async fn test_escape_dismisses_without_selection() {
    let geocoder = Arc::new(ScriptedGeocoder::default().answer("liege", &["Liège"]));
    let mut search = start(&geocoder);

    search.input("liege").unwrap();
    search.wait_for(|s| s.phase == Phase::Settled).await.unwrap();
    search.key(Key::Escape).unwrap();

    let cleared = search
        .wait_for(|s| s.phase == Phase::Idle)
        .await
        .unwrap();
    assert!(cleared.results.is_empty());
    assert!(
        tokio::time::timeout(Duration::from_secs(1), search.next_selection())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn test_enter_without_highlight_skips_debounce() {
    let geocoder = Arc::new(ScriptedGeocoder::default().answer("namur", &["Namur"]));
    let mut search = start(&geocoder);
    let started = tokio::time::Instant::now();

    search.input("namur").unwrap();
    search.key(Key::Enter).unwrap();
    let settled = search
        .wait_for(|s| s.phase == Phase::Settled)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(labels(&settled.results), vec!["Namur"]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(geocoder.queries(), vec!["namur"]);
}
