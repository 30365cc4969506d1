//! Location filter - which map markers are visible under the band switches
//!
//! [`apply_filter`] is the pure part. [`MapFilter`] is the state object the
//! map view owns: it holds the readings and toggles, and schedules a
//! debounced recomputation whenever either changes or the camera moves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::debounce::Debouncer;
use crate::model::LocatedReading;
use crate::quality::BandTable;

/// Band key → enabled. Keys not present count as disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    enabled: BTreeMap<String, bool>,
}

impl FilterState {
    /// Every band of `table` switched on (the map's initial state)
    pub fn all_enabled(table: &BandTable) -> Self {
        Self {
            enabled: table.keys().map(|k| (k.to_string(), true)).collect(),
        }
    }

    pub fn none_enabled(table: &BandTable) -> Self {
        Self {
            enabled: table.keys().map(|k| (k.to_string(), false)).collect(),
        }
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.enabled.get(key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: &str, enabled: bool) {
        self.enabled.insert(key.to_string(), enabled);
    }

    /// Flip a switch, returning its new value
    pub fn toggle(&mut self, key: &str) -> bool {
        let value = !self.is_enabled(key);
        self.set(key, value);
        value
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for FilterState {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            enabled: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Readings whose band is enabled, in input order
pub fn apply_filter(
    readings: &[LocatedReading],
    state: &FilterState,
    table: &BandTable,
) -> Vec<LocatedReading> {
    readings
        .iter()
        .filter(|r| state.is_enabled(&table.classify(r.quality_index).key))
        .cloned()
        .collect()
}

/// Case-insensitive place-name search, first `limit` matches
pub fn search<'a>(readings: &'a [LocatedReading], text: &str, limit: usize) -> Vec<&'a LocatedReading> {
    let needle = text.to_lowercase();
    readings
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

#[derive(Debug, Clone)]
struct Snapshot {
    readings: Arc<Vec<LocatedReading>>,
    state: FilterState,
}

/// Map-view filter state with a debounced, published visible set.
///
/// Must be created inside a tokio runtime.
pub struct MapFilter {
    table: Arc<BandTable>,
    readings: Arc<Vec<LocatedReading>>,
    state: FilterState,
    debouncer: Debouncer<Snapshot>,
    visible: watch::Receiver<Arc<Vec<LocatedReading>>>,
    recomputations: Arc<AtomicU64>,
}

impl MapFilter {
    pub fn new(table: BandTable, window: Duration) -> Self {
        let table = Arc::new(table);
        let state = FilterState::all_enabled(&table);
        let (tx, visible) = watch::channel(Arc::new(Vec::new()));
        let recomputations = Arc::new(AtomicU64::new(0));

        let debouncer = {
            let table = table.clone();
            let recomputations = recomputations.clone();
            Debouncer::new(window, move |snap: Snapshot| {
                let filtered = apply_filter(&snap.readings, &snap.state, &table);
                let n = recomputations.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(
                    total = snap.readings.len(),
                    visible = filtered.len(),
                    recomputation = n,
                    "Location filter recomputed"
                );
                tx.send_replace(Arc::new(filtered));
            })
        };

        Self {
            table,
            readings: Arc::new(Vec::new()),
            state,
            debouncer,
            visible,
            recomputations,
        }
    }

    /// Replace the reading set wholesale
    pub fn set_readings(&mut self, readings: Vec<LocatedReading>) {
        tracing::debug!("Reading set replaced: {} readings", readings.len());
        self.readings = Arc::new(readings);
        self.schedule();
    }

    pub fn toggle(&mut self, key: &str) -> bool {
        let enabled = self.state.toggle(key);
        tracing::debug!(band = key, enabled, "Band switch toggled");
        self.schedule();
        enabled
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) {
        self.state.set(key, enabled);
        self.schedule();
    }

    /// Viewport changed; membership is unaffected but a recompute is scheduled
    pub fn camera_moved(&self) {
        self.schedule();
    }

    fn schedule(&self) {
        self.debouncer.trigger(Snapshot {
            readings: self.readings.clone(),
            state: self.state.clone(),
        });
    }

    pub fn table(&self) -> &BandTable {
        &self.table
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn readings(&self) -> &[LocatedReading] {
        &self.readings
    }

    /// Last published visible set
    pub fn visible(&self) -> Arc<Vec<LocatedReading>> {
        self.visible.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<LocatedReading>>> {
        self.visible.clone()
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::SeqCst)
    }

    /// Per-band counts over the full reading set (switch tooltips)
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.table.count_by_band(&self.readings)
    }

    pub fn search(&self, text: &str, limit: usize) -> Vec<&LocatedReading> {
        search(&self.readings, text, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{Color, QualityBand};

    fn bands() -> BandTable {
        BandTable::new(vec![
            QualityBand::new("good", 0.0, 50.0, Color::rgb(0, 255, 0)),
            QualityBand::new("moderate", 51.0, 100.0, Color::rgb(255, 255, 0)),
            QualityBand::new("unhealthy", 101.0, 150.0, Color::rgb(255, 0, 0)),
        ])
        .unwrap()
    }

    fn readings() -> Vec<LocatedReading> {
        vec![
            LocatedReading::new(1, "Ben Thanh", 10.77, 106.69, 30.0),
            LocatedReading::new(2, "Thu Duc", 10.85, 106.77, 120.0),
            LocatedReading::new(3, "Go Vap", 10.83, 106.68, 75.0),
        ]
    }

    fn ids(rs: &[LocatedReading]) -> Vec<u64> {
        rs.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let table = bands();
        let readings = vec![
            LocatedReading::new(1, "a", 0.0, 0.0, 30.0),
            LocatedReading::new(2, "b", 0.0, 0.0, 120.0),
        ];

        let state: FilterState = [("good", true), ("moderate", false), ("unhealthy", true)]
            .into_iter()
            .collect();
        assert_eq!(ids(&apply_filter(&readings, &state, &table)), vec![1, 2]);

        let state: FilterState = [("good", true), ("moderate", false), ("unhealthy", false)]
            .into_iter()
            .collect();
        assert_eq!(ids(&apply_filter(&readings, &state, &table)), vec![1]);
    }

    #[test]
    fn test_all_enabled_is_identity() {
        let table = bands();
        let rs = readings();
        assert_eq!(apply_filter(&rs, &FilterState::all_enabled(&table), &table), rs);
    }

    #[test]
    fn test_all_disabled_is_empty() {
        let table = bands();
        let rs = readings();
        assert!(apply_filter(&rs, &FilterState::none_enabled(&table), &table).is_empty());
        assert!(apply_filter(&rs, &FilterState::default(), &table).is_empty());
        assert!(apply_filter(&[], &FilterState::all_enabled(&table), &table).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let table = bands();
        let rs = readings();
        let mut state = FilterState::all_enabled(&table);
        state.set("moderate", false);
        let once = apply_filter(&rs, &state, &table);
        let twice = apply_filter(&once, &state, &table);
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec![1, 2]);
    }

    #[test]
    fn test_toggle_flips() {
        let table = bands();
        let mut state = FilterState::all_enabled(&table);
        assert!(!state.toggle("good"));
        assert!(state.toggle("good"));
        assert!(state.toggle("unknown"));
    }

    #[test]
    fn test_search_case_insensitive_and_limited() {
        let rs = readings();
        let hits = search(&rs, "THU", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
        assert_eq!(search(&rs, "", 2).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_filter_debounces_bursts() {
        let mut filter = MapFilter::new(bands(), Duration::from_millis(300));
        filter.set_readings(readings());
        for _ in 0..20 {
            filter.camera_moved();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        filter.toggle("unhealthy");
        assert_eq!(filter.recomputations(), 0);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(filter.recomputations(), 1);
        // state as of the last event: unhealthy switched off
        assert_eq!(ids(&filter.visible()), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_filter_publishes_to_subscribers() {
        let mut filter = MapFilter::new(bands(), Duration::from_millis(300));
        let mut rx = filter.subscribe();
        filter.set_readings(readings());
        filter.set_enabled("good", false);

        rx.changed().await.unwrap();
        assert_eq!(ids(&rx.borrow()), vec![2, 3]);
        assert_eq!(filter.readings().len(), 3);
        assert_eq!(filter.counts()[0], ("good".to_string(), 1));
    }
}
