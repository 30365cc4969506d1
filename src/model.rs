//! Data model - backend wire records and the domain records built from them
//!
//! Wire types mirror the backend JSON one-to-one (every optional field is
//! `Option`); domain types are what the classifier, filter and poller work
//! on. Conversions default missing indices to 0 and missing coordinates to
//! the default map center.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default map center (District 1, Ho Chi Minh City)
pub const DEFAULT_LATITUDE: f64 = 10.770496918;
pub const DEFAULT_LONGITUDE: f64 = 106.692330564;

/// A located record carrying one quality index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedReading {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub quality_index: f64,
}

impl LocatedReading {
    pub fn new(id: u64, name: &str, latitude: f64, longitude: f64, quality_index: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            latitude,
            longitude,
            quality_index,
        }
    }
}

/// One leaderboard row; list order is authoritative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub location: String,
    pub value: f64,
}

/// Which index a map view or ranking is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Air,
    Traffic,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Air => "air",
            Metric::Traffic => "traffic",
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "air" => Ok(Metric::Air),
            "traffic" => Ok(Metric::Traffic),
            other => Err(format!("unknown metric '{}', expected air or traffic", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapLocation {
    pub id: u64,
    pub place: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub air_quality: Option<f64>,
    #[serde(default)]
    pub air_quality_index: Option<f64>,
    #[serde(default)]
    pub traffic_quality_index: Option<f64>,
}

impl MapLocation {
    /// Build the domain reading for `metric`
    pub fn to_reading(&self, metric: Metric) -> LocatedReading {
        let index = match metric {
            Metric::Air => self.air_quality_index,
            Metric::Traffic => self.traffic_quality_index,
        };
        LocatedReading {
            id: self.id,
            name: self.place.clone(),
            latitude: parse_coord(self.lat.as_deref(), DEFAULT_LATITUDE),
            longitude: parse_coord(self.long.as_deref(), DEFAULT_LONGITUDE),
            quality_index: index.unwrap_or(0.0),
        }
    }
}

fn parse_coord(raw: Option<&str>, fallback: f64) -> f64 {
    match raw.map(|s| s.trim().parse::<f64>()) {
        Some(Ok(v)) if v.is_finite() => v,
        Some(_) => {
            tracing::debug!("Unparseable coordinate {:?}, using default", raw);
            fallback
        }
        None => fallback,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationResponse {
    pub count: usize,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub locations: Vec<MapLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingData {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub traffic_quality_index: Option<f64>,
    #[serde(default)]
    pub air_quality_index: Option<f64>,
    pub rank: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingResponse {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub count: usize,
    pub option: String,
    #[serde(default)]
    pub ranking: Option<Vec<RankingData>>,
    #[serde(default)]
    pub traffic_ranking: Option<Vec<RankingData>>,
    #[serde(default)]
    pub air_ranking: Option<Vec<RankingData>>,
}

impl RankingResponse {
    /// Entries for `metric`, in delivered order.
    ///
    /// Reads the metric-specific list first and falls back to the generic
    /// `ranking` list. Missing index values count as 0.
    pub fn entries(&self, metric: Metric) -> Vec<RankingEntry> {
        let list = match metric {
            Metric::Air => self.air_ranking.as_ref(),
            Metric::Traffic => self.traffic_ranking.as_ref(),
        }
        .or(self.ranking.as_ref());

        list.map(|rows| {
            rows.iter()
                .map(|r| RankingEntry {
                    location: r.name.clone(),
                    value: match metric {
                        Metric::Air => r.air_quality_index,
                        Metric::Traffic => r.traffic_quality_index,
                    }
                    .unwrap_or(0.0),
                })
                .collect()
        })
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficData {
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub car: Option<f64>,
    pub bike: Option<f64>,
    pub truck: Option<f64>,
    pub bus: Option<f64>,
    pub person: Option<f64>,
    pub motorbike: Option<f64>,
    pub count: Option<u32>,
    pub traffic_quality: Option<f64>,
    pub traffic_quality_index: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirData {
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
    pub count: Option<u32>,
    pub air_quality: Option<f64>,
    pub air_quality_index: Option<f64>,
}

/// One time slot of combined readings, as charted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficAirData {
    #[serde(default)]
    pub traffic_data: Option<TrafficData>,
    #[serde(default)]
    pub air_data: Option<AirData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficAirDataResponse {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub traffic_data: Option<TrafficData>,
    #[serde(default)]
    pub air_data: Option<AirData>,
    #[serde(default)]
    pub traffic_data_hour: Vec<TrafficData>,
    #[serde(default)]
    pub air_data_hour: Vec<AirData>,
}

impl TrafficAirDataResponse {
    /// The response date as a calendar day, `None` when absent or not `YYYY-MM-DD`
    pub fn day(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?;
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(day) => Some(day),
            Err(e) => {
                tracing::debug!("Unparseable response date {:?}: {}", raw, e);
                None
            }
        }
    }

    /// Pair hourly air and traffic records by hour, sorted by hour.
    ///
    /// Returns the `HH:00` labels alongside the combined records.
    pub fn hourly(&self) -> (Vec<String>, Vec<TrafficAirData>) {
        let mut hours: Vec<u32> = self
            .air_data_hour
            .iter()
            .filter_map(|a| a.hour)
            .chain(self.traffic_data_hour.iter().filter_map(|t| t.hour))
            .collect();
        hours.sort_unstable();
        hours.dedup();

        let labels = hours.iter().map(|h| format!("{:02}:00", h)).collect();
        let records = hours
            .iter()
            .map(|&h| TrafficAirData {
                air_data: self.air_data_hour.iter().find(|a| a.hour == Some(h)).cloned(),
                traffic_data: self.traffic_data_hour.iter().find(|t| t.hour == Some(h)).cloned(),
            })
            .collect();
        (labels, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_to_reading_defaults() {
        let json = r#"{"id": 7, "place": "Ben Thanh", "lat": "10.77", "long": "bad"}"#;
        let loc: MapLocation = serde_json::from_str(json).unwrap();
        let reading = loc.to_reading(Metric::Air);
        assert_eq!(reading.id, 7);
        assert_eq!(reading.name, "Ben Thanh");
        assert_eq!(reading.latitude, 10.77);
        assert_eq!(reading.longitude, DEFAULT_LONGITUDE);
        assert_eq!(reading.quality_index, 0.0);
    }

    #[test]
    fn test_ranking_entries_keep_delivered_order() {
        let json = r#"{
            "count": 3, "option": "air",
            "air_ranking": [
                {"id": 1, "name": "A", "air_quality_index": 10, "rank": 3},
                {"id": 2, "name": "B", "air_quality_index": 90, "rank": 1},
                {"id": 3, "name": "C", "rank": 2}
            ]
        }"#;
        let resp: RankingResponse = serde_json::from_str(json).unwrap();
        let entries = resp.entries(Metric::Air);
        let names: Vec<_> = entries.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(entries[2].value, 0.0);
        assert!(resp.entries(Metric::Traffic).is_empty());
    }

    #[test]
    fn test_ranking_falls_back_to_generic_list() {
        let json = r#"{"count": 1, "option": "traffic",
            "ranking": [{"id": 1, "name": "A", "traffic_quality_index": 12.5, "rank": 1}]}"#;
        let resp: RankingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.entries(Metric::Traffic)[0].value, 12.5);
    }

    #[test]
    fn test_hourly_pairs_by_hour() {
        let resp = TrafficAirDataResponse {
            air_data_hour: vec![
                AirData { hour: Some(9), air_quality_index: Some(40.0), ..Default::default() },
                AirData { hour: Some(8), air_quality_index: Some(30.0), ..Default::default() },
            ],
            traffic_data_hour: vec![TrafficData {
                hour: Some(9),
                traffic_quality_index: Some(7.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (labels, records) = resp.hourly();
        assert_eq!(labels, vec!["08:00", "09:00"]);
        assert!(records[0].traffic_data.is_none());
        assert_eq!(records[1].traffic_data.as_ref().unwrap().traffic_quality_index, Some(7.0));
    }

    #[test]
    fn test_data_response_tolerates_non_iso_date() {
        let json = r#"{"id": 4, "name": "Q1", "date": "01/05/2024"}"#;
        let resp: TrafficAirDataResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.date.as_deref(), Some("01/05/2024"));
        assert_eq!(resp.day(), None);

        let json = r#"{"id": 4, "name": "Q1", "date": "2024-05-01"}"#;
        let resp: TrafficAirDataResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.day(), NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("Air".parse::<Metric>().unwrap(), Metric::Air);
        assert!("noise".parse::<Metric>().is_err());
    }
}
