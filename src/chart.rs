//! Chart series - hourly air-quality line and traffic bars for one location
//!
//! Slots that have not happened yet are dimmed: every slot when the chart
//! starts after today, and on today only the slots whose `HH:MM` label is
//! later than the current time. Traffic bars dim their fill and border, the
//! air line dims only the point border.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::model::TrafficAirData;
use crate::quality::{BandTable, Color};

const FUTURE_DIM: f64 = -0.5;
const AXIS_HEADROOM: f64 = 1.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub color: Color,
    pub border: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<ChartPoint>,
    /// Axis max with headroom above the tallest point
    pub suggested_max: f64,
}

impl Series {
    fn new(name: &str, points: Vec<ChartPoint>) -> Self {
        let max = points.iter().map(|p| p.value).fold(0.0, f64::max);
        Self {
            name: name.to_string(),
            points,
            suggested_max: max * AXIS_HEADROOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedChart {
    pub air: Series,
    pub traffic: Series,
}

/// Whether the slot `label` of the chart starting on `start` is still ahead of `now`
pub fn is_future(label: &str, start: NaiveDate, now: NaiveDateTime) -> bool {
    let today = now.date();
    if today < start {
        return true;
    }
    if today == start && label.contains(':') {
        return label > now.format("%H:%M").to_string().as_str();
    }
    false
}

fn dim_if_future(color: Color, label: &str, start: NaiveDate, now: NaiveDateTime) -> Color {
    if is_future(label, start, now) {
        color.darken(FUTURE_DIM)
    } else {
        color
    }
}

/// Build both series; `labels` and `records` are paired by position
pub fn build_series(
    records: &[TrafficAirData],
    labels: &[String],
    start: NaiveDate,
    now: NaiveDateTime,
    air_bands: &BandTable,
    traffic_bands: &BandTable,
) -> CombinedChart {
    if records.len() != labels.len() {
        tracing::warn!(
            "Chart labels ({}) and records ({}) differ in length, truncating",
            labels.len(),
            records.len()
        );
    }

    let air = records
        .iter()
        .zip(labels)
        .map(|(r, label)| {
            let value = r.air_data.as_ref().and_then(|a| a.air_quality_index).unwrap_or(0.0);
            let color = air_bands.color_for(value);
            ChartPoint {
                label: label.clone(),
                value,
                color,
                border: dim_if_future(color, label, start, now),
            }
        })
        .collect();

    let traffic = records
        .iter()
        .zip(labels)
        .map(|(r, label)| {
            let value = r
                .traffic_data
                .as_ref()
                .and_then(|t| t.traffic_quality_index)
                .unwrap_or(0.0);
            let color = dim_if_future(traffic_bands.color_for(value), label, start, now);
            ChartPoint {
                label: label.clone(),
                value,
                color,
                border: color,
            }
        })
        .collect();

    CombinedChart {
        air: Series::new("air_quality_index", air),
        traffic: Series::new("traffic_quality_index", traffic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirData, TrafficData};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn record(aqi: Option<f64>, tqi: Option<f64>) -> TrafficAirData {
        TrafficAirData {
            air_data: Some(AirData { air_quality_index: aqi, ..Default::default() }),
            traffic_data: Some(TrafficData { traffic_quality_index: tqi, ..Default::default() }),
        }
    }

    #[test]
    fn test_is_future() {
        let now = at("2024-05-01", "10:30");
        assert!(is_future("08:00", day("2024-05-02"), now));
        assert!(is_future("11:00", day("2024-05-01"), now));
        assert!(!is_future("10:00", day("2024-05-01"), now));
        assert!(!is_future("23:00", day("2024-04-30"), now));
        // day labels carry no time of day
        assert!(!is_future("Mon", day("2024-05-01"), now));
    }

    #[test]
    fn test_future_bars_dimmed() {
        let air = BandTable::air_default();
        let traffic = BandTable::traffic_default();
        let labels = vec!["09:00".to_string(), "12:00".to_string()];
        let records = vec![record(Some(40.0), Some(7.0)), record(None, Some(7.0))];

        let chart = build_series(&records, &labels, day("2024-05-01"), at("2024-05-01", "10:30"), &air, &traffic);

        let base = traffic.color_for(7.0);
        assert_eq!(chart.traffic.points[0].color, base);
        assert_eq!(chart.traffic.points[1].color, base.darken(-0.5));
        assert_eq!(chart.air.points[1].value, 0.0);
        assert_eq!(chart.air.points[0].color, air.get("good").unwrap().color);
    }

    #[test]
    fn test_future_air_points_get_dimmed_border() {
        let air = BandTable::air_default();
        let labels = vec!["09:00".to_string(), "12:00".to_string()];
        let records = vec![record(Some(40.0), None), record(Some(40.0), None)];

        let chart = build_series(
            &records,
            &labels,
            day("2024-05-01"),
            at("2024-05-01", "10:30"),
            &air,
            &BandTable::traffic_default(),
        );

        let good = air.get("good").unwrap().color;
        assert_eq!(chart.air.points[0].border, good);
        assert_eq!(chart.air.points[1].color, good);
        assert_eq!(chart.air.points[1].border, good.darken(-0.5));
    }

    #[test]
    fn test_suggested_max_has_headroom() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let records = vec![record(Some(10.0), Some(2.0)), record(Some(100.0), None)];
        let chart = build_series(
            &records,
            &labels,
            day("2024-05-01"),
            at("2024-05-01", "00:00"),
            &BandTable::air_default(),
            &BandTable::traffic_default(),
        );
        assert!((chart.air.suggested_max - 130.0).abs() < 1e-9);
        assert!((chart.traffic.suggested_max - 2.6).abs() < 1e-9);
    }
}
