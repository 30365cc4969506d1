//! Quality classification - index value to discrete band + color
//!
//! Two band tables ship by default:
//! - air: AQI bands good / moderate / unhealthy / very_unhealthy / hazardous
//! - traffic: six traffic-index levels shaded from light to dark cyan
//!
//! Classification is a first-match scan in ascending band order, so a value
//! sitting on a boundary shared by two bands lands in the lower one.
//! Values outside every band are clamped to the nearest band (see
//! [`BandTable::classify`]).

pub mod scale;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::LocatedReading;

#[derive(Error, Debug, PartialEq)]
pub enum BandError {
    #[error("Band table is empty")]
    Empty,
    #[error("Band '{0}' has a NaN bound")]
    NanBound(String),
    #[error("Band '{key}' has min {min} > max {max}")]
    Inverted { key: String, min: f64, max: f64 },
    #[error("Duplicate band key '{0}'")]
    DuplicateKey(String),
    #[error("Band '{next}' overlaps or precedes band '{prev}'")]
    Unordered { prev: String, next: String },
    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// 8-bit RGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `1 + amount`, clamped to 0..=255.
    ///
    /// `darken(-0.5)` halves the brightness; this is how not-yet-elapsed
    /// hours are dimmed on charts.
    pub fn darken(self, amount: f64) -> Self {
        let scale = |c: u8| (c as f64 * (1.0 + amount)).round().clamp(0.0, 255.0) as u8;
        Self::rgb(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = BandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BandError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| BandError::InvalidColor(s.to_string()))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = BandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// Named inclusive range of index values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBand {
    pub key: String,
    pub min: f64,
    pub max: f64,
    pub color: Color,
}

impl QualityBand {
    pub fn new(key: &str, min: f64, max: f64, color: Color) -> Self {
        Self {
            key: key.to_string(),
            min,
            max,
            color,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Distance from `value` to the nearest edge, 0 when inside
    fn distance(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

/// Ordered, validated list of bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QualityBand>", into = "Vec<QualityBand>")]
pub struct BandTable {
    bands: Vec<QualityBand>,
}

impl BandTable {
    /// Validate and build a table.
    ///
    /// Bands must be sorted by `min`; adjacent bands may touch
    /// (`next.min == prev.max`) but not overlap further.
    pub fn new(bands: Vec<QualityBand>) -> Result<Self, BandError> {
        if bands.is_empty() {
            return Err(BandError::Empty);
        }
        for (i, band) in bands.iter().enumerate() {
            if band.min.is_nan() || band.max.is_nan() {
                return Err(BandError::NanBound(band.key.clone()));
            }
            if band.min > band.max {
                return Err(BandError::Inverted {
                    key: band.key.clone(),
                    min: band.min,
                    max: band.max,
                });
            }
            if bands[..i].iter().any(|b| b.key == band.key) {
                return Err(BandError::DuplicateKey(band.key.clone()));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].min < pair[0].max {
                return Err(BandError::Unordered {
                    prev: pair[0].key.clone(),
                    next: pair[1].key.clone(),
                });
            }
        }
        Ok(Self { bands })
    }

    /// AQI bands used by the map switches
    pub fn air_default() -> Self {
        Self {
            bands: vec![
                QualityBand::new("good", 0.0, 50.0, Color::rgb(0x00, 0xe4, 0x00)),
                QualityBand::new("moderate", 51.0, 100.0, Color::rgb(0xff, 0xff, 0x00)),
                QualityBand::new("unhealthy", 101.0, 200.0, Color::rgb(0xff, 0x7e, 0x00)),
                QualityBand::new("very_unhealthy", 201.0, 300.0, Color::rgb(0xff, 0x00, 0x00)),
                QualityBand::new("hazardous", 301.0, 500.0, Color::rgb(0x8f, 0x3f, 0x97)),
            ],
        }
    }

    /// Traffic index levels used by the traffic bars
    pub fn traffic_default() -> Self {
        Self {
            bands: vec![
                QualityBand::new("level_1", 0.0, 5.99, Color::rgb(0xa5, 0xf3, 0xfc)),
                QualityBand::new("level_2", 6.0, 10.99, Color::rgb(0x67, 0xe8, 0xf9)),
                QualityBand::new("level_3", 11.0, 15.99, Color::rgb(0x22, 0xd3, 0xee)),
                QualityBand::new("level_4", 16.0, 20.99, Color::rgb(0x06, 0xb6, 0xd4)),
                QualityBand::new("level_5", 21.0, 25.99, Color::rgb(0x08, 0x91, 0xb2)),
                QualityBand::new("level_6", 26.0, 9999.0, Color::rgb(0x0e, 0x74, 0x90)),
            ],
        }
    }

    pub fn bands(&self) -> &[QualityBand] {
        &self.bands
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|b| b.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&QualityBand> {
        self.bands.iter().find(|b| b.key == key)
    }

    /// Classify a value. NaN counts as 0.
    ///
    /// Values outside every band are clamped: below the table to the first
    /// band, above it to the last, and inside a gap to whichever neighbour
    /// is closer (the lower one on a tie).
    pub fn classify(&self, value: f64) -> &QualityBand {
        let value = if value.is_nan() { 0.0 } else { value };

        if let Some(band) = self.bands.iter().find(|b| b.contains(value)) {
            return band;
        }

        let first = &self.bands[0];
        let last = &self.bands[self.bands.len() - 1];
        if value < first.min {
            tracing::debug!(value, band = %first.key, "Index below configured bands, clamped");
            return first;
        }
        if value > last.max {
            tracing::debug!(value, band = %last.key, "Index above configured bands, clamped");
            return last;
        }

        // Inside a gap between two bands.
        // min_by keeps the first of equal elements, i.e. the lower band
        let band = self
            .bands
            .iter()
            .min_by(|a, b| a.distance(value).total_cmp(&b.distance(value)))
            .unwrap_or(first);
        tracing::debug!(value, band = %band.key, "Index in gap between bands, clamped");
        band
    }

    /// Classify a possibly missing value; missing counts as 0
    pub fn classify_opt(&self, value: Option<f64>) -> &QualityBand {
        self.classify(value.unwrap_or(0.0))
    }

    pub fn color_for(&self, value: f64) -> Color {
        self.classify(value).color
    }

    /// Number of readings per band, in table order, zero counts included
    pub fn count_by_band(&self, readings: &[LocatedReading]) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> =
            self.bands.iter().map(|b| (b.key.clone(), 0)).collect();
        for reading in readings {
            let key = &self.classify(reading.quality_index).key;
            if let Some(slot) = counts.iter_mut().find(|(k, _)| k == key) {
                slot.1 += 1;
            }
        }
        counts
    }
}

impl TryFrom<Vec<QualityBand>> for BandTable {
    type Error = BandError;

    fn try_from(bands: Vec<QualityBand>) -> Result<Self, Self::Error> {
        Self::new(bands)
    }
}

impl From<BandTable> for Vec<QualityBand> {
    fn from(table: BandTable) -> Self {
        table.bands
    }
}

/// Classify `value` against `table`
pub fn classify(value: f64, table: &BandTable) -> &QualityBand {
    table.classify(value)
}
