//! Continuous color scale for a single "current" reading
//!
//! Piecewise linear per-channel interpolation between control points,
//! clamped to the first/last color outside the domain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Color;

#[derive(Error, Debug, PartialEq)]
pub enum ScaleError {
    #[error("Color scale needs at least one control point")]
    Empty,
    #[error("Control point {0} is NaN")]
    NanDomain(usize),
    #[error("Control points must be strictly ascending (point {0})")]
    Unsorted(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ControlPoint>", into = "Vec<ControlPoint>")]
pub struct ColorScale {
    points: Vec<ControlPoint>,
}

impl ColorScale {
    pub fn new(points: Vec<ControlPoint>) -> Result<Self, ScaleError> {
        if points.is_empty() {
            return Err(ScaleError::Empty);
        }
        for (i, p) in points.iter().enumerate() {
            if p.value.is_nan() {
                return Err(ScaleError::NanDomain(i));
            }
            if i > 0 && p.value <= points[i - 1].value {
                return Err(ScaleError::Unsorted(i));
            }
        }
        Ok(Self { points })
    }

    /// green → yellow → orange → red → purple → dark at 0/50/100/150/200/300
    pub fn air_default() -> Self {
        let point = |value, color| ControlPoint { value, color };
        Self {
            points: vec![
                point(0.0, Color::rgb(0x00, 0xe4, 0x00)),
                point(50.0, Color::rgb(0xff, 0xff, 0x00)),
                point(100.0, Color::rgb(0xff, 0x7e, 0x00)),
                point(150.0, Color::rgb(0xff, 0x00, 0x00)),
                point(200.0, Color::rgb(0x8f, 0x3f, 0x97)),
                point(300.0, Color::rgb(0x7e, 0x00, 0x23)),
            ],
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn color_for(&self, value: f64) -> Color {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if value.is_nan() || value <= first.value {
            return first.color;
        }
        if value >= last.value {
            return last.color;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if value == lo.value {
                return lo.color;
            }
            if value < hi.value {
                let t = (value - lo.value) / (hi.value - lo.value);
                return lerp(lo.color, hi.color, t);
            }
        }
        last.color
    }
}

fn lerp(a: Color, b: Color, t: f64) -> Color {
    let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Color::rgb(channel(a.r, b.r), channel(a.g, b.g), channel(a.b, b.b))
}

impl TryFrom<Vec<ControlPoint>> for ColorScale {
    type Error = ScaleError;

    fn try_from(points: Vec<ControlPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<ColorScale> for Vec<ControlPoint> {
    fn from(scale: ColorScale) -> Self {
        scale.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_at_ends() {
        let scale = ColorScale::air_default();
        assert_eq!(scale.color_for(0.0), Color::rgb(0x00, 0xe4, 0x00));
        assert_eq!(scale.color_for(-12.0), Color::rgb(0x00, 0xe4, 0x00));
        assert_eq!(scale.color_for(300.0), Color::rgb(0x7e, 0x00, 0x23));
        assert_eq!(scale.color_for(499.0), Color::rgb(0x7e, 0x00, 0x23));
    }

    #[test]
    fn test_exact_control_points() {
        let scale = ColorScale::air_default();
        for p in scale.points() {
            assert_eq!(scale.color_for(p.value), p.color);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let scale = ColorScale::new(vec![
            ControlPoint { value: 0.0, color: Color::rgb(0, 0, 0) },
            ControlPoint { value: 10.0, color: Color::rgb(200, 100, 50) },
        ])
        .unwrap();
        assert_eq!(scale.color_for(5.0), Color::rgb(100, 50, 25));
        assert_eq!(scale.color_for(2.5), Color::rgb(50, 25, 13));
    }

    #[test]
    fn test_rejects_bad_points() {
        assert_eq!(ColorScale::new(vec![]), Err(ScaleError::Empty));
        let unsorted = ColorScale::new(vec![
            ControlPoint { value: 10.0, color: Color::rgb(0, 0, 0) },
            ControlPoint { value: 5.0, color: Color::rgb(0, 0, 0) },
        ]);
        assert_eq!(unsorted, Err(ScaleError::Unsorted(1)));
    }
}
