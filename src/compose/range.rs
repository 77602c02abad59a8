//! Value ranges and the shared-scale computation for linked axes

use serde::{Deserialize, Serialize};

use super::series::{Point, Series};

/// Closed value range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Range of the y values of `points`, `None` when there are none
    pub fn of_y(points: &[Point]) -> Option<Bounds> {
        Self::fold(points.iter().map(|p| p.y))
    }

    /// Range of the x values of `points`, `None` when there are none
    pub fn of_x(points: &[Point]) -> Option<Bounds> {
        Self::fold(points.iter().map(|p| p.x))
    }

    fn fold(values: impl Iterator<Item = f64>) -> Option<Bounds> {
        values.fold(None, |acc: Option<Bounds>, v| {
            Some(match acc {
                Some(b) => Bounds {
                    min: b.min.min(v),
                    max: b.max.max(v),
                },
                None => Bounds { min: v, max: v },
            })
        })
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// One range covering every linked series: the minimum of the series minima
/// and the maximum of the series maxima. Empty series do not contribute.
pub fn shared_bounds<'a>(series: impl IntoIterator<Item = &'a Series>) -> Option<Bounds> {
    series
        .into_iter()
        .filter_map(Series::y_bounds)
        .reduce(Bounds::union)
}
