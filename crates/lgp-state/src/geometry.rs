//! Configuration vectors, obstacle shapes and sampled trajectories.

use serde::{Deserialize, Serialize};

/// A point in configuration space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Vec<f64>);

impl Configuration {
    /// Create a configuration from coordinates.
    pub fn new(coords: Vec<f64>) -> Self {
        Self(coords)
    }

    /// The origin of a `dim`-dimensional space.
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance; missing coordinates count as zero.
    pub fn distance(&self, other: &Configuration) -> f64 {
        let dim = self.dim().max(other.dim());
        (0..dim)
            .map(|i| {
                let d = self.get(i) - other.get(i);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Component-wise sum.
    pub fn offset(&self, by: &Configuration) -> Configuration {
        let dim = self.dim().max(by.dim());
        Self((0..dim).map(|i| self.get(i) + by.get(i)).collect())
    }

    /// Linear interpolation, `alpha` in `[0, 1]`.
    pub fn lerp(&self, to: &Configuration, alpha: f64) -> Configuration {
        let dim = self.dim().max(to.dim());
        Self(
            (0..dim)
                .map(|i| self.get(i) + (to.get(i) - self.get(i)) * alpha)
                .collect(),
        )
    }

    fn get(&self, i: usize) -> f64 {
        self.0.get(i).copied().unwrap_or(0.0)
    }
}

impl From<Vec<f64>> for Configuration {
    fn from(coords: Vec<f64>) -> Self {
        Self(coords)
    }
}

/// A configuration the trajectory must pass through at a relative tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub configuration: Configuration,
    pub time: u64,
}

impl Waypoint {
    pub fn new(configuration: Configuration, time: u64) -> Self {
        Self {
            configuration,
            time,
        }
    }
}

/// Obstacle geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle { origin: Configuration, radius: f64 },
}

impl Shape {
    /// Signed distance from `point` to the shape boundary (negative inside).
    pub fn signed_distance(&self, point: &Configuration) -> f64 {
        match self {
            Shape::Circle { origin, radius } => origin.distance(point) - radius,
        }
    }

    pub fn origin(&self) -> &Configuration {
        match self {
            Shape::Circle { origin, .. } => origin,
        }
    }
}

/// A trajectory sampled once per planning tick; index 0 is the start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    configurations: Vec<Configuration>,
}

impl Trajectory {
    pub fn new(configurations: Vec<Configuration>) -> Self {
        Self { configurations }
    }

    /// Straight-line interpolation through time-stamped waypoints.
    ///
    /// Waypoints are expected in increasing time order; a waypoint that does
    /// not advance time replaces the previous sample.
    pub fn linear_interpolation(waypoints: &[Waypoint]) -> Self {
        let Some(first) = waypoints.first() else {
            return Self::default();
        };
        let mut configurations = vec![first.configuration.clone()];
        let mut prev = first;
        for next in &waypoints[1..] {
            if next.time <= prev.time {
                if let Some(last) = configurations.last_mut() {
                    *last = next.configuration.clone();
                }
                prev = next;
                continue;
            }
            let span = (next.time - prev.time) as f64;
            for step in 1..=(next.time - prev.time) {
                let alpha = step as f64 / span;
                configurations.push(prev.configuration.lerp(&next.configuration, alpha));
            }
            prev = next;
        }
        Self { configurations }
    }

    /// Sample at tick `t`, holding the final configuration afterwards.
    pub fn configuration(&self, t: u64) -> Option<&Configuration> {
        let last = self.configurations.len().checked_sub(1)?;
        let index = usize::try_from(t).map_or(last, |t| t.min(last));
        self.configurations.get(index)
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(coords: &[f64]) -> Configuration {
        Configuration::new(coords.to_vec())
    }

    #[test]
    fn test_distance_and_offset() {
        assert_eq!(c(&[0.0, 0.0]).distance(&c(&[3.0, 4.0])), 5.0);
        assert_eq!(c(&[1.0, 2.0]).offset(&c(&[0.5, 0.5])), c(&[1.5, 2.5]));
        assert_eq!(Configuration::zeros(3).dim(), 3);
    }

    #[test]
    fn test_linear_interpolation() {
        let traj = Trajectory::linear_interpolation(&[
            Waypoint::new(c(&[0.0, 0.0]), 0),
            Waypoint::new(c(&[4.0, 0.0]), 4),
            Waypoint::new(c(&[4.0, 2.0]), 6),
        ]);
        assert_eq!(traj.len(), 7);
        assert_eq!(traj.configuration(1), Some(&c(&[1.0, 0.0])));
        assert_eq!(traj.configuration(4), Some(&c(&[4.0, 0.0])));
        assert_eq!(traj.configuration(5), Some(&c(&[4.0, 1.0])));
        assert_eq!(traj.configuration(100), Some(&c(&[4.0, 2.0])));
    }

    #[test]
    fn test_interpolation_holds_position() {
        let traj = Trajectory::linear_interpolation(&[
            Waypoint::new(c(&[1.0]), 0),
            Waypoint::new(c(&[1.0]), 3),
        ]);
        assert!(traj.configurations().iter().all(|q| q == &c(&[1.0])));
    }

    #[test]
    fn test_empty_trajectory() {
        let traj = Trajectory::linear_interpolation(&[]);
        assert!(traj.is_empty());
        assert!(traj.configuration(0).is_none());
    }

    #[test]
    fn test_circle_signed_distance() {
        let circle = Shape::Circle {
            origin: c(&[0.0, 0.0]),
            radius: 1.0,
        };
        assert_eq!(circle.signed_distance(&c(&[2.0, 0.0])), 1.0);
        assert!(circle.signed_distance(&c(&[0.5, 0.0])) < 0.0);
    }
}
