use crate::backproject::BackProjection;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Loop termination: an iteration cap and a minimum center shift in pixels.
#[derive(Copy, Clone, Debug)]
pub struct TermCriteria {
    pub max_iterations: u32,
    pub min_shift: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_shift: 1.0,
        }
    }
}

/// How one frame of mean shift ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Window shift fell below the threshold.
    Converged,
    /// Iteration cap hit before the window settled.
    IterationLimit,
    /// No likelihood mass under the window, window left in place.
    Lost,
}

/// Shift `window` toward the centroid of likelihood mass until it settles.
///
/// The window only translates. Dimensions are preserved and the window is
/// clamped inside the map after every step, so the returned window is always
/// positive sized and in bounds.
pub fn mean_shift(
    map: &BackProjection,
    window: &Rect,
    criteria: &TermCriteria,
) -> (Rect, TrackStatus) {
    let mut current = window.clamp_to(map.width(), map.height());

    for _ in 0..criteria.max_iterations {
        let Some(centroid) = window_centroid(map, &current) else {
            return (current, TrackStatus::Lost);
        };

        let previous = current.center();
        current = current
            .centered_at(centroid.x.round() as i32, centroid.y.round() as i32)
            .clamp_to(map.width(), map.height());

        let moved = current.center();
        let dx = (moved.x - previous.x) as f64;
        let dy = (moved.y - previous.y) as f64;
        if (dx * dx + dy * dy).sqrt() < criteria.min_shift {
            return (current, TrackStatus::Converged);
        }
    }

    (current, TrackStatus::IterationLimit)
}

/// First moment of the likelihood mass under the window, `None` on zero
/// mass. The window must already be inside the map.
fn window_centroid(map: &BackProjection, window: &Rect) -> Option<mint::Point2<f64>> {
    let mut mass = 0.0f64;
    let mut moment_x = 0.0f64;
    let mut moment_y = 0.0f64;

    for y in window.y..window.y + window.height {
        for x in window.x..window.x + window.width {
            let value = map.likelihood(x as u32, y as u32) as f64;
            mass += value;
            moment_x += value * x as f64;
            moment_y += value * y as f64;
        }
    }

    if mass <= 0.0 {
        return None;
    }

    Some(mint::Point2 {
        x: moment_x / mass,
        y: moment_y / mass,
    })
}
