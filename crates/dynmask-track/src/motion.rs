use glam::DVec3;

use crate::trajectory::MotionClass;

/// Default dynamic distance threshold in meters.
pub const DEFAULT_DYNAMIC_THRESHOLD: f64 = 0.3;

/// Motion statistics of a sequence of world-frame centers.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionStats {
    /// Largest distance of any center from the first one.
    pub max_displacement: f64,
    /// Sum of distances between consecutive centers.
    pub path_length: f64,
    /// Speed per sample; the first sample has speed 0.
    pub speeds: Vec<f64>,
}

/// Compute motion statistics from `(timestamp, center)` samples ordered by frame.
///
/// A non-positive time step yields a speed of 0 for that sample.
pub fn motion_stats(samples: &[(f64, [f64; 3])]) -> MotionStats {
    let centers = samples
        .iter()
        .map(|(_, c)| DVec3::from_array(*c))
        .collect::<Vec<_>>();

    let Some(first) = centers.first() else {
        return MotionStats {
            max_displacement: 0.0,
            path_length: 0.0,
            speeds: Vec::new(),
        };
    };

    let max_displacement = centers
        .iter()
        .map(|c| first.distance(*c))
        .fold(0.0, f64::max);

    let mut speeds = Vec::with_capacity(centers.len());
    speeds.push(0.0);
    let mut path_length = 0.0;
    for i in 1..centers.len() {
        let step = centers[i - 1].distance(centers[i]);
        path_length += step;
        let dt = samples[i].0 - samples[i - 1].0;
        speeds.push(if dt > 0.0 { step / dt } else { 0.0 });
    }

    MotionStats {
        max_displacement,
        path_length,
        speeds,
    }
}

/// Classify an object from its number of valid frames and maximum displacement.
///
/// Fewer than two valid frames means no displacement is observable, so the
/// object is static.
pub fn classify(num_valid_frames: usize, max_displacement: f64, threshold: f64) -> MotionClass {
    if num_valid_frames >= 2 && max_displacement > threshold {
        MotionClass::Dynamic
    } else {
        MotionClass::Static
    }
}
