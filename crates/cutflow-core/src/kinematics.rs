//! Small kinematics helpers shared by cuts and histogrammers.

use std::f64::consts::{PI, TAU};

/// Azimuthal separation of two angles folded into `[0, π]`.
///
/// The raw difference is normalised into `[0, 2π)` before folding, so the
/// result is symmetric and periodic in both arguments for any finite input.
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let diff = (phi1 - phi2).rem_euclid(TAU);
    let folded = diff.min(TAU - diff);
    // rem_euclid may round up to exactly 2π for tiny negative inputs.
    folded.clamp(0.0, PI)
}

/// Returns true when `|eta|` does not exceed `max`.
pub fn abs_eta_within(eta: f64, max: f64) -> bool {
    eta.abs() <= max
}
