// Scoring helpers shared by recommendations and similarity

use std::collections::BTreeSet;

/// Normalize a value to [0, 1] given its range
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max - min < f64::EPSILON {
        0.0
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// 1.0 when `a == b`, falling linearly to 0.0 at a distance of `span`
pub fn proximity(a: u8, b: u8, span: u8) -> f64 {
    if span == 0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    let distance = f64::from(a.abs_diff(b));
    (1.0 - distance / f64::from(span)).clamp(0.0, 1.0)
}

/// Shared tags over union size; 0.0 when both sets are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
