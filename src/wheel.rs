//! Wheel configuration and landing math.
//!
//! Each segment's angular sweep is `weight / Σweights * 360°`. Sweeps are laid out
//! clockwise from 0° in table order, so together they partition the full circle.

use crate::types::{SegmentKind, WheelSegment};
use rand::Rng;

/// Margin kept between a landing angle and the segment border
const EDGE_MARGIN_DEG: f64 = 2.0;

fn segment(id: u32, label: &str, value: i64, kind: SegmentKind, weight: f64) -> WheelSegment {
    WheelSegment {
        id,
        label: label.to_string(),
        value,
        kind,
        weight,
    }
}

/// The default table. No BANKRUPT segment is active; the kind stays reserved.
pub fn default_segments() -> Vec<WheelSegment> {
    use SegmentKind::*;
    vec![
        segment(0, "LOSE A TURN", 0, LoseTurn, 1.0),
        segment(1, "1000", 1000, Cash, 0.5),
        segment(2, "300", 300, Cash, 2.0),
        segment(3, "500", 500, Cash, 2.0),
        segment(4, "200", 200, Cash, 2.0),
        segment(5, "600", 600, Cash, 2.0),
        segment(6, "100", 100, Cash, 2.0),
        segment(7, "400", 400, Cash, 2.0),
        segment(8, "250", 250, Cash, 2.0),
        segment(9, "700", 700, Cash, 2.0),
        segment(10, "150", 150, Cash, 2.0),
        segment(11, "350", 350, Cash, 2.0),
        segment(12, "900", 900, Cash, 0.5),
    ]
}

#[derive(Debug, Clone)]
pub struct Wheel {
    segments: Vec<WheelSegment>,
    total_weight: f64,
}

impl Default for Wheel {
    fn default() -> Self {
        Self::new(default_segments())
    }
}

impl Wheel {
    /// Build a wheel. Segments with a non-positive or non-finite weight are dropped.
    pub fn new(segments: Vec<WheelSegment>) -> Self {
        let segments: Vec<WheelSegment> = segments
            .into_iter()
            .filter(|s| s.weight.is_finite() && s.weight > 0.0)
            .collect();
        let total_weight = segments.iter().map(|s| s.weight).sum();
        Self {
            segments,
            total_weight,
        }
    }

    pub fn segments(&self) -> &[WheelSegment] {
        &self.segments
    }

    pub fn get(&self, id: u32) -> Option<&WheelSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// `(start_deg, end_deg)` per segment, in table order
    pub fn sweeps(&self) -> Vec<(f64, f64)> {
        let mut start = 0.0;
        let mut sweeps = Vec::with_capacity(self.segments.len());
        for (i, seg) in self.segments.iter().enumerate() {
            // Pin the last border to 360 so float drift never leaves a gap
            let end = if i + 1 == self.segments.len() {
                360.0
            } else {
                start + seg.weight / self.total_weight * 360.0
            };
            sweeps.push((start, end));
            start = end;
        }
        sweeps
    }

    /// Weighted pick: segment `i` lands with probability `weight_i / Σweights`
    pub fn pick_segment<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&WheelSegment> {
        if self.segments.is_empty() {
            return None;
        }
        let mut roll = rng.random_range(0.0..self.total_weight);
        for seg in &self.segments {
            if roll < seg.weight {
                return Some(seg);
            }
            roll -= seg.weight;
        }
        self.segments.last()
    }

    /// Random angle strictly inside the segment's sweep
    pub fn landing_angle<R: Rng + ?Sized>(&self, id: u32, rng: &mut R) -> Option<f64> {
        let idx = self.segments.iter().position(|s| s.id == id)?;
        let (start, end) = self.sweeps()[idx];
        let margin = EDGE_MARGIN_DEG.min((end - start) / 4.0);
        Some(rng.random_range((start + margin)..(end - margin)))
    }

    /// Inverse of [`Wheel::sweeps`]: which segment covers `angle`
    pub fn segment_at(&self, angle: f64) -> Option<&WheelSegment> {
        let angle = angle.rem_euclid(360.0);
        self.sweeps()
            .iter()
            .position(|(start, end)| angle >= *start && angle < *end)
            .and_then(|idx| self.segments.get(idx))
    }
}

/// Cumulative clockwise rotation that puts `landing_deg` under the pointer at the top.
///
/// Rotating the wheel clockwise by `r` brings the wheel angle `(360 - r) mod 360` under the
/// pointer. The result always moves forward by at least `extra_turns` full turns.
pub fn target_rotation(current_deg: f64, landing_deg: f64, extra_turns: u32) -> f64 {
    let wanted = (360.0 - landing_deg).rem_euclid(360.0);
    let here = current_deg.rem_euclid(360.0);
    let delta = (wanted - here).rem_euclid(360.0);
    current_deg + f64::from(extra_turns) * 360.0 + delta
}

/// Wheel angle under the pointer after a cumulative rotation
pub fn pointer_angle(rotation_deg: f64) -> f64 {
    (360.0 - rotation_deg.rem_euclid(360.0)).rem_euclid(360.0)
}
