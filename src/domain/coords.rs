// Unit conversion between the on-chain fixed-point grid and render space.

use crate::domain::tuning::SCALING_FACTOR;
use serde::{Deserialize, Serialize};

/// Half the side of the logical 100x100 grid; render space is centered on it.
pub const GRID_HALF_EXTENT: f64 = 50.0;

/// Any incoming `x` above this is assumed to still be in chain space.
///
/// Upstream payloads do not say which space they are in, so the magnitude of
/// `x` is the only signal. A malformed raw value that happens to sit at or
/// below the threshold will be taken as already normalized. Kept as-is for
/// compatibility with existing data.
pub const RAW_DETECTION_THRESHOLD: f64 = 100.0;

/// Position in normalized render space, roughly [-50, 50] per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

impl Coords {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Coords) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset_by(&self, dx: f64, dy: f64) -> Coords {
        Coords::new(self.x + dx, self.y + dy)
    }

    /// True while the point is inside the visible grid.
    pub fn in_bounds(&self) -> bool {
        let range = -GRID_HALF_EXTENT..=GRID_HALF_EXTENT;
        range.contains(&self.x) && range.contains(&self.y)
    }
}

/// Position in on-chain grid space, [0, 100_000) per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RawCoords {
    pub x: u32,
    pub y: u32,
}

impl RawCoords {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Maps between the two coordinate spaces for a given fixed-point scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    scale: f64,
}

impl UnitConverter {
    pub fn new(scaling_factor: u32) -> Self {
        Self {
            scale: f64::from(scaling_factor.max(1)),
        }
    }

    pub fn to_render_space(&self, raw: RawCoords) -> Coords {
        Coords {
            x: f64::from(raw.x) / self.scale - GRID_HALF_EXTENT,
            y: f64::from(raw.y) / self.scale - GRID_HALF_EXTENT,
        }
    }

    /// Inverse of [`Self::to_render_space`]. Rounds to the nearest grid unit;
    /// values left of the grid saturate at zero.
    pub fn to_chain_space(&self, coords: Coords) -> RawCoords {
        RawCoords {
            x: ((coords.x + GRID_HALF_EXTENT) * self.scale).round() as u32,
            y: ((coords.y + GRID_HALF_EXTENT) * self.scale).round() as u32,
        }
    }

    /// Converts `coords` only when it still looks like chain space.
    pub fn normalize(&self, coords: Coords) -> Coords {
        if coords.x > RAW_DETECTION_THRESHOLD {
            Coords {
                x: coords.x / self.scale - GRID_HALF_EXTENT,
                y: coords.y / self.scale - GRID_HALF_EXTENT,
            }
        } else {
            coords
        }
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(SCALING_FACTOR)
    }
}

pub fn to_render_space(raw: RawCoords) -> Coords {
    UnitConverter::default().to_render_space(raw)
}

pub fn to_chain_space(coords: Coords) -> RawCoords {
    UnitConverter::default().to_chain_space(coords)
}

pub fn normalize(coords: Coords) -> Coords {
    UnitConverter::default().normalize(coords)
}

/// Splits the straight segment `from -> to` into waypoints no more than
/// `max_step` raw units apart. The result excludes `from` and ends at `to`.
pub fn split_into_submoves(from: RawCoords, to: RawCoords, max_step: u32) -> Vec<RawCoords> {
    let dx = f64::from(to.x) - f64::from(from.x);
    let dy = f64::from(to.y) - f64::from(from.y);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return Vec::new();
    }

    let steps = (length / f64::from(max_step.max(1))).ceil() as u32;
    (1..=steps)
        .map(|step| {
            if step == steps {
                return to;
            }
            let t = f64::from(step) / f64::from(steps);
            RawCoords {
                x: (f64::from(from.x) + dx * t).round() as u32,
                y: (f64::from(from.y) + dy * t).round() as u32,
            }
        })
        .collect()
}
