//! Common utilities for superbook-deskew
//!
//! Unit conversions and angle arithmetic shared by the pipeline stages.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Resolution assumed when an image carries none (DPI)
pub const DEFAULT_DPI: f64 = 96.0;

/// Typographic points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Return `dpi` if it is a usable resolution, otherwise [`DEFAULT_DPI`]
#[inline]
pub fn effective_dpi(dpi: f64) -> f64 {
    if dpi.is_finite() && dpi > 0.0 {
        dpi
    } else {
        DEFAULT_DPI
    }
}

/// Convert a font size in points to pixels at given DPI
#[inline]
pub fn points_to_pixels(points: f64, dpi: f64) -> f64 {
    points * effective_dpi(dpi) / POINTS_PER_INCH
}

/// Smallest power of two that is >= `value`, capped at `cap`
///
/// `cap` itself is not required to be a power of two; the result never
/// exceeds it.
#[inline]
pub fn next_power_of_two_capped(value: u32, cap: u32) -> u32 {
    value.max(1).checked_next_power_of_two().unwrap_or(cap).min(cap)
}

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Reduce an angle into the acute range (-π/2, π/2]
///
/// Lines have no direction, so `a` and `a + π` describe the same line.
pub fn reduce_acute(angle: f64) -> f64 {
    let mut a = angle % PI;
    if a <= -FRAC_PI_2 {
        a += PI;
    } else if a > FRAC_PI_2 {
        a -= PI;
    }
    a
}

/// Fold an angle into (-π/4, π/4] modulo a quarter turn
pub fn fold_quarter_turn(angle: f64) -> f64 {
    let mut a = angle % FRAC_PI_2;
    if a <= -FRAC_PI_4 {
        a += FRAC_PI_2;
    } else if a > FRAC_PI_4 {
        a -= FRAC_PI_2;
    }
    a
}

/// Calculate mean of values, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
