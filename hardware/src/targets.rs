//! Target lists for mirror runs.
//!
//! Targets are given on the command line as `x,y` pairs in normalized
//! focal-plane units, or generated as a zig-zag raster.

use optics::{OpticsError, OpticsResult, TargetPosition};

/// The three corners visited by the reference bench run.
pub fn reference_targets() -> Vec<TargetPosition> {
    TargetPosition::REFERENCE_RUN.to_vec()
}

/// Zig-zag raster across the focal plane.
///
/// `points` evenly spaced x positions from `-span` to `span` (inclusive);
/// y alternates between `span` and `-span`, starting high.
///
/// # Returns
/// * `Ok(Vec<TargetPosition>)` - The raster in visiting order
/// * `Err(OpticsError::Domain)` - If `span` is not a number in [-1, 1] or
///   `points` is zero
pub fn raster_path(points: usize, span: f64) -> OpticsResult<Vec<TargetPosition>> {
    if !span.is_finite() || span.abs() > 1.0 {
        return Err(OpticsError::Domain(format!(
            "raster span {span} is outside the normalized range [-1, 1]"
        )));
    }
    if points == 0 {
        return Err(OpticsError::Domain(
            "raster needs at least one point".to_string(),
        ));
    }

    (0..points)
        .map(|i| {
            // fraction runs -1..=1 exactly, so |x| never exceeds |span|
            let fraction = if points > 1 {
                2.0 * i as f64 / (points - 1) as f64 - 1.0
            } else {
                -1.0
            };
            let y = if i % 2 == 0 { span } else { -span };
            TargetPosition::new(span * fraction, y)
        })
        .collect()
}

/// Parse an `x,y` target argument.
///
/// # Examples
/// - `"0.5,-0.25"` - half right, quarter down
/// - `"0,0"` - focal plane center
pub fn parse_target(s: &str) -> Result<TargetPosition, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| "Target must be in format 'x,y'".to_string())?;

    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid x value: {}", x.trim()))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid y value: {}", y.trim()))?;

    TargetPosition::new(x, y).map_err(|e| e.to_string())
}
