use crate::geometry::Point;

/// Snap a coordinate to the nearest multiple of `grid`.
///
/// The quotient is rounded half away from zero, so `snap(15.0, 10.0)` is `20.0`
/// and `snap(-15.0, 10.0)` is `-20.0`. A non-positive grid disables snapping.
///
/// # Arguments
/// * `value` - Coordinate to snap
/// * `grid` - Grid cell size (0 = off)
pub fn snap(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 || !grid.is_finite() {
        return value;
    }
    grid * (value / grid).round()
}

/// Snap both axes of a point independently.
pub fn snap_point(p: Point, grid: f32) -> Point {
    Point::new(snap(p.x, grid), snap(p.y, grid))
}

/// Whether `value` is an exact multiple of `grid`.
pub fn is_on_grid(value: f32, grid: f32) -> bool {
    if grid <= 0.0 {
        return true;
    }
    snap(value, grid) == value
}
