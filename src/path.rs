//! Connector routing.
//!
//! A connector leaves its source anchor heading right and enters its target
//! anchor from the left. When the target is comfortably to the right of the
//! source the route is a pair of mirrored quadratic segments meeting halfway
//! (`M .. Q .. T ..`); otherwise it is a single cubic whose control points
//! reach `power` pixels out of each anchor (`M .. C ..`), which loops back
//! around when the target sits behind the source.

use std::fmt;

use crate::geometry::Point;

/// Horizontal reach of connector curves out of their anchors.
pub const ROUTE_POWER: f32 = 100.0;

/// A routed connector curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorPath {
    /// Quadratic to the midpoint, then its smooth continuation to the end.
    Smooth {
        start: Point,
        control: Point,
        mid: Point,
        end: Point,
    },
    Cubic {
        start: Point,
        c1: Point,
        c2: Point,
        end: Point,
    },
}

impl ConnectorPath {
    /// Route a connector from `start` (source side) to `end` (target side).
    pub fn route(start: Point, end: Point, power: f32) -> Self {
        if start.x + power < end.x {
            let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
            ConnectorPath::Smooth {
                start,
                control: Point::new(mid.x, start.y),
                mid,
                end,
            }
        } else {
            ConnectorPath::Cubic {
                start,
                c1: Point::new(start.x + power, start.y),
                c2: Point::new(end.x - power, end.y),
                end,
            }
        }
    }

    pub fn start(&self) -> Point {
        match *self {
            ConnectorPath::Smooth { start, .. } | ConnectorPath::Cubic { start, .. } => start,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            ConnectorPath::Smooth { end, .. } | ConnectorPath::Cubic { end, .. } => end,
        }
    }

    pub fn is_smooth(&self) -> bool {
        matches!(self, ConnectorPath::Smooth { .. })
    }

    /// SVG path commands, e.g. `M 0 0 C 100 0 100 50 0 50`.
    pub fn commands(&self) -> String {
        self.to_string()
    }

    /// Evaluate the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> Point {
        let t = t.clamp(0.0, 1.0);
        match *self {
            ConnectorPath::Smooth { start, control, mid, end } => {
                // The T segment's control point is the reflection of `control` about `mid`.
                let reflected = mid + (mid - control);
                if t < 0.5 {
                    quadratic(start, control, mid, t * 2.0)
                } else {
                    quadratic(mid, reflected, end, t * 2.0 - 1.0)
                }
            }
            ConnectorPath::Cubic { start, c1, c2, end } => cubic(start, c1, c2, end, t),
        }
    }

    /// Polyline approximation with `segments + 1` points, for hosts without
    /// an SVG path primitive.
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }
}

impl fmt::Display for ConnectorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorPath::Smooth { start, control, mid, end } => write!(
                f,
                "M {} {} Q {} {} {} {} T {} {}",
                start.x, start.y, control.x, control.y, mid.x, mid.y, end.x, end.y
            ),
            ConnectorPath::Cubic { start, c1, c2, end } => write!(
                f,
                "M {} {} C {} {} {} {} {} {}",
                start.x, start.y, c1.x, c1.y, c2.x, c2.y, end.x, end.y
            ),
        }
    }
}

fn quadratic(p0: Point, p1: Point, p2: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    Point::new(
        mt * mt * p0.x + 2.0 * mt * t * p1.x + t * t * p2.x,
        mt * mt * p0.y + 2.0 * mt * t * p1.y + t * t * p2.y,
    )
}

fn cubic(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    Point::new(
        mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x,
        mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y,
    )
}
