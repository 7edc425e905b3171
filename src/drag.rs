//! Constrained pointer dragging for arbitrary visual elements.
//!
//! A [`Draggable`] turns one pointer-down / pointer-move* / pointer-up gesture
//! into moves of a [`DragElement`], with optional grid snapping, per-axis or
//! container bounds, a start threshold and zoom-aware delta mapping. It is
//! used for graph nodes and for palette entries alike.
//!
//! The engine never owns the element. The host (or the editor) passes the
//! element into every call, so the same engine works for anything that can
//! report and accept a position.
//!
//! # Example
//!
//! ```ignore
//! use slint_graph_connect::{DragOptions, Draggable, PointerEvent};
//!
//! let options = DragOptions::default()
//!     .with_grid(10.0)
//!     .on_drag_end(|x, y, _event| println!("dropped at {x},{y}"));
//! let mut drag = Draggable::new(&mut element, options)?;
//!
//! drag.pointer_down(&mut element, &PointerEvent::mouse(5.0, 5.0));
//! drag.pointer_move(&mut element, &PointerEvent::mouse(40.0, 12.0));
//! drag.pointer_up(&mut element, &PointerEvent::mouse(40.0, 12.0));
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{EditorError, Result};
use crate::geometry::{Point, Rect, Size};
use crate::grid::snap_point;
use crate::hit_test::HitTarget;

/// z-index given to an element for the duration of its drag.
pub const DRAG_Z_INDEX: i32 = 10_000;

/// Input device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
}

/// A pointer (mouse or first touch point) event in client coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub source: PointerSource,
    /// Element under the pointer, if the host already resolved it.
    pub target: Option<HitTarget>,
    /// The pointer is over editable content; default handling must not be suppressed.
    pub editable_target: bool,
}

impl PointerEvent {
    pub fn mouse(x: f32, y: f32) -> Self {
        Self { x, y, ..Default::default() }
    }

    pub fn touch(x: f32, y: f32) -> Self {
        Self { x, y, source: PointerSource::Touch, ..Default::default() }
    }

    pub fn with_target(mut self, target: HitTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable_target = true;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Styling requests the engine makes when it is configured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragStyle {
    /// Promote the element to its own compositing layer.
    pub gpu_compositing: bool,
    /// Pin the element absolutely at this rectangle.
    pub absolute: Option<Rect>,
    /// Show a move cursor over the element.
    pub move_cursor: bool,
}

/// Something the engine can move.
pub trait DragElement {
    /// Current layout position.
    fn position(&self) -> Point;
    fn size(&self) -> Size;
    fn set_position(&mut self, position: Point);
    fn z_index(&self) -> Option<i32>;
    fn set_z_index(&mut self, z_index: Option<i32>);
    /// Compounded scale of all ancestors that declare a zoom, 1.0 if none.
    fn zoom(&self) -> f32 {
        1.0
    }
    fn apply_style(&mut self, _style: &DragStyle) {}
}

/// Constraint for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisLimit {
    /// Pin the axis to one value.
    Fixed(f32),
    /// Clamp into `[min, max]`.
    Range(f32, f32),
}

impl AxisLimit {
    pub fn apply(&self, value: f32) -> f32 {
        match *self {
            AxisLimit::Fixed(v) => v,
            AxisLimit::Range(min, max) => clamp_range(value, min, max),
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            AxisLimit::Fixed(v) if !v.is_finite() => {
                Err(EditorError::Config(format!("fixed limit must be finite (got {v})")))
            }
            AxisLimit::Range(min, max) if !(min.is_finite() && max.is_finite()) => {
                Err(EditorError::Config("range limit bounds must be finite".into()))
            }
            AxisLimit::Range(min, max) if min > max => Err(EditorError::Config(format!(
                "range limit has min {min} greater than max {max}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Clamp without the panic `f32::clamp` raises for `min > max`.
///
/// Container limits can produce a negative max when the element is larger
/// than its container; the min check wins first, then the max.
fn clamp_range(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Maps a proposed position to a corrected one.
pub type LimitFn = Rc<dyn Fn(Point) -> Point>;

/// Bounding limit of a draggable.
#[derive(Clone, Default)]
pub enum Limit {
    #[default]
    None,
    /// Independent per-axis limits; `None` leaves that axis free.
    Axes {
        x: Option<AxisLimit>,
        y: Option<AxisLimit>,
    },
    /// Keep the element inside a container with this scrollable extent.
    Container(Size),
    Custom(LimitFn),
}

impl fmt::Debug for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::None => write!(f, "None"),
            Limit::Axes { x, y } => f.debug_struct("Axes").field("x", x).field("y", y).finish(),
            Limit::Container(size) => f.debug_tuple("Container").field(size).finish(),
            Limit::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Limit {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Point) -> Point + 'static,
    {
        Limit::Custom(Rc::new(f))
    }

    fn validate(&self) -> Result<()> {
        match self {
            Limit::Axes { x, y } => {
                if let Some(x) = x {
                    x.validate()?;
                }
                if let Some(y) = y {
                    y.validate()?;
                }
                Ok(())
            }
            Limit::Container(size) if !(size.width.is_finite() && size.height.is_finite()) => {
                Err(EditorError::Config("container extent must be finite".into()))
            }
            _ => Ok(()),
        }
    }

    /// Turn the limit into a bound function for an element of `element_size`.
    pub fn resolve(&self, element_size: Size) -> LimitFn {
        match self {
            Limit::None | Limit::Axes { x: None, y: None } => Rc::new(|p| p),
            Limit::Axes { x, y } => {
                let (x, y) = (*x, *y);
                Rc::new(move |p: Point| {
                    Point::new(
                        x.map_or(p.x, |l| l.apply(p.x)),
                        y.map_or(p.y, |l| l.apply(p.y)),
                    )
                })
            }
            Limit::Container(extent) => {
                let max_x = extent.width - element_size.width;
                let max_y = extent.height - element_size.height;
                Rc::new(move |p: Point| {
                    Point::new(clamp_range(p.x, 0.0, max_x), clamp_range(p.y, 0.0, max_y))
                })
            }
            Limit::Custom(f) => f.clone(),
        }
    }
}

/// Callback receiving the element position and the triggering event.
pub type DragCallback = Rc<dyn Fn(f32, f32, &PointerEvent)>;
/// Returns `false` to refuse a drag for this event.
pub type TargetFilter = Rc<dyn Fn(&PointerEvent) -> bool>;

/// Options for a [`Draggable`].
///
/// Defaults: no grid, no limit, no threshold, smooth drag, GPU compositing and
/// absolute positioning on, cursor styling off, no-op callbacks.
#[derive(Clone)]
pub struct DragOptions {
    pub grid: f32,
    pub limit: Limit,
    pub threshold: f32,
    pub set_cursor: bool,
    pub set_position: bool,
    pub smooth_drag: bool,
    pub use_gpu: bool,
    pub filter_target: Option<TargetFilter>,
    pub on_drag_start: Option<DragCallback>,
    pub on_drag: Option<DragCallback>,
    pub on_drag_end: Option<DragCallback>,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            grid: 0.0,
            limit: Limit::None,
            threshold: 0.0,
            set_cursor: false,
            set_position: true,
            smooth_drag: true,
            use_gpu: true,
            filter_target: None,
            on_drag_start: None,
            on_drag: None,
            on_drag_end: None,
        }
    }
}

impl fmt::Debug for DragOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragOptions")
            .field("grid", &self.grid)
            .field("limit", &self.limit)
            .field("threshold", &self.threshold)
            .field("set_cursor", &self.set_cursor)
            .field("set_position", &self.set_position)
            .field("smooth_drag", &self.smooth_drag)
            .field("use_gpu", &self.use_gpu)
            .finish_non_exhaustive()
    }
}

impl DragOptions {
    pub fn with_grid(mut self, grid: f32) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_smooth_drag(mut self, smooth: bool) -> Self {
        self.smooth_drag = smooth;
        self
    }

    pub fn with_cursor(mut self, set_cursor: bool) -> Self {
        self.set_cursor = set_cursor;
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    pub fn with_absolute_position(mut self, set_position: bool) -> Self {
        self.set_position = set_position;
        self
    }

    pub fn filter_target<F>(mut self, f: F) -> Self
    where
        F: Fn(&PointerEvent) -> bool + 'static,
    {
        self.filter_target = Some(Rc::new(f));
        self
    }

    pub fn on_drag_start<F>(mut self, f: F) -> Self
    where
        F: Fn(f32, f32, &PointerEvent) + 'static,
    {
        self.on_drag_start = Some(Rc::new(f));
        self
    }

    pub fn on_drag<F>(mut self, f: F) -> Self
    where
        F: Fn(f32, f32, &PointerEvent) + 'static,
    {
        self.on_drag = Some(Rc::new(f));
        self
    }

    pub fn on_drag_end<F>(mut self, f: F) -> Self
    where
        F: Fn(f32, f32, &PointerEvent) + 'static,
    {
        self.on_drag_end = Some(Rc::new(f));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.grid.is_finite() || self.grid < 0.0 {
            return Err(EditorError::Config(format!("grid must be >= 0 (got {})", self.grid)));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(EditorError::Config(format!(
                "threshold must be >= 0 (got {})",
                self.threshold
            )));
        }
        self.limit.validate()
    }
}

/// Transient state of one in-progress gesture.
#[derive(Clone)]
pub struct DragSession {
    pub pointer_origin: Point,
    pub element_origin: Point,
    /// Zoom factor sampled at pointer-down.
    pub zoom: f32,
    /// Threshold crossed and `on_drag_start` fired.
    pub started: bool,
    bound: LimitFn,
    saved_z_index: Option<i32>,
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("pointer_origin", &self.pointer_origin)
            .field("element_origin", &self.element_origin)
            .field("zoom", &self.zoom)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// Result of a pointer-down on the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Not ours: filtered out, engine destroyed, or another gesture running.
    Rejected,
    /// Gesture captured. The host should suppress its default drag handling
    /// when `suppress_default` is set.
    Captured { suppress_default: bool },
}

impl PressOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, PressOutcome::Captured { .. })
    }
}

/// Effect of one pointer-move past the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragStep {
    /// This move crossed the threshold and fired `on_drag_start`.
    pub started: bool,
    /// The element position changed and `on_drag` fired.
    pub moved: bool,
    pub position: Point,
}

/// Effect of the pointer-up that ended a gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRelease {
    /// The threshold was crossed during the gesture and `on_drag_end` fired.
    pub started: bool,
    pub position: Point,
}

/// Pointer-driven mover for one element.
pub struct Draggable {
    options: DragOptions,
    dimensions: Rect,
    position: Point,
    session: Option<DragSession>,
    destroyed: bool,
}

impl fmt::Debug for Draggable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draggable")
            .field("options", &self.options)
            .field("position", &self.position)
            .field("session", &self.session)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Draggable {
    /// Create an engine for `element`, applying the styling the options ask for.
    pub fn new<E: DragElement + ?Sized>(element: &mut E, options: DragOptions) -> Result<Self> {
        let mut draggable = Self {
            options: DragOptions::default(),
            dimensions: Rect::default(),
            position: Point::ORIGIN,
            session: None,
            destroyed: false,
        };
        draggable.configure(element, options)?;
        Ok(draggable)
    }

    /// Replace the options and re-read the element geometry.
    ///
    /// An in-progress gesture keeps its sampled limit and zoom.
    pub fn configure<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        options: DragOptions,
    ) -> Result<()> {
        options.validate()?;
        let origin = element.position();
        let size = element.size();
        if !origin.is_finite() || !size.is_valid() {
            return Err(EditorError::Config(format!(
                "element geometry is not usable (position {origin:?}, size {size:?})"
            )));
        }

        self.dimensions = Rect::new(origin, size);
        element.apply_style(&DragStyle {
            gpu_compositing: options.use_gpu,
            absolute: options.set_position.then_some(self.dimensions),
            move_cursor: options.set_cursor,
        });
        self.options = options;
        if self.session.is_none() {
            self.position = origin;
        }
        Ok(())
    }

    /// Change only the bounding limit.
    pub fn set_limit<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        limit: Limit,
    ) -> Result<()> {
        let options = self.options.clone().with_limit(limit);
        self.configure(element, options)
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    /// Logical position of the element.
    pub fn current_position(&self) -> Point {
        self.position
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Move programmatically through the same limit and snap pipeline as a drag.
    ///
    /// Returns `true` if the position changed.
    pub fn set_position<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        target: Point,
    ) -> bool {
        let bound = self.options.limit.resolve(self.dimensions.size);
        self.move_to(element, target, &bound)
    }

    /// Pointer pressed on the handle.
    pub fn pointer_down<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        event: &PointerEvent,
    ) -> PressOutcome {
        if self.destroyed || self.session.is_some() {
            return PressOutcome::Rejected;
        }
        if let Some(filter) = &self.options.filter_target {
            if !filter(event) {
                return PressOutcome::Rejected;
            }
        }

        let saved_z_index = element.z_index();
        element.set_z_index(Some(DRAG_Z_INDEX));

        let element_origin = element.position();
        self.position = element_origin;
        self.dimensions.origin = element_origin;
        self.dimensions.size = element.size();

        let zoom = element.zoom();
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };

        self.session = Some(DragSession {
            pointer_origin: event.position(),
            element_origin,
            zoom,
            started: false,
            bound: self.options.limit.resolve(self.dimensions.size),
            saved_z_index,
        });
        trace!(x = event.x, y = event.y, zoom, "drag pressed");

        PressOutcome::Captured { suppress_default: !event.editable_target }
    }

    /// Pointer moved while a gesture is active.
    ///
    /// Returns `None` when no gesture is active or the threshold has not been
    /// crossed yet; nothing moves and no callback fires in that case.
    pub fn pointer_move<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        event: &PointerEvent,
    ) -> Option<DragStep> {
        let session = self.session.as_mut()?;

        let raw_dx = event.x - session.pointer_origin.x;
        let raw_dy = event.y - session.pointer_origin.y;
        let candidate = Point::new(
            session.element_origin.x + raw_dx / session.zoom,
            session.element_origin.y + raw_dy / session.zoom,
        );

        let threshold = self.options.threshold;
        if !session.started
            && threshold > 0.0
            && raw_dx.abs() < threshold
            && raw_dy.abs() < threshold
        {
            return None;
        }

        let started = !session.started;
        session.started = true;
        let bound = session.bound.clone();

        if started {
            if let Some(cb) = &self.options.on_drag_start {
                cb(candidate.x, candidate.y, event);
            }
        }

        let moved = self.move_to(element, candidate, &bound);
        if moved {
            if let Some(cb) = &self.options.on_drag {
                cb(self.position.x, self.position.y, event);
            }
        }

        Some(DragStep { started, moved, position: self.position })
    }

    /// Pointer released; ends the gesture.
    pub fn pointer_up<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        event: &PointerEvent,
    ) -> Option<DragRelease> {
        let session = self.session.take()?;
        element.set_z_index(session.saved_z_index);

        // A gesture that never started leaves the element where it was. The
        // limit is applied after the snap, so the bound wins over the grid.
        let grid = self.options.grid;
        if session.started && self.options.smooth_drag && grid > 0.0 {
            let snapped = (session.bound)(snap_point(self.position, grid));
            self.apply(element, snapped);
        }

        if session.started {
            if let Some(cb) = &self.options.on_drag_end {
                cb(self.position.x, self.position.y, event);
            }
        }
        trace!(
            x = self.position.x,
            y = self.position.y,
            started = session.started,
            "drag released"
        );

        Some(DragRelease { started: session.started, position: self.position })
    }

    /// Abort an active gesture without further callbacks.
    ///
    /// The element keeps its current position and gets its z-index back.
    pub fn cancel<E: DragElement + ?Sized>(&mut self, element: &mut E) -> bool {
        match self.session.take() {
            Some(session) => {
                element.set_z_index(session.saved_z_index);
                true
            }
            None => false,
        }
    }

    /// Stop reacting to pointer events. Safe to call repeatedly.
    pub fn destroy<E: DragElement + ?Sized>(&mut self, element: &mut E) {
        self.cancel(element);
        self.destroyed = true;
    }

    fn move_to<E: DragElement + ?Sized>(
        &mut self,
        element: &mut E,
        candidate: Point,
        bound: &LimitFn,
    ) -> bool {
        let mut pos = bound(candidate);
        let grid = self.options.grid;
        if !self.options.smooth_drag && grid > 0.0 {
            pos = snap_point(pos, grid);
        }
        self.apply(element, pos)
    }

    fn apply<E: DragElement + ?Sized>(&mut self, element: &mut E, pos: Point) -> bool {
        if pos == self.position {
            return false;
        }
        self.position = pos;
        element.set_position(pos);
        true
    }
}
