//! Palette of node types that can be dragged onto the canvas.
//!
//! One entry per registered type, stacked vertically in registration order in
//! a column left of the canvas. Entries are moved with the same drag engine
//! as nodes; a finished drag yields a [`PaletteDrop`] and the entry snaps back
//! home.

use tracing::debug;

use crate::drag::{DragElement, DragOptions, Draggable, PointerEvent};
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::node_type::TypeRegistry;

/// A palette entry as the host renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteItem {
    pub type_name: String,
    pub tooltip: Option<String>,
    pub home: Point,
    pub position: Point,
    pub size: Size,
    pub z_index: Option<i32>,
}

impl PaletteItem {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

impl DragElement for PaletteItem {
    fn position(&self) -> Point {
        self.position
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn z_index(&self) -> Option<i32> {
        self.z_index
    }

    fn set_z_index(&mut self, z_index: Option<i32>) {
        self.z_index = z_index;
    }
}

/// A palette entry released after a real drag.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteDrop {
    pub type_name: String,
    /// Where the entry's top-left corner was released, in palette coordinates.
    pub position: Point,
}

#[derive(Debug)]
pub struct Palette {
    items: Vec<PaletteItem>,
    draggers: Vec<Draggable>,
    active: Option<usize>,
}

impl Palette {
    pub fn new(registry: &TypeRegistry, width: f32, item_height: f32) -> Result<Self> {
        let mut items = Vec::with_capacity(registry.len());
        let mut draggers = Vec::with_capacity(registry.len());
        for (i, node_type) in registry.iter().enumerate() {
            let home = Point::new(0.0, i as f32 * item_height);
            let mut item = PaletteItem {
                type_name: node_type.name().to_string(),
                tooltip: node_type.tooltip().map(str::to_string),
                home,
                position: home,
                size: Size::new(width, item_height),
                z_index: None,
            };
            draggers.push(Draggable::new(&mut item, DragOptions::default())?);
            items.push(item);
        }
        Ok(Self { items, draggers, active: None })
    }

    pub fn items(&self) -> &[PaletteItem] {
        &self.items
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Entry under `point`, topmost (the dragged one) first.
    pub fn item_at(&self, point: Point) -> Option<usize> {
        if let Some(i) = self.active.filter(|i| self.items[*i].rect().contains(point)) {
            return Some(i);
        }
        self.items.iter().position(|item| item.rect().contains(point))
    }

    pub fn item_named(&self, type_name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.type_name == type_name)
    }

    /// Start dragging entry `index`.
    pub fn press(&mut self, index: usize, event: &PointerEvent) -> bool {
        if self.active.is_some() {
            return false;
        }
        let (Some(item), Some(dragger)) = (self.items.get_mut(index), self.draggers.get_mut(index))
        else {
            return false;
        };
        let captured = dragger.pointer_down(item, event).is_captured();
        if captured {
            self.active = Some(index);
        }
        captured
    }

    /// Returns the dragged entry's new position when it moved.
    pub fn drag(&mut self, event: &PointerEvent) -> Option<Point> {
        let i = self.active?;
        let step = self.draggers[i].pointer_move(&mut self.items[i], event)?;
        step.moved.then_some(step.position)
    }

    /// Finish the drag. The entry returns home either way.
    pub fn release(&mut self, event: &PointerEvent) -> Option<PaletteDrop> {
        let i = self.active.take()?;
        let item = &mut self.items[i];
        let release = self.draggers[i].pointer_up(item, event)?;
        let home = item.home;
        self.draggers[i].set_position(item, home);
        if !release.started {
            return None;
        }
        debug!(
            type_name = %item.type_name,
            x = release.position.x,
            y = release.position.y,
            "palette entry dropped"
        );
        Some(PaletteDrop {
            type_name: item.type_name.clone(),
            position: release.position,
        })
    }

    /// Abort the drag and send the entry home.
    pub fn cancel(&mut self) -> bool {
        let Some(i) = self.active.take() else {
            return false;
        };
        let item = &mut self.items[i];
        self.draggers[i].cancel(item);
        let home = item.home;
        self.draggers[i].set_position(item, home);
        true
    }
}
