//! Interactive rectangle selection over the displayed raster
//!
//! Pointer positions arrive in display coordinates (the on-screen size of the frozen
//! frame). Selections are normalized so dragging in any direction yields a proper
//! top-left corner and positive size, then mapped to source pixels for extraction.

use crate::vision::Region;

/// Smallest selection (exclusive, display pixels) accepted for extraction
pub const MIN_SELECTION_SIZE: f32 = 10.0;

/// A pointer position in display coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A normalized selection rectangle in display coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SelectionRect {
    /// Rectangle spanned by two corners, in either order
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Large enough to be a deliberate selection rather than a tap
    pub fn is_valid(&self) -> bool {
        self.width > MIN_SELECTION_SIZE && self.height > MIN_SELECTION_SIZE
    }

    /// Map to source pixels given the display and source sizes
    pub fn to_region(&self, display: (f32, f32), source: (u32, u32)) -> Region {
        let (dw, dh) = display;
        let sx = source.0 as f32 / dw.max(f32::EPSILON);
        let sy = source.1 as f32 / dh.max(f32::EPSILON);

        let px = |v: f32, s: f32| (v * s).round().max(0.0) as u32;
        Region::new(px(self.x, sx), px(self.y, sy), px(self.width, sx), px(self.height, sy))
    }
}

/// Drag state for one selection surface
#[derive(Debug, Clone, Default)]
pub struct DragSelection {
    /// On-screen size of the displayed raster
    display: (f32, f32),
    /// Where the current drag started
    anchor: Option<Point>,
    /// Latest selection
    rect: Option<SelectionRect>,
    dragging: bool,
}

/// Negative and non-finite sizes collapse to an empty surface
fn surface_extent(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

impl DragSelection {
    pub fn new(display_width: f32, display_height: f32) -> Self {
        Self {
            display: (surface_extent(display_width), surface_extent(display_height)),
            ..Default::default()
        }
    }

    pub fn display_size(&self) -> (f32, f32) {
        self.display
    }

    /// Resize the display surface; an existing selection is dropped
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.display = (surface_extent(width), surface_extent(height));
        self.clear();
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.display.0), p.y.clamp(0.0, self.display.1))
    }

    /// Pointer down: start a new zero-size selection
    pub fn begin(&mut self, at: Point) {
        let at = self.clamp(at);
        self.anchor = Some(at);
        self.rect = Some(SelectionRect::from_points(at, at));
        self.dragging = true;
    }

    /// Pointer move: stretch the selection while dragging
    pub fn update(&mut self, to: Point) {
        if !self.dragging {
            return;
        }
        if let Some(anchor) = self.anchor {
            let to = self.clamp(to);
            self.rect = Some(SelectionRect::from_points(anchor, to));
        }
    }

    /// Pointer up: the selection stays as drawn
    pub fn end(&mut self) {
        self.dragging = false;
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.rect = None;
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn has_valid_selection(&self) -> bool {
        self.rect.is_some_and(|r| r.is_valid())
    }

    /// The valid selection mapped onto a `source`-sized raster
    pub fn source_region(&self, source: (u32, u32)) -> Option<Region> {
        self.rect
            .filter(|r| r.is_valid())
            .map(|r| r.to_region(self.display, source))
    }
}
