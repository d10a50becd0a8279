use crate::plan::{GridSpec, Obstacle, PlanError};
use serde::Serialize;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right() && point.y >= self.top && point.y < self.bottom()
    }

    /// Grow to at least `width × height`, keeping the center fixed.
    pub fn expand_to(&self, width: f32, height: f32) -> Rect {
        let width = self.width.max(width);
        let height = self.height.max(height);
        let center = self.center();
        Rect::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Convention {
    /// Symmetric margin on every side (export documents).
    Margin { margin_px: f32 },
    /// Coordinate gutter on the left, grid flush with the top (screen views).
    Gutter { column_width_px: f32 },
}

impl Convention {
    pub fn export(spec: &GridSpec) -> Self {
        Convention::Margin {
            margin_px: spec.margin_px,
        }
    }

    /// Screen views reserve a gutter two cells wide for row indices.
    pub fn screen(spec: &GridSpec) -> Self {
        Convention::Gutter {
            column_width_px: spec.cell_size_px * 2.0,
        }
    }

    pub fn origin(&self) -> Point {
        match *self {
            Convention::Margin { margin_px } => Point::new(margin_px, margin_px),
            Convention::Gutter { column_width_px } => Point::new(column_width_px, 0.0),
        }
    }
}

/// Pixel placement of a grid. `origin` is the pixel position of cell (0, 0)
/// under either convention, so [`GridGeometry::convert`] can move points
/// between an export document and a screen view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub width_cells: u32,
    pub height_cells: u32,
    pub cell_size: f32,
    pub convention: Convention,
    pub origin: Point,
}

impl GridGeometry {
    /// Build a geometry, failing on a malformed grid spec.
    pub fn new(spec: &GridSpec, convention: Convention) -> Result<Self, PlanError> {
        spec.validate()?;
        Ok(Self::with_cell_size(spec, spec.cell_size_px, convention))
    }

    /// Same grid drawn at a different cell size (e.g. the compact inline view).
    pub fn with_cell_size(spec: &GridSpec, cell_size: f32, convention: Convention) -> Self {
        Self {
            width_cells: spec.width_cells,
            height_cells: spec.height_cells,
            cell_size,
            convention,
            origin: convention.origin(),
        }
    }

    pub fn cell_top_left(&self, row: u32, col: u32) -> Point {
        self.to_pixels(Point::new(col as f32, row as f32))
    }

    pub fn cell_rect(&self, row: u32, col: u32) -> Rect {
        let top_left = self.cell_top_left(row, col);
        Rect::new(top_left.x, top_left.y, self.cell_size, self.cell_size)
    }

    pub fn cell_center(&self, row: u32, col: u32) -> Point {
        self.cell_rect(row, col).center()
    }

    /// Grid-unit coordinates to pixels.
    pub fn to_pixels(&self, grid: Point) -> Point {
        Point::new(
            self.origin.x + grid.x * self.cell_size,
            self.origin.y + grid.y * self.cell_size,
        )
    }

    /// Pixels to fractional grid-unit coordinates.
    pub fn grid_point(&self, pixel: Point) -> Point {
        Point::new(
            (pixel.x - self.origin.x) / self.cell_size,
            (pixel.y - self.origin.y) / self.cell_size,
        )
    }

    /// The `(row, col)` under a pixel, or `None` outside the cell area.
    pub fn cell_at(&self, pixel: Point) -> Option<(u32, u32)> {
        let grid = self.grid_point(pixel);
        if grid.x < 0.0 || grid.y < 0.0 {
            return None;
        }
        let col = grid.x.floor() as u32;
        let row = grid.y.floor() as u32;
        (col < self.width_cells && row < self.height_cells).then_some((row, col))
    }

    pub fn obstacle_rect(&self, obstacle: &Obstacle) -> Rect {
        let top_left = self.to_pixels(Point::new(obstacle.x, obstacle.y));
        Rect::new(
            top_left.x,
            top_left.y,
            obstacle.width * self.cell_size,
            obstacle.height * self.cell_size,
        )
    }

    /// Box used for the obstacle's label overlay; grows to the minimum display
    /// size when one is configured.
    pub fn label_rect(&self, obstacle: &Obstacle) -> Rect {
        let rect = self.obstacle_rect(obstacle);
        match obstacle.min_display_size {
            Some(size) => rect.expand_to(size.width * self.cell_size, size.height * self.cell_size),
            None => rect,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.width_cells as f32 * self.cell_size,
            self.height_cells as f32 * self.cell_size,
        )
    }

    /// Map a pixel in this geometry to the same grid location in `other`.
    pub fn convert(&self, pixel: Point, other: &GridGeometry) -> Point {
        other.to_pixels(self.grid_point(pixel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ObstacleKind;

    fn spec() -> GridSpec {
        GridSpec {
            width_cells: 25,
            height_cells: 35,
            cell_size_px: 20.0,
            margin_px: 50.0,
        }
    }

    #[test]
    fn margin_convention_offsets_both_axes() {
        let geometry = GridGeometry::new(&spec(), Convention::export(&spec())).unwrap();
        assert_eq!(geometry.cell_top_left(0, 0), Point::new(50.0, 50.0));
        assert_eq!(geometry.cell_top_left(2, 3), Point::new(110.0, 90.0));
    }

    #[test]
    fn gutter_convention_offsets_x_only() {
        let geometry = GridGeometry::new(&spec(), Convention::screen(&spec())).unwrap();
        assert_eq!(geometry.cell_top_left(0, 0), Point::new(40.0, 0.0));
        assert_eq!(geometry.cell_top_left(2, 3), Point::new(100.0, 40.0));
    }

    #[test]
    fn obstacle_rect_scales_grid_units() {
        let geometry = GridGeometry::new(&spec(), Convention::export(&spec())).unwrap();
        let obstacle = Obstacle::new("L1", ObstacleKind::Lab, 2.0, 2.0, 7.2, 7.0);
        let rect = geometry.obstacle_rect(&obstacle);
        assert_eq!(rect.left, 90.0);
        assert_eq!(rect.top, 90.0);
        assert!((rect.width - 144.0).abs() < 1e-3);
        assert_eq!(rect.height, 140.0);
    }

    #[test]
    fn label_rect_honours_min_display_size() {
        let geometry = GridGeometry::new(&spec(), Convention::screen(&spec())).unwrap();
        let chair = Obstacle::new("C1", ObstacleKind::Chair, 10.0, 10.0, 0.5, 0.5)
            .with_min_display_size(0.8, 0.8);
        let real = geometry.obstacle_rect(&chair);
        let label = geometry.label_rect(&chair);
        assert!((label.width - 16.0).abs() < 1e-4);
        assert_eq!(label.center(), real.center());
    }

    #[test]
    fn cell_at_inverts_cell_top_left() {
        let geometry = GridGeometry::new(&spec(), Convention::export(&spec())).unwrap();
        let p = geometry.cell_top_left(7, 4) + Point::new(5.0, 5.0);
        assert_eq!(geometry.cell_at(p), Some((7, 4)));
        assert_eq!(geometry.cell_at(Point::new(10.0, 10.0)), None);
        assert_eq!(geometry.cell_at(geometry.cell_top_left(35, 0)), None);
    }

    #[test]
    fn converts_between_conventions() {
        let export = GridGeometry::new(&spec(), Convention::export(&spec())).unwrap();
        let screen = GridGeometry::new(&spec(), Convention::screen(&spec())).unwrap();
        let pixel = export.cell_top_left(4, 9);
        assert_eq!(export.convert(pixel, &screen), screen.cell_top_left(4, 9));
        assert_eq!(screen.convert(screen.cell_top_left(4, 9), &export), pixel);
    }

    #[test]
    fn rejects_malformed_spec() {
        let bad = GridSpec {
            cell_size_px: 0.0,
            ..spec()
        };
        assert!(GridGeometry::new(&bad, Convention::export(&bad)).is_err());
    }
}
