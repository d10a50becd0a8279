use crate::geometry::{Convention, GridGeometry, Point, Rect};
use crate::occupancy::OccupancyGrid;
use crate::plan::{FloorPlan, GridSpec, Obstacle, PlanError};
use crate::text_metrics::text_width;
use crate::theme::Theme;
use serde::Serialize;

/// Compact cell size used by the inline (embedded) view.
pub const INLINE_CELL_SIZE: f32 = 16.0;
/// Inline view's row-index gutter.
pub const INLINE_GUTTER: f32 = 32.0;
/// Screen obstacles narrower than this many pixels get the small label size.
const SMALL_LABEL_WIDTH: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderTarget {
    /// Compact grid embedded in the page.
    Inline,
    /// Full-size grid shown in the pan/zoom viewport.
    Modal,
    /// Print document with title, summary and margins.
    Export,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellLayout {
    pub row: u32,
    pub col: u32,
    pub rect: Rect,
    pub occupant: Option<usize>,
    pub anchor: bool,
}

impl CellLayout {
    pub fn title(&self) -> String {
        format!("Position: ({}, {})", self.col, self.row)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Marker {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleLayout {
    pub index: usize,
    pub id: String,
    pub chair: bool,
    pub rect: Rect,
    pub label_box: Rect,
    pub label: TextBlock,
    pub color: String,
    pub title: String,
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heading {
    pub title: String,
    pub title_at: Point,
    pub info: String,
    pub info_at: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub target: RenderTarget,
    pub width: f32,
    pub height: f32,
    /// Vertical offset applied to the whole scene; screen views reserve a
    /// header row above the grid for column indices.
    pub offset_y: f32,
    pub geometry: GridGeometry,
    pub cells: Vec<CellLayout>,
    pub column_labels: Vec<AxisLabel>,
    pub row_labels: Vec<AxisLabel>,
    /// Row-index gutter background (screen views only).
    pub gutter: Option<Rect>,
    pub obstacles: Vec<ObstacleLayout>,
    pub heading: Option<Heading>,
}

/// Cell and occupant under a scene point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHit {
    pub row: u32,
    pub col: u32,
    pub occupant: Option<usize>,
}

impl Layout {
    /// Hit-test a point in rendered coordinates (`offset_y` included).
    pub fn hit_test(&self, point: Point) -> Option<CellHit> {
        let scene = Point::new(point.x, point.y - self.offset_y);
        let (row, col) = self.geometry.cell_at(scene)?;
        let idx = row as usize * self.geometry.width_cells as usize + col as usize;
        let occupant = self.cells.get(idx).and_then(|cell| cell.occupant);
        Some(CellHit { row, col, occupant })
    }
}

/// Lay out `plan` for `target`, rejecting a malformed grid spec.
pub fn try_compute_layout(
    plan: &FloorPlan,
    theme: &Theme,
    target: RenderTarget,
) -> Result<Layout, PlanError> {
    let spec = &plan.grid;
    let geometry = match target {
        RenderTarget::Inline => {
            spec.validate()?;
            inline_geometry(spec)
        }
        RenderTarget::Modal => GridGeometry::new(spec, Convention::screen(spec))?,
        RenderTarget::Export => GridGeometry::new(spec, Convention::export(spec))?,
    };
    Ok(layout_with(plan, theme, target, geometry))
}

/// Lay out a plan that already passed [`FloorPlan::validate`]. Plans from
/// `FloorPlan::new` and from config loading always have; use
/// [`try_compute_layout`] for hand-assembled ones.
pub fn compute_layout(plan: &FloorPlan, theme: &Theme, target: RenderTarget) -> Layout {
    let spec = &plan.grid;
    let geometry = match target {
        RenderTarget::Inline => inline_geometry(spec),
        RenderTarget::Modal => {
            GridGeometry::with_cell_size(spec, spec.cell_size_px, Convention::screen(spec))
        }
        RenderTarget::Export => {
            GridGeometry::with_cell_size(spec, spec.cell_size_px, Convention::export(spec))
        }
    };
    layout_with(plan, theme, target, geometry)
}

fn inline_geometry(spec: &GridSpec) -> GridGeometry {
    GridGeometry::with_cell_size(
        spec,
        INLINE_CELL_SIZE,
        Convention::Gutter {
            column_width_px: INLINE_GUTTER,
        },
    )
}

fn layout_with(
    plan: &FloorPlan,
    theme: &Theme,
    target: RenderTarget,
    geometry: GridGeometry,
) -> Layout {
    let spec = &plan.grid;
    let bounds = geometry.bounds();
    let cell = geometry.cell_size;

    let occupancy = OccupancyGrid::build(spec, &plan.obstacles);
    let mut cells = Vec::with_capacity(spec.total_area() as usize);
    for row in spec.y_range() {
        for col in spec.x_range() {
            cells.push(CellLayout {
                row,
                col,
                rect: geometry.cell_rect(row, col),
                occupant: occupancy.obstacle_index_at(row, col),
                anchor: occupancy.is_anchor(row, col),
            });
        }
    }

    let (column_labels, row_labels) = axis_labels(&geometry, target);

    let obstacles = plan
        .obstacles
        .iter()
        .enumerate()
        .map(|(index, obstacle)| obstacle_layout(index, obstacle, &geometry, theme, target))
        .collect();

    let (width, height, offset_y, gutter, heading) = match target {
        RenderTarget::Export => {
            let margin = spec.margin_px;
            let width = bounds.width + margin * 2.0;
            let height = bounds.height + margin * 2.0;
            let heading = Heading {
                title: format!(
                    "{} ({}m × {}m)",
                    plan.title, spec.width_cells, spec.height_cells
                ),
                title_at: Point::new(width / 2.0, 30.0),
                info: plan.summary().info_line(),
                info_at: Point::new(margin, bounds.bottom() + 30.0),
            };
            (width, height, 0.0, None, Some(heading))
        }
        RenderTarget::Inline | RenderTarget::Modal => {
            let gutter = Rect::new(0.0, 0.0, bounds.left, bounds.height);
            (
                bounds.right(),
                bounds.bottom() + cell,
                cell,
                Some(gutter),
                None,
            )
        }
    };

    Layout {
        target,
        width,
        height,
        offset_y,
        geometry,
        cells,
        column_labels,
        row_labels,
        gutter,
        obstacles,
        heading,
    }
}

fn axis_labels(geometry: &GridGeometry, target: RenderTarget) -> (Vec<AxisLabel>, Vec<AxisLabel>) {
    let cell = geometry.cell_size;
    let bounds = geometry.bounds();
    let columns = (0..geometry.width_cells)
        .map(|col| {
            let center = geometry.cell_center(0, col);
            let y = match target {
                RenderTarget::Export => bounds.top - 5.0,
                _ => bounds.top - cell / 2.0,
            };
            AxisLabel {
                text: col.to_string(),
                x: center.x,
                y,
            }
        })
        .collect();
    let rows = (0..geometry.height_cells)
        .map(|row| {
            let center = geometry.cell_center(row, 0);
            let (x, y) = match target {
                RenderTarget::Export => (bounds.left - 10.0, center.y + 3.0),
                _ => (bounds.left / 2.0, center.y),
            };
            AxisLabel {
                text: row.to_string(),
                x,
                y,
            }
        })
        .collect();
    (columns, rows)
}

fn obstacle_layout(
    index: usize,
    obstacle: &Obstacle,
    geometry: &GridGeometry,
    theme: &Theme,
    target: RenderTarget,
) -> ObstacleLayout {
    let rect = geometry.obstacle_rect(obstacle);
    let chair = obstacle.is_chair();
    let (label_box, lines, marker_divisor) = match target {
        RenderTarget::Export => (rect, vec![obstacle.flat_label()], 4.0),
        _ => (geometry.label_rect(obstacle), obstacle.label_lines(), 6.0),
    };
    let font_size = label_font_size(rect.width, chair, theme, target);
    let widest = lines
        .iter()
        .map(|line| text_width(line, font_size, &theme.font_family))
        .fold(0.0f32, f32::max);
    let label = TextBlock {
        height: lines.len() as f32 * font_size * theme.label_line_height,
        width: widest,
        lines,
        font_size,
    };
    let marker = chair.then(|| {
        let center = rect.center();
        Marker {
            cx: center.x,
            cy: center.y,
            r: rect.width.min(rect.height) / marker_divisor,
        }
    });
    ObstacleLayout {
        index,
        id: obstacle.id.clone(),
        chair,
        rect,
        label_box,
        label,
        color: obstacle.color.clone(),
        title: obstacle.tooltip(),
        marker,
    }
}

/// Chairs and print labels use fixed sizes; screen labels drop to the small
/// size on obstacles narrower than [`SMALL_LABEL_WIDTH`].
fn label_font_size(width: f32, chair: bool, theme: &Theme, target: RenderTarget) -> f32 {
    match (target, chair) {
        (RenderTarget::Export, true) => theme.print_chair_label_font_size,
        (RenderTarget::Export, false) => theme.print_label_font_size,
        (_, true) => theme.chair_label_font_size,
        (_, false) if width < SMALL_LABEL_WIDTH => theme.label_small_font_size,
        (_, false) => theme.label_font_size,
    }
}
