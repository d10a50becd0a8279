use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("grid {field} must be a finite positive number, got {value}")]
    InvalidGrid { field: &'static str, value: f64 },
    #[error("obstacle '{id}': {reason}")]
    InvalidObstacle { id: String, reason: String },
    #[error("duplicate obstacle id '{0}'")]
    DuplicateId(String),
    #[error("grid {width}x{height} exceeds the 1000000-cell limit")]
    GridTooLarge { width: u32, height: u32 },
}

/// Upper bound on `width × height`; every view allocates one entry per cell.
pub const MAX_GRID_CELLS: u64 = 1_000_000;

/// Fixed grid dimensions, in cells, plus the pixel scale used to draw them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub width_cells: u32,
    pub height_cells: u32,
    pub cell_size_px: f32,
    pub margin_px: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width_cells: 25,
            height_cells: 35,
            cell_size_px: 20.0,
            margin_px: 50.0,
        }
    }
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.width_cells == 0 {
            return Err(PlanError::InvalidGrid {
                field: "width",
                value: 0.0,
            });
        }
        if self.height_cells == 0 {
            return Err(PlanError::InvalidGrid {
                field: "height",
                value: 0.0,
            });
        }
        if !self.cell_size_px.is_finite() || self.cell_size_px <= 0.0 {
            return Err(PlanError::InvalidGrid {
                field: "cell size",
                value: self.cell_size_px as f64,
            });
        }
        if !self.margin_px.is_finite() || self.margin_px < 0.0 {
            return Err(PlanError::InvalidGrid {
                field: "margin",
                value: self.margin_px as f64,
            });
        }
        if self.total_area() > MAX_GRID_CELLS {
            return Err(PlanError::GridTooLarge {
                width: self.width_cells,
                height: self.height_cells,
            });
        }
        Ok(())
    }

    /// Floor area in square metres (one cell is one square metre).
    pub fn total_area(&self) -> u64 {
        self.width_cells as u64 * self.height_cells as u64
    }

    pub fn pixel_width(&self) -> f32 {
        self.width_cells as f32 * self.cell_size_px
    }

    pub fn pixel_height(&self) -> f32 {
        self.height_cells as f32 * self.cell_size_px
    }

    pub fn x_range(&self) -> std::ops::Range<u32> {
        0..self.width_cells
    }

    pub fn y_range(&self) -> std::ops::Range<u32> {
        0..self.height_cells
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Lab,
    Table,
    Chair,
    Cabinet,
    Restroom,
    Stairs,
    Elevator,
    Room,
    Corridor,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 9] = [
        ObstacleKind::Lab,
        ObstacleKind::Table,
        ObstacleKind::Chair,
        ObstacleKind::Cabinet,
        ObstacleKind::Restroom,
        ObstacleKind::Stairs,
        ObstacleKind::Elevator,
        ObstacleKind::Room,
        ObstacleKind::Corridor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleKind::Lab => "lab",
            ObstacleKind::Table => "table",
            ObstacleKind::Chair => "chair",
            ObstacleKind::Cabinet => "cabinet",
            ObstacleKind::Restroom => "restroom",
            ObstacleKind::Stairs => "stairs",
            ObstacleKind::Elevator => "elevator",
            ObstacleKind::Room => "room",
            ObstacleKind::Corridor => "corridor",
        }
    }
}

impl fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

/// A static labeled rectangle, positioned and sized in grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obstacle {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
    pub color: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_display_size: Option<DisplaySize>,
}

impl Obstacle {
    pub fn new(id: &str, kind: ObstacleKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            kind,
            color: "#E0E0E0".to_string(),
            label: id.to_string(),
            min_display_size: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_min_display_size(mut self, width: f32, height: f32) -> Self {
        self.min_display_size = Some(DisplaySize { width, height });
        self
    }

    /// Half-open containment: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn overlaps(&self, other: &Obstacle) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn is_chair(&self) -> bool {
        self.kind == ObstacleKind::Chair
    }

    pub fn label_lines(&self) -> Vec<String> {
        self.label.lines().map(|line| line.to_string()).collect()
    }

    /// Label with line breaks collapsed to single spaces.
    pub fn flat_label(&self) -> String {
        self.label.lines().collect::<Vec<_>>().join(" ")
    }

    /// Hover text: id, flattened label and real dimensions.
    pub fn tooltip(&self) -> String {
        format!(
            "{} - {} ({:.2}m x {:.2}m)",
            self.id,
            self.flat_label(),
            self.width,
            self.height
        )
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |reason: String| PlanError::InvalidObstacle {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        for (name, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be finite and >= 0, got {value}")));
            }
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be finite and > 0, got {value}")));
            }
        }
        if let Some(size) = self.min_display_size
            && (!size.width.is_finite()
                || !size.height.is_finite()
                || size.width <= 0.0
                || size.height <= 0.0)
        {
            return Err(invalid("minDisplaySize must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub title: String,
    pub grid: GridSpec,
    pub obstacles: Vec<Obstacle>,
}

impl FloorPlan {
    pub fn new(title: &str, grid: GridSpec, obstacles: Vec<Obstacle>) -> Result<Self, PlanError> {
        let plan = Self {
            title: title.to_string(),
            grid,
            obstacles,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        self.grid.validate()?;
        let mut seen = std::collections::HashSet::new();
        for obstacle in &self.obstacles {
            obstacle.validate()?;
            if !seen.insert(obstacle.id.as_str()) {
                return Err(PlanError::DuplicateId(obstacle.id.clone()));
            }
        }
        Ok(())
    }

    pub fn obstacle_by_id(&self, id: &str) -> Option<&Obstacle> {
        self.obstacles.iter().find(|obstacle| obstacle.id == id)
    }

    pub fn obstacles_of_kind(&self, kind: ObstacleKind) -> Vec<&Obstacle> {
        self.obstacles
            .iter()
            .filter(|obstacle| obstacle.kind == kind)
            .collect()
    }

    /// Pairs of obstacle ids whose rectangles intersect, in declaration order.
    pub fn overlapping_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (idx, first) in self.obstacles.iter().enumerate() {
            for second in &self.obstacles[idx + 1..] {
                if first.overlaps(second) {
                    pairs.push((first.id.clone(), second.id.clone()));
                }
            }
        }
        pairs
    }

    pub fn summary(&self) -> PlanSummary {
        let by_kind = ObstacleKind::ALL
            .into_iter()
            .map(|kind| (kind, self.obstacles_of_kind(kind).len()))
            .filter(|(_, count)| *count > 0)
            .collect();
        PlanSummary {
            title: self.title.clone(),
            width: self.grid.width_cells,
            height: self.grid.height_cells,
            total_area: self.grid.total_area(),
            obstacle_count: self.obstacles.len(),
            by_kind,
        }
    }

    /// The reference 25 m × 35 m teaching floor.
    pub fn builtin() -> Self {
        let chair = |id: &str, x: f32, y: f32| {
            Obstacle::new(id, ObstacleKind::Chair, x, y, 0.5, 0.55)
                .with_color("#5D4037")
                .with_min_display_size(0.8, 0.8)
        };
        let obstacles = vec![
            Obstacle::new("L1", ObstacleKind::Lab, 2.0, 2.0, 7.2, 7.0)
                .with_color("#E3F2FD")
                .with_label("LAB 01\n7.20 X 7.0"),
            Obstacle::new("L2", ObstacleKind::Lab, 15.0, 2.0, 4.2, 3.6)
                .with_color("#E8F5E8")
                .with_label("LAB 02\n4.20 X 3.60"),
            Obstacle::new("B1", ObstacleKind::Restroom, 0.0, 11.0, 4.0, 4.0)
                .with_color("#FFF3E0")
                .with_label("WC F\n4.10 X 3.40"),
            Obstacle::new("B3", ObstacleKind::Restroom, 2.0, 16.0, 2.0, 2.0)
                .with_color("#F3E5F5")
                .with_label("WC ACC\n2.20 X 1.80"),
            Obstacle::new("B2", ObstacleKind::Restroom, 0.0, 19.0, 4.0, 4.0)
                .with_color("#E1F5FE")
                .with_label("WC M\n4.10 X 3.40"),
            Obstacle::new("T1", ObstacleKind::Table, 11.0, 11.0, 1.2, 1.2)
                .with_color("#8D6E63")
                .with_label("TABLE 01"),
            Obstacle::new("T2", ObstacleKind::Table, 18.0, 11.0, 1.2, 1.2)
                .with_color("#8D6E63")
                .with_label("TABLE 02"),
            chair("C1", 10.25, 10.25),
            chair("C2", 12.45, 10.25),
            chair("C3", 10.25, 12.45),
            chair("C4", 12.45, 12.45),
            chair("C5", 17.25, 10.25),
            chair("C6", 19.45, 10.25),
            chair("C7", 17.25, 12.45),
            chair("C8", 19.45, 12.45),
            Obstacle::new("E1", ObstacleKind::Stairs, 6.0, 15.0, 4.0, 1.0)
                .with_color("#ECEFF1")
                .with_label("STAIRS 1\n4.20 x 1.30"),
            Obstacle::new("E3", ObstacleKind::Elevator, 12.0, 15.0, 2.0, 2.0)
                .with_color("#CFD8DC")
                .with_label("ELEVATOR\n2X2"),
            Obstacle::new("E2", ObstacleKind::Stairs, 16.0, 15.0, 4.0, 1.0)
                .with_color("#ECEFF1")
                .with_label("STAIRS 2\n4.20 x 1.30"),
            Obstacle::new("CORRIDOR", ObstacleKind::Corridor, 12.0, 18.0, 2.0, 17.0)
                .with_color("#F5F5F5")
                .with_label("CORRIDOR\n18m X 1m50"),
            Obstacle::new("R1", ObstacleKind::Room, 5.0, 25.0, 7.0, 7.0)
                .with_color("#FFF8E1")
                .with_label("ROOM 01\n7.50 X 7.0"),
            Obstacle::new("R2", ObstacleKind::Room, 14.0, 25.0, 7.0, 7.0)
                .with_color("#FFF8E1")
                .with_label("ROOM 02\n7.50 X 7.0"),
            Obstacle::new("A1", ObstacleKind::Cabinet, 5.0, 24.0, 0.8, 0.5)
                .with_color("#795548")
                .with_min_display_size(1.0, 1.0),
            Obstacle::new("A2", ObstacleKind::Cabinet, 20.0, 24.0, 0.8, 0.5)
                .with_color("#795548")
                .with_min_display_size(1.0, 1.0),
        ];
        Self {
            title: "Grid Map - Graph Theory".to_string(),
            grid: GridSpec::default(),
            obstacles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub total_area: u64,
    pub obstacle_count: usize,
    pub by_kind: Vec<(ObstacleKind, usize)>,
}

impl PlanSummary {
    /// One-line summary printed under the exported grid.
    pub fn info_line(&self) -> String {
        format!(
            "Scale: 1 square = 1 metre | Total area: {}m² | Coordinates: X(0-{}), Y(0-{}) | Obstacles: {}",
            self.total_area,
            self.width.saturating_sub(1),
            self.height.saturating_sub(1),
            self.obstacle_count
        )
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  dimensions: {}m x {}m", self.width, self.height)?;
        writeln!(f, "  total area: {}m²", self.total_area)?;
        writeln!(f, "  scale: 1 cell = 1m²")?;
        writeln!(f, "  obstacles: {}", self.obstacle_count)?;
        for (kind, count) in &self.by_kind {
            writeln!(f, "    {kind}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_plan_is_valid_and_overlap_free() {
        let plan = FloorPlan::builtin();
        plan.validate().expect("builtin plan");
        assert_eq!(plan.obstacles.len(), 23);
        assert!(plan.overlapping_pairs().is_empty());
    }

    #[test]
    fn rejects_non_positive_grid() {
        let grid = GridSpec {
            cell_size_px: f32::NAN,
            ..GridSpec::default()
        };
        assert!(matches!(
            grid.validate(),
            Err(PlanError::InvalidGrid { field: "cell size", .. })
        ));
        let grid = GridSpec {
            margin_px: -1.0,
            ..GridSpec::default()
        };
        assert!(grid.validate().is_err());
    }

    #[test]
    fn rejects_grids_past_the_cell_limit() {
        let grid = GridSpec {
            width_cells: 70_000,
            height_cells: 70_000,
            ..GridSpec::default()
        };
        assert_eq!(grid.total_area(), 4_900_000_000);
        assert_eq!(
            grid.validate(),
            Err(PlanError::GridTooLarge {
                width: 70_000,
                height: 70_000
            })
        );
        let grid = GridSpec {
            width_cells: 1000,
            height_cells: 1000,
            ..GridSpec::default()
        };
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let obstacles = vec![
            Obstacle::new("X", ObstacleKind::Room, 0.0, 0.0, 1.0, 1.0),
            Obstacle::new("X", ObstacleKind::Lab, 2.0, 2.0, 1.0, 1.0),
        ];
        let err = FloorPlan::new("t", GridSpec::default(), obstacles).unwrap_err();
        assert_eq!(err, PlanError::DuplicateId("X".to_string()));
    }

    #[test]
    fn summary_counts_by_kind() {
        let summary = FloorPlan::builtin().summary();
        assert_eq!(summary.total_area, 875);
        let chairs = summary
            .by_kind
            .iter()
            .find(|(kind, _)| *kind == ObstacleKind::Chair)
            .map(|(_, count)| *count);
        assert_eq!(chairs, Some(8));
        assert!(summary.info_line().contains("X(0-24), Y(0-34)"));
        assert!(summary.info_line().ends_with("Obstacles: 23"));
    }

    #[test]
    fn obstacle_round_trips_through_json_keys() {
        let json = r##"{"id":"C1","x":1,"y":2,"width":0.5,"height":0.5,"type":"chair","color":"#000","label":"C1","minDisplaySize":{"width":0.8,"height":0.8}}"##;
        let obstacle: Obstacle = serde_json::from_str(json).unwrap();
        assert_eq!(obstacle.kind, ObstacleKind::Chair);
        assert_eq!(
            obstacle.min_display_size,
            Some(DisplaySize {
                width: 0.8,
                height: 0.8
            })
        );
    }

    #[test]
    fn flat_label_collapses_line_breaks() {
        let obstacle = Obstacle::new("L", ObstacleKind::Lab, 0.0, 0.0, 1.0, 1.0)
            .with_label("LAB 01\n7.20 X 7.0");
        assert_eq!(obstacle.flat_label(), "LAB 01 7.20 X 7.0");
        assert_eq!(obstacle.label_lines().len(), 2);
    }
}
