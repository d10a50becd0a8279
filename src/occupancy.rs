use crate::plan::{GridSpec, Obstacle};

/// First obstacle, in declaration order, whose rectangle contains `(x, y)`.
///
/// Overlapping obstacles resolve to the one listed first.
pub fn find_obstacle_at(obstacles: &[Obstacle], x: f32, y: f32) -> Option<&Obstacle> {
    find_obstacle_index(obstacles, x, y).map(|idx| &obstacles[idx])
}

pub fn find_obstacle_index(obstacles: &[Obstacle], x: f32, y: f32) -> Option<usize> {
    obstacles.iter().position(|obstacle| obstacle.contains(x, y))
}

/// Whether `(x, y)` lies within one grid unit of the obstacle's origin on
/// both axes. Applies to every kind, chairs included, so fractional origins
/// still get exactly one nearby anchor.
pub fn is_label_anchor(obstacle: &Obstacle, x: f32, y: f32) -> bool {
    (x - obstacle.x).abs() < 1.0 && (y - obstacle.y).abs() < 1.0
}

/// Per-cell occupant table, sampled at each cell's integer coordinate with
/// the same first-match rule as [`find_obstacle_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<usize>>,
    anchors: Vec<Option<(u32, u32)>>,
}

impl OccupancyGrid {
    pub fn build(grid: &GridSpec, obstacles: &[Obstacle]) -> Self {
        let mut cells = Vec::with_capacity(grid.total_area() as usize);
        let mut anchors = vec![None; obstacles.len()];
        for row in grid.y_range() {
            for col in grid.x_range() {
                let occupant = find_obstacle_index(obstacles, col as f32, row as f32);
                if let Some(idx) = occupant
                    && anchors[idx].is_none()
                    && is_label_anchor(&obstacles[idx], col as f32, row as f32)
                {
                    anchors[idx] = Some((row, col));
                }
                cells.push(occupant);
            }
        }
        Self {
            width: grid.width_cells,
            height: grid.height_cells,
            cells,
            anchors,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn obstacle_index_at(&self, row: u32, col: u32) -> Option<usize> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells[row as usize * self.width as usize + col as usize]
    }

    /// The cell carrying the obstacle's label, if any sampled cell qualifies.
    pub fn anchor_of(&self, obstacle_index: usize) -> Option<(u32, u32)> {
        self.anchors.get(obstacle_index).copied().flatten()
    }

    pub fn is_anchor(&self, row: u32, col: u32) -> bool {
        self.obstacle_index_at(row, col)
            .is_some_and(|idx| self.anchor_of(idx) == Some((row, col)))
    }

    pub fn free_count(&self) -> usize {
        self.cells.len() - self.occupied_count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{FloorPlan, ObstacleKind};

    fn lab() -> Obstacle {
        Obstacle::new("L1", ObstacleKind::Lab, 2.0, 2.0, 7.2, 7.0)
    }

    #[test]
    fn finds_obstacle_covering_point() {
        let obstacles = vec![lab()];
        assert_eq!(find_obstacle_at(&obstacles, 3.0, 3.0).map(|o| o.id.as_str()), Some("L1"));
        assert!(find_obstacle_at(&obstacles, 0.0, 0.0).is_none());
    }

    #[test]
    fn rectangle_is_half_open() {
        let obstacles = vec![Obstacle::new("A", ObstacleKind::Room, 1.0, 1.0, 2.0, 2.0)];
        assert!(find_obstacle_at(&obstacles, 1.0, 1.0).is_some());
        assert!(find_obstacle_at(&obstacles, 3.0, 1.0).is_none());
        assert!(find_obstacle_at(&obstacles, 1.0, 3.0).is_none());
    }

    #[test]
    fn overlap_resolves_to_first_declared() {
        let obstacles = vec![
            Obstacle::new("first", ObstacleKind::Room, 0.0, 0.0, 5.0, 5.0),
            Obstacle::new("second", ObstacleKind::Table, 2.0, 2.0, 1.0, 1.0),
        ];
        assert_eq!(find_obstacle_at(&obstacles, 2.5, 2.5).unwrap().id, "first");
        let reversed: Vec<_> = obstacles.into_iter().rev().collect();
        assert_eq!(find_obstacle_at(&reversed, 2.5, 2.5).unwrap().id, "second");
    }

    #[test]
    fn label_anchor_uses_distance_threshold() {
        let chair = Obstacle::new("C1", ObstacleKind::Chair, 10.25, 10.25, 0.5, 0.55);
        assert!(is_label_anchor(&chair, 10.0, 10.0));
        assert!(is_label_anchor(&chair, 11.0, 11.0));
        assert!(!is_label_anchor(&chair, 12.0, 10.0));
        assert!(is_label_anchor(&lab(), 2.0, 2.0));
        assert!(!is_label_anchor(&lab(), 3.0, 2.0));
    }

    #[test]
    fn occupancy_grid_matches_point_lookup() {
        let plan = FloorPlan::builtin();
        let grid = OccupancyGrid::build(&plan.grid, &plan.obstacles);
        for row in plan.grid.y_range() {
            for col in plan.grid.x_range() {
                let expected = find_obstacle_index(&plan.obstacles, col as f32, row as f32);
                assert_eq!(grid.obstacle_index_at(row, col), expected);
            }
        }
        assert_eq!(grid.free_count() + grid.occupied_count(), 875);
        assert_eq!(grid.obstacle_index_at(35, 0), None);
    }

    #[test]
    fn each_sampled_obstacle_gets_one_anchor_at_its_origin() {
        let plan = FloorPlan::builtin();
        let grid = OccupancyGrid::build(&plan.grid, &plan.obstacles);
        let l1 = plan.obstacles.iter().position(|o| o.id == "L1").unwrap();
        assert_eq!(grid.anchor_of(l1), Some((2, 2)));
        assert!(grid.is_anchor(2, 2));
        assert!(!grid.is_anchor(2, 3));
        // Chairs never cover an integer sample point.
        let c1 = plan.obstacles.iter().position(|o| o.id == "C1").unwrap();
        assert_eq!(grid.anchor_of(c1), None);
    }
}
