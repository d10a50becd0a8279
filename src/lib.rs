#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod export;
pub mod geometry;
pub mod layout;
pub mod layout_dump;
pub mod occupancy;
pub mod plan;
pub mod render;
pub mod script;
pub mod text_metrics;
pub mod theme;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use geometry::{Convention, GridGeometry, Point, Rect};
pub use layout::{Layout, RenderTarget, compute_layout, try_compute_layout};
pub use occupancy::{OccupancyGrid, find_obstacle_at, is_label_anchor};
pub use plan::{FloorPlan, GridSpec, Obstacle, ObstacleKind, PlanError};
pub use render::{ModalFrame, render_modal_svg, render_svg};
pub use theme::Theme;
pub use viewport::{Handled, ViewTransform, ViewportController, ViewportEvent};

/// Render `plan` for `target` in one call. The modal view is drawn with the
/// identity transform into a frame the size of the grid.
pub fn render_view(plan: &FloorPlan, theme: &Theme, target: RenderTarget) -> String {
    let layout = compute_layout(plan, theme, target);
    match target {
        RenderTarget::Modal => {
            let frame = ModalFrame::new(layout.width, layout.height);
            render_modal_svg(&layout, theme, &ViewTransform::identity(), frame)
        }
        RenderTarget::Inline | RenderTarget::Export => render_svg(&layout, theme),
    }
}
