use crate::geometry::Point;
use crate::layout::{CellHit, Layout, ObstacleLayout, RenderTarget, TextBlock};
use crate::theme::Theme;
use crate::viewport::ViewTransform;
use anyhow::Result;
use std::path::Path;

/// Render a layout at its natural size.
pub fn render_svg(layout: &Layout, theme: &Theme) -> String {
    let width = layout.width;
    let height = layout.height;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    push_scene(&mut svg, layout, theme);
    svg.push_str("</svg>");
    svg
}

/// Screen area the modal view is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalFrame {
    pub width: f32,
    pub height: f32,
}

impl ModalFrame {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pivot of the zoom transform.
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Offset that centers the unscaled scene in the frame.
    pub fn content_offset(&self, layout: &Layout) -> Point {
        Point::new(
            (self.width - layout.width) / 2.0,
            (self.height - layout.height) / 2.0,
        )
    }

    /// Cell under a screen point, undoing the viewport transform.
    pub fn hit_test(&self, layout: &Layout, transform: &ViewTransform, screen: Point) -> Option<CellHit> {
        let content = transform.invert(screen, self.center()) - self.content_offset(layout);
        layout.hit_test(content)
    }
}

/// Render the modal view: the scene centered in `frame`, wrapped in the
/// viewport transform.
pub fn render_modal_svg(layout: &Layout, theme: &Theme, transform: &ViewTransform, frame: ModalFrame) -> String {
    let width = frame.width;
    let height = frame.height;
    let offset = frame.content_offset(layout);
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str(&format!(
        "<g class=\"viewport\" transform=\"{}\" style=\"transition: {}\">",
        transform.svg(frame.center()),
        transform.transition.css()
    ));
    svg.push_str(&format!(
        "<g transform=\"translate({:.2} {:.2})\">",
        offset.x, offset.y
    ));
    push_scene(&mut svg, layout, theme);
    svg.push_str("</g></g></svg>");
    svg
}

fn push_scene(svg: &mut String, layout: &Layout, theme: &Theme) {
    match layout.target {
        RenderTarget::Export => push_export_scene(svg, layout, theme),
        RenderTarget::Inline | RenderTarget::Modal => push_screen_scene(svg, layout, theme),
    }
}

fn push_export_scene(svg: &mut String, layout: &Layout, theme: &Theme) {
    let bounds = layout.geometry.bounds();
    let cell = layout.geometry.cell_size;

    if let Some(heading) = &layout.heading {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            heading.title_at.x,
            heading.title_at.y,
            theme.font_family,
            theme.title_font_size,
            theme.title_color,
            escape_xml(&heading.title)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            heading.info_at.x,
            heading.info_at.y,
            theme.font_family,
            theme.info_font_size,
            theme.info_color,
            escape_xml(&heading.info)
        ));
    }

    for col in 0..=layout.geometry.width_cells {
        let x = bounds.left + col as f32 * cell;
        svg.push_str(&format!(
            "<line class=\"grid-line\" x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            bounds.top,
            bounds.bottom(),
            theme.grid_line_color,
            theme.grid_line_width
        ));
    }
    for row in 0..=layout.geometry.height_cells {
        let y = bounds.top + row as f32 * cell;
        svg.push_str(&format!(
            "<line class=\"grid-line\" x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            bounds.left,
            bounds.right(),
            theme.grid_line_color,
            theme.grid_line_width
        ));
    }

    for obstacle in &layout.obstacles {
        let (stroke_width, opacity) = if obstacle.chair { (2.0, 0.9) } else { (1.0, 0.8) };
        svg.push_str(&format!("<g class=\"obstacle\" data-id=\"{}\">", escape_xml(&obstacle.id)));
        push_obstacle_rect(svg, obstacle, theme, stroke_width, opacity);
        push_marker(svg, obstacle, theme);
        let fill = if obstacle.chair {
            theme.print_chair_text_color.as_str()
        } else {
            theme.obstacle_text_color.as_str()
        };
        let center = obstacle.rect.center();
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            center.x,
            center.y,
            theme.font_family,
            obstacle.label.font_size,
            fill,
            escape_xml(&obstacle.label.lines.join(" "))
        ));
        svg.push_str("</g>");
    }

    push_border(svg, layout, theme);
    push_axis_labels(svg, layout, theme);
}

fn push_screen_scene(svg: &mut String, layout: &Layout, theme: &Theme) {
    svg.push_str(&format!("<g transform=\"translate(0 {:.2})\">", layout.offset_y));

    if let Some(gutter) = &layout.gutter {
        svg.push_str(&format!(
            "<rect class=\"gutter\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            gutter.left, gutter.top, gutter.width, gutter.height, theme.gutter_background
        ));
    }

    for cell in &layout.cells {
        let mut attrs = String::new();
        if let Some(idx) = cell.occupant {
            attrs.push_str(&format!(
                " data-obstacle=\"{}\"",
                escape_xml(&layout.obstacles[idx].id)
            ));
        }
        if cell.anchor {
            attrs.push_str(" data-anchor=\"true\"");
        }
        svg.push_str(&format!(
            "<rect class=\"cell\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{attrs}><title>{}</title></rect>",
            cell.rect.left,
            cell.rect.top,
            cell.rect.width,
            cell.rect.height,
            theme.grid_line_color,
            theme.grid_line_width,
            cell.title()
        ));
    }

    for obstacle in &layout.obstacles {
        svg.push_str(&format!("<g class=\"obstacle\" data-id=\"{}\">", escape_xml(&obstacle.id)));
        svg.push_str(&format!("<title>{}</title>", escape_xml(&obstacle.title)));
        push_obstacle_rect(svg, obstacle, theme, 1.0, theme.obstacle_opacity);
        push_marker(svg, obstacle, theme);
        let fill = if obstacle.chair {
            theme.chair_text_color.as_str()
        } else {
            theme.obstacle_text_color.as_str()
        };
        let center = obstacle.label_box.center();
        svg.push_str(&text_block_svg(center, &obstacle.label, theme, fill));
        svg.push_str("</g>");
    }

    push_border(svg, layout, theme);
    push_axis_labels(svg, layout, theme);
    svg.push_str("</g>");
}

fn push_obstacle_rect(svg: &mut String, obstacle: &ObstacleLayout, theme: &Theme, stroke_width: f32, opacity: f32) {
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" opacity=\"{}\"/>",
        obstacle.rect.left,
        obstacle.rect.top,
        obstacle.rect.width,
        obstacle.rect.height,
        escape_xml(&obstacle.color),
        theme.obstacle_stroke,
        stroke_width,
        opacity
    ));
}

fn push_marker(svg: &mut String, obstacle: &ObstacleLayout, theme: &Theme) {
    if let Some(marker) = obstacle.marker {
        svg.push_str(&format!(
            "<circle class=\"chair-marker\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" opacity=\"{}\"/>",
            marker.cx, marker.cy, marker.r, theme.chair_marker_color, theme.chair_marker_opacity
        ));
    }
}

fn push_border(svg: &mut String, layout: &Layout, theme: &Theme) {
    let bounds = layout.geometry.bounds();
    svg.push_str(&format!(
        "<rect class=\"border-line\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
        bounds.left,
        bounds.top,
        bounds.width,
        bounds.height,
        theme.border_color,
        theme.border_width
    ));
}

fn push_axis_labels(svg: &mut String, layout: &Layout, theme: &Theme) {
    let baseline = match layout.target {
        RenderTarget::Export => "",
        _ => " dominant-baseline=\"middle\"",
    };
    for label in layout.column_labels.iter().chain(&layout.row_labels) {
        svg.push_str(&format!(
            "<text class=\"coordinate-text\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\"{baseline} font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            label.x,
            label.y,
            theme.font_family,
            theme.coordinate_font_size,
            theme.coordinate_color,
            label.text
        ));
    }
}

fn text_block_svg(center: Point, label: &TextBlock, theme: &Theme, fill: &str) -> String {
    let line_height = label.font_size * theme.label_line_height;
    let start_y = center.y - label.height / 2.0 + line_height / 2.0;
    let x = center.x;
    let mut text = String::new();
    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">",
        theme.font_family, label.font_size, fill
    ));
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
