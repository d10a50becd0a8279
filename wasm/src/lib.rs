use floorgrid::config::{Config, config_from_str};
use floorgrid::geometry::Point;
use floorgrid::layout::{Layout, RenderTarget, compute_layout, try_compute_layout};
use floorgrid::render::{ModalFrame, render_modal_svg, render_svg};
use floorgrid::viewport::{
    Key, PointerButton, ScrollHost, ViewTransform, ViewportController, ViewportEvent,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Scroll host backed by `document.body.style.overflow`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyScroll;

impl BodyScroll {
    fn body() -> Option<web_sys::HtmlElement> {
        web_sys::window()?.document()?.body()
    }
}

impl ScrollHost for BodyScroll {
    fn overflow(&self) -> String {
        Self::body()
            .and_then(|body| body.style().get_property_value("overflow").ok())
            .unwrap_or_default()
    }

    fn set_overflow(&mut self, value: &str) {
        if let Some(body) = Self::body() {
            let _ = body.style().set_property("overflow", value);
        }
    }
}

fn parse_target(view: &str) -> Result<RenderTarget, String> {
    match view {
        "inline" => Ok(RenderTarget::Inline),
        "modal" => Ok(RenderTarget::Modal),
        "export" => Ok(RenderTarget::Export),
        other => Err(format!("unknown view '{other}'")),
    }
}

fn parse_config(options_json: Option<String>) -> Result<Config, String> {
    match options_json {
        Some(raw) => config_from_str(&raw, false).map_err(|error| error.to_string()),
        None => Ok(Config::default()),
    }
}

/// Render the floor plan for `view` ("inline", "modal" or "export").
/// `options_json` takes the same keys as a config file.
#[wasm_bindgen]
pub fn render_floor_plan_svg(view: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let target = parse_target(view).map_err(|error| JsValue::from_str(&error))?;
    let config = parse_config(options_json).map_err(|error| JsValue::from_str(&error))?;
    Ok(floorgrid::render_view(&config.plan, &config.theme, target))
}

#[derive(Debug, Serialize)]
struct CellInfo {
    row: u32,
    col: u32,
    obstacle: Option<String>,
}

/// Modal viewer: a viewport controller that locks page scroll while open,
/// plus the modal layout it pans and zooms.
#[wasm_bindgen]
pub struct GridViewer {
    config: Config,
    layout: Layout,
    frame: ModalFrame,
    controller: ViewportController<BodyScroll>,
}

#[wasm_bindgen]
impl GridViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, options_json: Option<String>) -> Result<GridViewer, JsValue> {
        let config = parse_config(options_json).map_err(|error| JsValue::from_str(&error))?;
        let layout = try_compute_layout(&config.plan, &config.theme, RenderTarget::Modal)
            .map_err(|error| JsValue::from_str(&error.to_string()))?;
        Ok(GridViewer {
            config,
            layout,
            frame: ModalFrame::new(width, height),
            controller: ViewportController::new(BodyScroll),
        })
    }

    pub fn open(&mut self) {
        self.controller.open();
    }

    pub fn close(&mut self) {
        self.controller.close();
    }

    pub fn is_open(&self) -> bool {
        self.controller.is_open()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.frame = ModalFrame::new(width, height);
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out();
    }

    pub fn zoom_reset(&mut self) {
        self.controller.zoom_reset();
    }

    pub fn zoom_percent(&self) -> u32 {
        self.controller.zoom_percent()
    }

    /// Returns true when the caller should `preventDefault()`.
    pub fn handle_key(&mut self, key: &str) -> bool {
        match Key::from_name(key) {
            Some(key) => self.dispatch(ViewportEvent::Key(key)),
            None => false,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, button: i16) -> bool {
        self.dispatch(ViewportEvent::PointerDown {
            position: Point::new(x, y),
            button: PointerButton::from_index(button),
        })
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.dispatch(ViewportEvent::PointerMove {
            position: Point::new(x, y),
        })
    }

    pub fn pointer_up(&mut self) -> bool {
        self.dispatch(ViewportEvent::PointerUp)
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.dispatch(ViewportEvent::PointerLeave)
    }

    pub fn wheel(&mut self, delta_y: f32, ctrl: bool) -> bool {
        self.dispatch(ViewportEvent::Wheel { delta_y, ctrl })
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    /// CSS `transform` for the content element; empty while closed.
    pub fn css_transform(&self) -> String {
        self.controller
            .transform()
            .map(|transform| transform.css())
            .unwrap_or_default()
    }

    pub fn css_transition(&self) -> String {
        self.controller
            .transform()
            .map(|transform| transform.transition.css())
            .unwrap_or_default()
    }

    pub fn render_svg(&self) -> String {
        let transform = self.transform();
        render_modal_svg(&self.layout, &self.config.theme, &transform, self.frame)
    }

    pub fn render_inline_svg(&self) -> String {
        let layout = compute_layout(&self.config.plan, &self.config.theme, RenderTarget::Inline);
        render_svg(&layout, &self.config.theme)
    }

    /// JSON `{row, col, obstacle}` for the cell under a screen point, or
    /// `undefined` off-grid.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<String> {
        let hit = self
            .frame
            .hit_test(&self.layout, &self.transform(), Point::new(x, y))?;
        let info = CellInfo {
            row: hit.row,
            col: hit.col,
            obstacle: hit
                .occupant
                .map(|idx| self.config.plan.obstacles[idx].id.clone()),
        };
        serde_json::to_string(&info).ok()
    }
}

impl GridViewer {
    fn dispatch(&mut self, event: ViewportEvent) -> bool {
        self.controller.handle(event).is_handled()
    }

    fn transform(&self) -> ViewTransform {
        self.controller
            .transform()
            .unwrap_or_else(ViewTransform::identity)
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse_config, parse_target};
    use floorgrid::layout::RenderTarget;

    #[test]
    fn parses_views() {
        assert_eq!(parse_target("modal"), Ok(RenderTarget::Modal));
        assert!(parse_target("fullscreen").is_err());
    }

    #[test]
    fn options_use_config_keys() {
        let config = parse_config(Some(r#"{"title":"Annex","theme":"blueprint"}"#.to_string())).unwrap();
        assert_eq!(config.plan.title, "Annex");
        let svg = floorgrid::render_view(&config.plan, &config.theme, RenderTarget::Export);
        assert!(svg.contains("Annex (25m × 35m)"));
    }
}
