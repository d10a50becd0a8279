use crate::plan::{FloorPlan, GridSpec, Obstacle};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("export file name must not be empty")]
    EmptyFileName,
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { field, value })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Modal viewport size used for headless renders.
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Rasterization scale for PNG output of screen views.
    pub png_scale: f32,
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("viewport width", self.viewport_width)?;
        positive("viewport height", self.viewport_height)?;
        positive("png scale", self.png_scale)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1200.0,
            viewport_height: 800.0,
            png_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub file_name: String,
    /// Supersampling factor applied before embedding in the page.
    pub scale_factor: f32,
    /// A4 width.
    pub page_width_mm: f32,
    /// The exporting flag clears itself after this long even if an export
    /// never reported back.
    pub busy_timeout_ms: u64,
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.file_name.trim().is_empty() {
            return Err(SettingsError::EmptyFileName);
        }
        positive("export scale factor", self.scale_factor)?;
        positive("page width (mm)", self.page_width_mm)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "floor-plan.pdf".to_string(),
            scale_factor: 2.0,
            page_width_mm: 210.0,
            busy_timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub plan: FloorPlan,
    pub theme: Theme,
    pub render: RenderConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan: FloorPlan::builtin(),
            theme: Theme::classic(),
            render: RenderConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridFile {
    width: Option<u32>,
    height: Option<u32>,
    cell_size: Option<f32>,
    margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    background: Option<String>,
    grid_line_color: Option<String>,
    border_color: Option<String>,
    coordinate_color: Option<String>,
    obstacle_stroke: Option<String>,
    obstacle_text_color: Option<String>,
    obstacle_opacity: Option<f32>,
    chair_marker_color: Option<String>,
    label_font_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportFile {
    file_name: Option<String>,
    scale_factor: Option<f32>,
    page_width_mm: Option<f32>,
    busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    title: Option<String>,
    grid: Option<GridFile>,
    obstacles: Option<Vec<Obstacle>>,
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    viewport: Option<[f32; 2]>,
    export: Option<ExportFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json5"));
    let parsed = parse_config_str(&contents, is_json5)?;
    debug!(path = %path.display(), "loaded config file");

    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

/// Parse config text, accepting JSON5 (comments, trailing commas) when
/// `json5` is set.
pub fn config_from_str(contents: &str, json5: bool) -> anyhow::Result<Config> {
    let mut config = Config::default();
    apply_config_file(&mut config, parse_config_str(contents, json5)?)?;
    Ok(config)
}

fn parse_config_str(contents: &str, json5: bool) -> anyhow::Result<ConfigFile> {
    let parsed = if json5 {
        json5::from_str::<ConfigFile>(contents)?
    } else {
        serde_json::from_str::<ConfigFile>(contents)?
    };
    Ok(parsed)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(name) = parsed.theme.as_deref() {
        match Theme::from_name(name) {
            Some(theme) => config.theme = theme,
            None => warn!(theme = name, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
        if let Some(v) = vars.grid_line_color {
            theme.grid_line_color = v;
        }
        if let Some(v) = vars.border_color {
            theme.border_color = v;
        }
        if let Some(v) = vars.coordinate_color {
            theme.coordinate_color = v;
        }
        if let Some(v) = vars.obstacle_stroke {
            theme.obstacle_stroke = v;
        }
        if let Some(v) = vars.obstacle_text_color {
            theme.obstacle_text_color = v;
        }
        if let Some(v) = vars.obstacle_opacity {
            theme.obstacle_opacity = v;
        }
        if let Some(v) = vars.chair_marker_color {
            theme.chair_marker_color = v;
        }
        if let Some(v) = vars.label_font_size {
            theme.label_font_size = v;
        }
    }

    if let Some(title) = parsed.title {
        config.plan.title = title;
    }
    if let Some(grid) = parsed.grid {
        let defaults = GridSpec::default();
        config.plan.grid = GridSpec {
            width_cells: grid.width.unwrap_or(defaults.width_cells),
            height_cells: grid.height.unwrap_or(defaults.height_cells),
            cell_size_px: grid.cell_size.unwrap_or(defaults.cell_size_px),
            margin_px: grid.margin.unwrap_or(defaults.margin_px),
        };
    }
    if let Some(obstacles) = parsed.obstacles {
        config.plan.obstacles = obstacles;
    }
    config.plan.validate()?;
    for (first, second) in config.plan.overlapping_pairs() {
        warn!(first = %first, second = %second, "obstacles overlap; the first declared wins");
    }

    if let Some([width, height]) = parsed.viewport {
        config.render.viewport_width = width;
        config.render.viewport_height = height;
    }

    if let Some(export) = parsed.export {
        if let Some(v) = export.file_name {
            config.export.file_name = v;
        }
        if let Some(v) = export.scale_factor {
            config.export.scale_factor = v;
        }
        if let Some(v) = export.page_width_mm {
            config.export.page_width_mm = v;
        }
        if let Some(v) = export.busy_timeout_ms {
            config.export.busy_timeout_ms = v;
        }
    }
    config.render.validate()?;
    config.export.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ObstacleKind, PlanError};

    #[test]
    fn empty_config_keeps_builtin_plan() {
        let config = config_from_str("{}", false).unwrap();
        assert_eq!(config.plan, FloorPlan::builtin());
        assert_eq!(config.export.scale_factor, 2.0);
    }

    #[test]
    fn json5_config_overrides_grid_and_obstacles() {
        let text = r#"{
            // small test floor
            title: 'Annex',
            grid: { width: 10, height: 8 },
            obstacles: [
                { id: 'K', x: 1, y: 1, width: 2, height: 2, type: 'cabinet', color: '#795548', label: 'K' },
            ],
            themeVariables: { gridLineColor: '#999999' },
            export: { fileName: 'annex.pdf' },
        }"#;
        let config = config_from_str(text, true).unwrap();
        assert_eq!(config.plan.title, "Annex");
        assert_eq!(config.plan.grid.width_cells, 10);
        assert_eq!(config.plan.grid.cell_size_px, 20.0);
        assert_eq!(config.plan.obstacles.len(), 1);
        assert_eq!(config.plan.obstacles[0].kind, ObstacleKind::Cabinet);
        assert_eq!(config.theme.grid_line_color, "#999999");
        assert_eq!(config.export.file_name, "annex.pdf");
    }

    #[test]
    fn malformed_grid_fails_fast() {
        let err = config_from_str(r#"{"grid":{"cellSize":-4}}"#, false).unwrap_err();
        let plan_err = err.downcast_ref::<PlanError>().expect("plan error");
        assert!(matches!(plan_err, PlanError::InvalidGrid { field: "cell size", .. }));
    }

    #[test]
    fn non_positive_export_settings_fail_fast() {
        for (text, field) in [
            (r#"{"export":{"pageWidthMm":0}}"#, "page width (mm)"),
            (r#"{"export":{"pageWidthMm":-210}}"#, "page width (mm)"),
            (r#"{"export":{"scaleFactor":0}}"#, "export scale factor"),
            (r#"{"viewport":[0, 800]}"#, "viewport width"),
            (r#"{"viewport":[1200, -1]}"#, "viewport height"),
        ] {
            let err = config_from_str(text, false).unwrap_err();
            let settings = err.downcast_ref::<SettingsError>().expect("settings error");
            assert!(
                matches!(settings, SettingsError::NotPositive { field: f, .. } if *f == field),
                "{text}: {settings}"
            );
        }
        let err = config_from_str(r#"{"export":{"fileName":" "}}"#, false).unwrap_err();
        assert_eq!(err.downcast_ref::<SettingsError>(), Some(&SettingsError::EmptyFileName));
    }

    #[test]
    fn non_finite_settings_are_rejected() {
        let export = ExportConfig {
            scale_factor: f32::INFINITY,
            ..ExportConfig::default()
        };
        assert!(export.validate().is_err());
        let render = RenderConfig {
            viewport_width: f32::NAN,
            ..RenderConfig::default()
        };
        assert!(render.validate().is_err());
        assert!(ExportConfig::default().validate().is_ok());
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn oversized_grid_is_rejected_at_load() {
        let err = config_from_str(r#"{"grid":{"width":70000,"height":70000},"obstacles":[]}"#, false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanError>(),
            Some(PlanError::GridTooLarge { width: 70_000, height: 70_000 })
        ));
    }

    #[test]
    fn named_theme_is_applied() {
        let config = config_from_str(r#"{"theme":"blueprint"}"#, false).unwrap();
        assert_eq!(config.theme, Theme::blueprint());
    }
}
