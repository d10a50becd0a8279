use crate::config::{ExportConfig, SettingsError};
use crate::layout::{RenderTarget, compute_layout};
use crate::plan::FloorPlan;
use crate::render::render_svg;
use crate::theme::Theme;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    Busy,
    #[error("failed to rasterize export document: {0}")]
    Raster(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("failed to build PDF: {0}")]
    Pdf(String),
    #[error("invalid export settings: {0}")]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0} export not enabled (compile with the '{1}' feature)")]
    Unsupported(&'static str, &'static str),
}

/// The export document: title, grid, obstacles, border and coordinate
/// labels, laid out with the margin convention.
pub fn build_export_svg(plan: &FloorPlan, theme: &Theme) -> String {
    let layout = compute_layout(plan, theme, RenderTarget::Export);
    render_svg(&layout, theme)
}

#[cfg(feature = "png")]
pub use raster::{Pixmap, encode_png, rasterize};

#[cfg(feature = "png")]
mod raster {
    use super::ExportError;
    pub use resvg::tiny_skia::Pixmap;

    /// Rasterize `svg` at `scale` times its natural size onto an opaque white
    /// background.
    pub fn rasterize(svg: &str, scale: f32, font_family: &str) -> Result<Pixmap, ExportError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ExportError::Raster(format!("invalid scale {scale}")));
        }
        let mut opt = usvg::Options::default();
        opt.font_family = primary_family(font_family).to_string();
        opt.fontdb_mut().load_system_fonts();

        let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| ExportError::Raster(err.to_string()))?;
        let size = tree.size().to_int_size();
        let width = (size.width() as f32 * scale).ceil() as u32;
        let height = (size.height() as f32 * scale).ceil() as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ExportError::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
        pixmap.fill(resvg::tiny_skia::Color::WHITE);

        let mut pixmap_mut = pixmap.as_mut();
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap_mut,
        );
        Ok(pixmap)
    }

    pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, ExportError> {
        pixmap
            .encode_png()
            .map_err(|err| ExportError::Encode(err.to_string()))
    }

    fn primary_family(font_family: &str) -> &str {
        font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .find(|part| !part.is_empty())
            .unwrap_or("sans-serif")
    }
}

/// Page size in millimetres for an image of `px_width` × `px_height` scaled
/// to `page_width_mm`.
pub fn page_size_mm(px_width: u32, px_height: u32, page_width_mm: f32) -> (f32, f32) {
    let height = px_height as f32 * page_width_mm / px_width.max(1) as f32;
    (page_width_mm, height)
}

#[cfg(feature = "png")]
pub fn write_png(pixmap: &Pixmap, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_png(pixmap)?;
    write_atomically(path, &bytes)
}

#[cfg(feature = "pdf")]
pub fn write_pdf(pixmap: &Pixmap, path: &Path, title: &str, page_width_mm: f32) -> Result<(), ExportError> {
    let bytes = pdf_bytes(pixmap, title, page_width_mm)?;
    write_atomically(path, &bytes)
}

#[cfg(not(feature = "pdf"))]
pub fn write_pdf<P>(_pixmap: &P, _path: &Path, _title: &str, _page_width_mm: f32) -> Result<(), ExportError> {
    Err(ExportError::Unsupported("PDF", "pdf"))
}

#[cfg(feature = "pdf")]
fn pdf_bytes(pixmap: &Pixmap, title: &str, page_width_mm: f32) -> Result<Vec<u8>, ExportError> {
    use printpdf::image_crate::{DynamicImage, RgbImage};
    use printpdf::{Image, ImageTransform, Mm, PdfDocument};

    if !page_width_mm.is_finite() || page_width_mm <= 0.0 {
        return Err(ExportError::Pdf(format!("invalid page width {page_width_mm}mm")));
    }
    let (px_width, px_height) = (pixmap.width(), pixmap.height());
    let (page_w, page_h) = page_size_mm(px_width, px_height, page_width_mm);

    // The pixmap was filled opaque, so premultiplied RGBA drops straight to RGB.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let buffer = RgbImage::from_raw(px_width, px_height, rgb)
        .ok_or_else(|| ExportError::Encode("pixel buffer size mismatch".to_string()))?;
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(buffer));

    let (doc, page, layer) = PdfDocument::new(title, Mm(page_w), Mm(page_h), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let dpi = px_width as f32 / (page_w / 25.4);
    image.add_to_layer(
        layer,
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    doc.save_to_bytes()
        .map_err(|err| ExportError::Pdf(format!("{err:?}")))
}

/// Write to a sibling temp file and rename, so a failed export never
/// leaves a partial file at `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    if let Err(err) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.into());
    }
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

/// Runs exports one at a time. The busy flag clears when an export
/// finishes or fails, or once `timeout` has elapsed since it was raised.
#[derive(Debug, Clone)]
pub struct Exporter {
    config: ExportConfig,
    busy_since: Option<Instant>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            busy_since: None,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.busy_timeout_ms)
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy_at(Instant::now())
    }

    pub fn is_busy_at(&self, now: Instant) -> bool {
        self.busy_since
            .is_some_and(|since| now.saturating_duration_since(since) < self.timeout())
    }

    pub fn begin(&mut self) -> Result<(), ExportError> {
        self.begin_at(Instant::now())
    }

    pub fn begin_at(&mut self, now: Instant) -> Result<(), ExportError> {
        if self.is_busy_at(now) {
            return Err(ExportError::Busy);
        }
        if self.busy_since.is_some() {
            debug!("stale export flag cleared after timeout");
        }
        self.busy_since = Some(now);
        Ok(())
    }

    pub fn finish(&mut self) {
        self.busy_since = None;
    }

    /// The explicit `output`, or the configured file name.
    pub fn output_path(&self, output: Option<&Path>) -> PathBuf {
        output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.config.file_name))
    }

    #[cfg(feature = "png")]
    pub fn export_png(&mut self, plan: &FloorPlan, theme: &Theme, output: Option<&Path>) -> Result<PathBuf, ExportError> {
        let path = self.output_path(output);
        self.run(&path, |config| {
            let svg = build_export_svg(plan, theme);
            let pixmap = rasterize(&svg, config.scale_factor, &theme.font_family)?;
            write_png(&pixmap, &path)
        })?;
        Ok(path)
    }

    pub fn export_pdf(&mut self, plan: &FloorPlan, theme: &Theme, output: Option<&Path>) -> Result<PathBuf, ExportError> {
        let path = self.output_path(output);
        self.run(&path, |config| export_pdf_inner(plan, theme, &path, config))?;
        Ok(path)
    }

    fn run<F>(&mut self, path: &Path, job: F) -> Result<(), ExportError>
    where
        F: FnOnce(&ExportConfig) -> Result<(), ExportError>,
    {
        self.config.validate()?;
        self.begin()?;
        let started = Instant::now();
        let result = job(&self.config);
        self.finish();
        match &result {
            Ok(()) => info!(
                path = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "export written"
            ),
            Err(err) => error!(path = %path.display(), %err, "export failed"),
        }
        result
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

#[cfg(feature = "pdf")]
fn export_pdf_inner(plan: &FloorPlan, theme: &Theme, path: &Path, config: &ExportConfig) -> Result<(), ExportError> {
    let svg = build_export_svg(plan, theme);
    let pixmap = rasterize(&svg, config.scale_factor, &theme.font_family)?;
    debug!(width = pixmap.width(), height = pixmap.height(), "rasterized export");
    write_pdf(&pixmap, path, &plan.title, config.page_width_mm)
}

#[cfg(not(feature = "pdf"))]
fn export_pdf_inner(_plan: &FloorPlan, _theme: &Theme, _path: &Path, _config: &ExportConfig) -> Result<(), ExportError> {
    Err(ExportError::Unsupported("PDF", "pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::GridSpec;

    fn empty_plan() -> FloorPlan {
        FloorPlan::new("Empty", GridSpec::default(), Vec::new()).unwrap()
    }

    #[test]
    fn empty_plan_exports_only_grid_frame_and_text() {
        let svg = build_export_svg(&empty_plan(), &Theme::default());
        assert_eq!(svg.matches("class=\"grid-line\"").count(), 26 + 36);
        assert_eq!(svg.matches("class=\"border-line\"").count(), 1);
        assert_eq!(svg.matches("class=\"coordinate-text\"").count(), 25 + 35);
        assert!(!svg.contains("class=\"obstacle\""));
        assert!(!svg.contains("<circle"));
        assert!(svg.contains("Empty (25m × 35m)"));
        assert!(svg.contains("Obstacles: 0"));
        // background + border are the only rects
        assert_eq!(svg.matches("<rect").count(), 2);
    }

    #[test]
    fn page_height_follows_aspect_ratio() {
        let (w, h) = page_size_mm(2700, 3700, 210.0);
        assert_eq!(w, 210.0);
        assert!((h - 287.777_78).abs() < 1e-3);
    }

    #[test]
    fn busy_flag_rejects_reentry_until_finished() {
        let mut exporter = Exporter::default();
        let start = Instant::now();
        exporter.begin_at(start).unwrap();
        assert!(matches!(
            exporter.begin_at(start + Duration::from_millis(10)),
            Err(ExportError::Busy)
        ));
        exporter.finish();
        assert!(exporter.begin_at(start + Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn busy_flag_expires_after_timeout() {
        let mut exporter = Exporter::default();
        let start = Instant::now();
        exporter.begin_at(start).unwrap();
        assert!(exporter.is_busy_at(start + Duration::from_millis(1499)));
        assert!(!exporter.is_busy_at(start + Duration::from_millis(1500)));
        assert!(exporter.begin_at(start + Duration::from_millis(1600)).is_ok());
    }

    #[test]
    fn output_path_defaults_to_configured_name() {
        let exporter = Exporter::default();
        assert_eq!(exporter.output_path(None), PathBuf::from("floor-plan.pdf"));
        assert_eq!(
            exporter.output_path(Some(Path::new("out/a.pdf"))),
            PathBuf::from("out/a.pdf")
        );
    }

    #[test]
    fn invalid_settings_fail_before_raising_busy_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = Exporter::new(ExportConfig {
            page_width_mm: 0.0,
            ..ExportConfig::default()
        });
        let err = exporter
            .export_pdf(&empty_plan(), &Theme::default(), Some(&dir.path().join("p.pdf")))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Settings(SettingsError::NotPositive { field: "page width (mm)", .. })
        ));
        assert!(!exporter.is_busy());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn pdf_page_width_must_be_positive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.pdf");
        let svg = build_export_svg(&empty_plan(), &Theme::default());
        let pixmap = rasterize(&svg, 1.0, "sans-serif").unwrap();
        for width in [0.0, -1.0, f32::NAN] {
            let err = write_pdf(&pixmap, &path, "Empty", width).unwrap_err();
            assert!(matches!(err, ExportError::Pdf(_)), "{width}");
        }
        assert!(!path.exists());
    }

    #[cfg(feature = "png")]
    #[test]
    fn rasterizes_at_double_scale() {
        let plan = empty_plan();
        let svg = build_export_svg(&plan, &Theme::default());
        let pixmap = rasterize(&svg, 2.0, "Arial, sans-serif").unwrap();
        assert_eq!(pixmap.width(), 2 * (500 + 100));
        assert_eq!(pixmap.height(), 2 * (700 + 100));
        // top-left corner lies in the margin: white
        assert_eq!(&pixmap.data()[..4], &[255, 255, 255, 255]);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn writes_single_page_pdf_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.pdf");
        let mut exporter = Exporter::default();
        let written = exporter
            .export_pdf(&FloorPlan::builtin(), &Theme::default(), Some(&path))
            .unwrap();
        assert_eq!(written, path);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!exporter.is_busy());
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
