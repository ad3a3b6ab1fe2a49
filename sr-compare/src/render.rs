//! Side-by-side comparison rendering.
//!
//! One comparison image per input: the staged input on the left, then one
//! panel per stage in correlation order, each with a title band naming the
//! stage. Rendering is pure presentation; any unreadable image fails the
//! whole tuple rather than producing a partial comparison.

use crate::correlate::ComparisonTuple;
use crate::errors::RenderError;
use ab_glyph::{FontVec, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const TITLE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Layout and styling for comparison images.
#[derive(Clone)]
pub struct RenderConfig {
    /// Pixels of background between and around panels.
    pub spacing: u32,
    /// Height of the title band above each panel.
    pub title_band: u32,
    /// Background color of the canvas and title bands.
    pub background: Rgb<u8>,
    /// Title text color.
    pub title_color: Rgb<u8>,
    /// The font titles are drawn with. When absent, panels are composed
    /// without title text.
    pub font: Option<Arc<FontVec>>,
    /// Scale factor for the title font.
    pub font_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            spacing: 8,
            title_band: 24,
            background: BACKGROUND_COLOR,
            title_color: TITLE_COLOR,
            font: None,
            font_scale: 16.0,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("spacing", &self.spacing)
            .field("title_band", &self.title_band)
            .field("font", &self.font.is_some())
            .field("font_scale", &self.font_scale)
            .finish()
    }
}

impl RenderConfig {
    /// Creates a configuration with a font loaded from a file.
    pub fn with_font_path(font_path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let font_path = font_path.as_ref();
        let font_data =
            std::fs::read(font_path).map_err(|e| RenderError::font(font_path, e.to_string()))?;
        let font = FontVec::try_from_vec(font_data)
            .map_err(|_| RenderError::font(font_path, "failed to parse font file"))?;

        Ok(Self {
            font: Some(Arc::new(font)),
            ..Self::default()
        })
    }

    /// Creates a configuration with a font from a short list of common
    /// system locations, falling back to titleless rendering when none
    /// is readable.
    #[must_use]
    pub fn with_system_font() -> Self {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];

        for path in &font_paths {
            if let Ok(config) = Self::with_font_path(path) {
                info!(font = %path, "loaded system font for panel titles");
                return config;
            }
        }

        debug!("no system font found, comparisons will have no title text");
        Self::default()
    }
}

/// Composes and writes comparison images for correlated tuples.
pub struct ComparisonRenderer {
    /// Where composed images are written.
    output_dir: PathBuf,
    config: RenderConfig,
}

impl ComparisonRenderer {
    /// Creates a renderer writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, config: RenderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    /// Returns the directory comparison images are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Composes the panels of one tuple into a single image.
    ///
    /// Canvas width is the sum of panel widths plus spacing around every
    /// panel; canvas height is the tallest panel plus the title band and
    /// the top and bottom spacing.
    pub fn compose(&self, tuple: &ComparisonTuple) -> Result<RgbImage, RenderError> {
        let mut panels = Vec::with_capacity(tuple.artifacts.len() + 1);
        panels.push(("input".to_string(), load_rgb(&tuple.input)?));
        for artifact in &tuple.artifacts {
            panels.push((artifact.stage.clone(), load_rgb(&artifact.path)?));
        }

        let spacing = self.config.spacing;
        let band = self.config.title_band;
        let width: u32 =
            spacing + panels.iter().map(|(_, img)| img.width() + spacing).sum::<u32>();
        let tallest = panels.iter().map(|(_, img)| img.height()).max().unwrap_or(0);
        let height = 2 * spacing + band + tallest;

        let mut canvas = RgbImage::new(width, height);
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(0, 0).of_size(width, height),
            self.config.background,
        );

        let mut x = spacing;
        for (title, panel) in &panels {
            if let Some(font) = &self.config.font {
                draw_text_mut(
                    &mut canvas,
                    self.config.title_color,
                    x as i32,
                    (spacing / 2) as i32,
                    PxScale::from(self.config.font_scale),
                    &**font,
                    title,
                );
            }
            imageops::overlay(&mut canvas, panel, i64::from(x), i64::from(spacing + band));
            x += panel.width() + spacing;
        }

        Ok(canvas)
    }

    /// Composes a tuple and writes it as `<original-stem>_comparison.png`.
    ///
    /// Returns the path of the written image.
    pub fn render_to_file(&self, tuple: &ComparisonTuple) -> Result<PathBuf, RenderError> {
        let canvas = self.compose(tuple)?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| RenderError::output_dir(&self.output_dir, e))?;

        let stem = tuple
            .original_name
            .rsplit_once('.')
            .map_or(tuple.original_name.as_str(), |(stem, _)| stem);
        let path = self.output_dir.join(format!("{stem}_comparison.png"));
        canvas.save(&path).map_err(|e| RenderError::save(&path, e))?;

        info!(
            key = %tuple.key,
            path = %path.display(),
            panels = tuple.artifacts.len() + 1,
            "comparison rendered"
        );
        Ok(path)
    }
}

fn load_rgb(path: &Path) -> Result<RgbImage, RenderError> {
    let img = image::open(path).map_err(|e| RenderError::load(path, e))?;
    Ok(img.to_rgb8())
}
