//! Image fixtures for tests.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Writes a solid-color PNG, panicking on failure.
///
/// The file is a real decodable image, which the comparison renderer
/// needs; a byte blob with a `.png` name would fail its load step.
pub fn write_png(path: &Path, width: u32, height: u32, color: Rgb<u8>) {
    let img = RgbImage::from_pixel(width, height, color);
    img.save(path)
        .unwrap_or_else(|e| panic!("failed to write fixture png '{}': {e}", path.display()));
}

/// Writes one small PNG per name into `dir` and returns their paths.
///
/// Each image gets a distinct red channel so tests can tell panels apart
/// by pixel color.
pub fn sample_inputs(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let path = dir.join(name);
            #[allow(clippy::cast_possible_truncation)]
            write_png(&path, 6, 6, Rgb([(i * 40 % 256) as u8, 80, 80]));
            path
        })
        .collect()
}
