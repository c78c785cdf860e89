//! Pixel comparison between a result image and its baseline.
//!
//! Comparison is scoped to same-size deterministic raster output: images
//! with differing dimensions fail immediately without a pixel loop, and
//! matching is decided by root-mean-square deviation across all RGB
//! channels against a numeric tolerance. A mismatch always materializes an
//! amplified difference image for the report.

use std::path::Path;

use image::{GenericImageView, Rgba, RgbaImage};

/// Result type for comparison operations
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors raised while loading or encoding images for comparison
#[derive(Debug)]
pub enum DiffError {
    /// An input image could not be read or decoded
    Decode(String),

    /// The diff image could not be encoded
    Encode(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for DiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffError::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
            DiffError::Encode(msg) => write!(f, "Failed to encode diff image: {}", msg),
            DiffError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiffError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiffError {
    fn from(err: std::io::Error) -> Self {
        DiffError::Io(err)
    }
}

/// Outcome of one pixel comparison
#[derive(Debug, Clone)]
pub struct PixelComparison {
    /// Whether the images matched within tolerance
    pub matched: bool,

    /// RMS deviation over all channels; `None` when the dimensions differed
    /// and no pixel loop ran
    pub rms: Option<f64>,

    /// PNG-encoded amplified difference image, present on a same-size mismatch
    pub diff_image: Option<Vec<u8>>,

    /// Failure description; empty string on a match
    pub message: String,
}

/// Factor applied to per-channel absolute differences in the diff image
const DIFF_AMPLIFICATION: u16 = 10;

/// Compare two image files under an RMS tolerance.
///
/// Deterministic: the same two files and tolerance always produce the same
/// verdict and the same diff image bytes.
pub fn compare_files(
    result_path: &Path,
    baseline_path: &Path,
    tolerance: f64,
) -> DiffResult<PixelComparison> {
    let result = image::open(result_path)
        .map_err(|e| DiffError::Decode(format!("{}: {}", result_path.display(), e)))?;
    let baseline = image::open(baseline_path)
        .map_err(|e| DiffError::Decode(format!("{}: {}", baseline_path.display(), e)))?;

    let (rw, rh) = result.dimensions();
    let (bw, bh) = baseline.dimensions();

    if (rw, rh) != (bw, bh) {
        return Ok(PixelComparison {
            matched: false,
            rms: None,
            diff_image: None,
            message: format!(
                "Error: Image files did not match.\n  Image sizes do not match: expected {}x{}, actual {}x{}.\n  Expected: {}\n  Actual: {}",
                bw,
                bh,
                rw,
                rh,
                baseline_path.display(),
                result_path.display()
            ),
        });
    }

    let result_rgba = result.to_rgba8();
    let baseline_rgba = baseline.to_rgba8();

    let mut sum_sq: f64 = 0.0;
    let mut diff_img = RgbaImage::new(rw, rh);

    for y in 0..rh {
        for x in 0..rw {
            let Rgba([ar, ag, ab, _]) = *result_rgba.get_pixel(x, y);
            let Rgba([br, bg, bb, _]) = *baseline_rgba.get_pixel(x, y);

            let dr = i32::from(ar) - i32::from(br);
            let dg = i32::from(ag) - i32::from(bg);
            let db = i32::from(ab) - i32::from(bb);
            sum_sq += f64::from(dr * dr + dg * dg + db * db);

            diff_img.put_pixel(
                x,
                y,
                Rgba([
                    amplify(dr.unsigned_abs()),
                    amplify(dg.unsigned_abs()),
                    amplify(db.unsigned_abs()),
                    255,
                ]),
            );
        }
    }

    let channel_count = f64::from(rw) * f64::from(rh) * 3.0;
    let rms = (sum_sq / channel_count).sqrt();
    let matched = rms <= tolerance;

    if matched {
        return Ok(PixelComparison {
            matched: true,
            rms: Some(rms),
            diff_image: None,
            message: String::new(),
        });
    }

    let mut png = Vec::new();
    diff_img
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| DiffError::Encode(e.to_string()))?;

    Ok(PixelComparison {
        matched: false,
        rms: Some(rms),
        diff_image: Some(png),
        message: format!(
            "Error: Image files did not match.\n  RMS Value: {:.6}\n  Expected: {}\n  Actual: {}\n  Tolerance: {:.6}",
            rms,
            baseline_path.display(),
            result_path.display(),
            tolerance
        ),
    })
}

fn amplify(delta: u32) -> u8 {
    (delta * u32::from(DIFF_AMPLIFICATION)).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Framebuffer;

    fn write_png(dir: &Path, name: &str, fb: &Framebuffer) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, fb.to_png().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_identical_images_match_at_zero_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let fb = Framebuffer::with_color(40, 30, [200, 200, 200]);
        let a = write_png(dir.path(), "a.png", &fb);
        let b = write_png(dir.path(), "b.png", &fb);

        let cmp = compare_files(&a, &b, 0.0).unwrap();
        assert!(cmp.matched);
        assert_eq!(cmp.rms, Some(0.0));
        assert!(cmp.diff_image.is_none());
    }

    #[test]
    fn test_mismatch_reports_rms_and_diff() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = Framebuffer::with_color(40, 30, [200, 200, 200]);
        let b = Framebuffer::with_color(40, 30, [200, 200, 200]);
        a.draw_rect(0, 0, 20, 30, [0, 0, 0]);

        let pa = write_png(dir.path(), "a.png", &a);
        let pb = write_png(dir.path(), "b.png", &b);

        let cmp = compare_files(&pa, &pb, 2.0).unwrap();
        assert!(!cmp.matched);
        assert!(cmp.rms.unwrap() > 2.0);
        assert!(cmp.diff_image.is_some());
        assert!(cmp.message.contains("Error: Image files did not match."));
        assert!(cmp.message.contains("RMS Value"));
    }

    #[test]
    fn test_size_mismatch_fails_without_pixel_loop() {
        let dir = tempfile::tempdir().unwrap();
        let a = Framebuffer::new(40, 30);
        let b = Framebuffer::new(41, 30);
        let pa = write_png(dir.path(), "a.png", &a);
        let pb = write_png(dir.path(), "b.png", &b);

        let cmp = compare_files(&pa, &pb, 100.0).unwrap();
        assert!(!cmp.matched);
        assert_eq!(cmp.rms, None);
        assert!(cmp.diff_image.is_none());
        assert!(cmp.message.contains("Image sizes do not match"));
    }

    #[test]
    fn test_tolerance_monotonicity() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = Framebuffer::with_color(40, 30, [100, 100, 100]);
        let b = Framebuffer::with_color(40, 30, [100, 100, 100]);
        a.draw_rect(5, 5, 4, 4, [140, 100, 100]);

        let pa = write_png(dir.path(), "a.png", &a);
        let pb = write_png(dir.path(), "b.png", &b);

        let rms = compare_files(&pa, &pb, 0.0).unwrap().rms.unwrap();
        assert!(rms > 0.0);

        // Below the measured deviation the comparison fails, at or above it passes
        assert!(!compare_files(&pa, &pb, rms * 0.9).unwrap().matched);
        assert!(compare_files(&pa, &pb, rms * 1.1).unwrap().matched);
    }

    #[test]
    fn test_deterministic_verdict_and_diff() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = Framebuffer::with_color(20, 20, [10, 20, 30]);
        let b = Framebuffer::with_color(20, 20, [10, 20, 30]);
        a.set_pixel(3, 3, [250, 20, 30]);

        let pa = write_png(dir.path(), "a.png", &a);
        let pb = write_png(dir.path(), "b.png", &b);

        let first = compare_files(&pa, &pb, 0.0).unwrap();
        let second = compare_files(&pa, &pb, 0.0).unwrap();
        assert_eq!(first.matched, second.matched);
        assert_eq!(first.rms, second.rms);
        assert_eq!(first.diff_image, second.diff_image);
    }
}
