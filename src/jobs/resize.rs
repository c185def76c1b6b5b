//! Batch Resize Job
//!
//! Rescales every JPEG in a directory to a fixed resolution, ignoring aspect
//! ratio, and writes the result next to the original with a `_half` suffix.
//! Already-suffixed files are left alone so the job can be re-run safely.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::jobs::{list_files, JobReport};

/// Default output resolution
pub const RESIZE_WIDTH: u32 = 256;
pub const RESIZE_HEIGHT: u32 = 256;

/// Batch resize over one directory of JPEGs
pub struct ResizeJob {
    input_dir: PathBuf,
    width: u32,
    height: u32,
}

impl ResizeJob {
    /// Resize to the default 256x256
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self::with_size(input_dir, RESIZE_WIDTH, RESIZE_HEIGHT)
    }

    pub fn with_size<P: AsRef<Path>>(input_dir: P, width: u32, height: u32) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            width,
            height,
        }
    }

    /// Process every JPEG under the input directory
    pub fn run(&self) -> Result<JobReport> {
        let files = list_files(&self.input_dir, &["jpg", "jpeg"])?;

        info!(
            "Resizing {} JPEG files in {:?} to {}x{}",
            files.len(),
            self.input_dir,
            self.width,
            self.height
        );

        let mut report = JobReport::default();

        for path in files {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => {
                    report
                        .skipped
                        .push((path, "file name is not valid UTF-8".to_string()));
                    continue;
                }
            };

            // Output of a previous run
            if stem.ends_with("_half") {
                continue;
            }

            match self.process_one(&path, stem) {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!("Skipping {:?}: {:#}", path, e);
                    report.skipped.push((path, format!("{e:#}")));
                }
            }
        }

        info!(
            "Resize finished: {} processed, {} skipped",
            report.processed,
            report.skipped.len()
        );

        Ok(report)
    }

    fn process_one(&self, path: &Path, stem: &str) -> Result<()> {
        let img = image::open(path).with_context(|| format!("failed to open {:?}", path))?;

        let resized = img.resize_exact(
            self.width,
            self.height,
            image::imageops::FilterType::Triangle,
        );

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        let out_path = path.with_file_name(format!("{stem}_half.{ext}"));

        resized
            .save(&out_path)
            .with_context(|| format!("failed to write {:?}", out_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn fixture_dir(dims: &[(u32, u32)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (i, (w, h)) in dims.iter().enumerate() {
            let img = RgbImage::from_pixel(*w, *h, Rgb([10 * i as u8, 100, 200]));
            img.save(dir.path().join(format!("car_{i}.jpg"))).unwrap();
        }
        dir
    }

    #[test]
    fn test_resizes_to_exact_target_regardless_of_aspect() {
        let dir = fixture_dir(&[(512, 384), (100, 300)]);
        let report = ResizeJob::new(dir.path()).run().unwrap();
        assert_eq!(report.processed, 2);

        for i in 0..2 {
            let out = image::open(dir.path().join(format!("car_{i}_half.jpg"))).unwrap();
            assert_eq!((out.width(), out.height()), (256, 256));
        }
    }

    #[test]
    fn test_custom_size() {
        let dir = fixture_dir(&[(64, 64)]);
        ResizeJob::with_size(dir.path(), 32, 16).run().unwrap();

        let out = image::open(dir.path().join("car_0_half.jpg")).unwrap();
        assert_eq!((out.width(), out.height()), (32, 16));
    }

    #[test]
    fn test_rerun_skips_previous_outputs() {
        let dir = fixture_dir(&[(64, 64)]);
        let job = ResizeJob::new(dir.path());

        assert_eq!(job.run().unwrap().processed, 1);
        // Second run sees car_0.jpg and car_0_half.jpg; only the original counts
        assert_eq!(job.run().unwrap().processed, 1);
        assert!(!dir.path().join("car_0_half_half.jpg").exists());
    }

    #[test]
    fn test_bad_file_is_skipped_not_fatal() {
        let dir = fixture_dir(&[(64, 64)]);
        std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let report = ResizeJob::new(dir.path()).run().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_png_files_ignored() {
        let dir = fixture_dir(&[(64, 64)]);
        let png = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        png.save(dir.path().join("extra.png")).unwrap();

        let report = ResizeJob::new(dir.path()).run().unwrap();
        assert_eq!(report.total(), 1);
    }
}
