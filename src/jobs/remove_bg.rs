//! Background Removal Job
//!
//! Walks a directory of PNG images, predicts a foreground alpha mask for
//! each, and writes RGBA cut-outs to a sibling directory named
//! `<dir>_remove`. Output files are numbered `<dir>_remove0.png`,
//! `<dir>_remove1.png`, ... in sorted input order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, RgbaImage};
use tracing::{info, warn};

use crate::dataset::loader::load_rgb;
use crate::jobs::{list_files, JobReport};

/// Predicts a per-pixel foreground alpha mask for an image
///
/// The mask must have the same dimensions as the input.
pub trait BackgroundRemover {
    fn matte(&self, image: &DynamicImage) -> Result<GrayImage>;
}

/// Batch background removal over one directory of PNGs
pub struct RemoveBackgroundJob {
    input_dir: PathBuf,
}

impl RemoveBackgroundJob {
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory the cut-outs are written to: a sibling of the input
    /// directory with `_remove` appended to its name
    pub fn output_dir(&self) -> Result<PathBuf> {
        let name = self
            .input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("cannot derive output name from {:?}", self.input_dir))?;

        let parent = self.input_dir.parent().unwrap_or_else(|| Path::new("."));
        Ok(parent.join(format!("{name}_remove")))
    }

    /// Process every PNG under the input directory
    pub fn run(&self, remover: &dyn BackgroundRemover) -> Result<JobReport> {
        let files = list_files(&self.input_dir, &["png"])?;
        let output_dir = self.output_dir()?;
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output directory {:?}", output_dir))?;

        let prefix = output_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("remove")
            .to_string();

        info!(
            "Removing backgrounds: {} PNG files from {:?} -> {:?}",
            files.len(),
            self.input_dir,
            output_dir
        );

        let mut report = JobReport::default();

        for path in files {
            match self.process_one(&path, remover) {
                Ok(cutout) => {
                    let out_path = output_dir.join(format!("{prefix}{}.png", report.processed));
                    if let Err(e) = cutout
                        .save(&out_path)
                        .with_context(|| format!("failed to write {:?}", out_path))
                    {
                        warn!("Skipping {:?}: {:#}", path, e);
                        report.skipped.push((path, format!("{e:#}")));
                        continue;
                    }

                    report.processed += 1;
                }
                Err(e) => {
                    warn!("Skipping {:?}: {:#}", path, e);
                    report.skipped.push((path, format!("{e:#}")));
                }
            }
        }

        info!(
            "Background removal finished: {} processed, {} skipped",
            report.processed,
            report.skipped.len()
        );

        Ok(report)
    }

    /// Matte a single image and composite the RGBA cut-out
    fn process_one(&self, path: &Path, remover: &dyn BackgroundRemover) -> Result<RgbaImage> {
        let image = load_rgb(path)?;
        let mask = remover.matte(&image)?;

        anyhow::ensure!(
            mask.dimensions() == (image.width(), image.height()),
            "mask dimensions {:?} do not match image {:?}",
            mask.dimensions(),
            (image.width(), image.height())
        );

        let rgb = image.to_rgb8();
        let cutout = RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y);
            let alpha = mask.get_pixel(x, y)[0];
            image::Rgba([p[0], p[1], p[2], alpha])
        });

        Ok(cutout)
    }
}
