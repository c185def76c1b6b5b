//! Car Dataset Loader
//!
//! Loads the directory-backed dataset: the root contains one subdirectory
//! per class, and the subdirectory name is the class label. The dataset is
//! never mutated; images are loaded lazily when a feed asks for them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{DynamicImage, ImageReader};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::CarVisionError;

/// A single image sample with its label and metadata
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (the subdirectory name)
    pub class_name: String,
    /// Unique sample ID
    pub id: usize,
}

/// Directory-backed dataset with lazy image loading
#[derive(Debug)]
pub struct CarDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples in the dataset
    pub samples: Vec<ImageSample>,
    /// Mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
    /// Mapping from label index to class name
    pub idx_to_class: HashMap<usize, String>,
}

impl CarDataset {
    /// Create a new dataset from a directory
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── avante/
    /// │   ├── image1.jpg
    /// │   └── image2.jpg
    /// ├── k9/
    /// │   └── ...
    /// └── ...
    /// ```
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading car dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            return Err(CarVisionError::PathNotFound(root_dir).into());
        }

        // Discover all class directories
        let mut class_dirs: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    class_dirs.push(name.to_string());
                }
            }
        }
        class_dirs.sort();

        if class_dirs.is_empty() {
            anyhow::bail!("No class subdirectories found in {:?}", root_dir);
        }

        info!("Found {} classes", class_dirs.len());

        let class_to_idx: HashMap<String, usize> = class_dirs
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let idx_to_class: HashMap<usize, String> = class_dirs
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        // Collect all samples
        let mut samples = Vec::new();
        let mut sample_id: usize = 0;

        for class_name in &class_dirs {
            let class_dir = root_dir.join(class_name);
            let label = class_to_idx[class_name];

            let mut class_count = 0usize;
            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();

                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if ["jpg", "jpeg", "png", "bmp"].contains(&ext.as_str()) {
                        samples.push(ImageSample {
                            path,
                            label,
                            class_name: class_name.clone(),
                            id: sample_id,
                        });
                        sample_id += 1;
                        class_count += 1;
                    }
                }
            }

            debug!(
                "Class '{}' (label {}): {} samples",
                class_name, label, class_count
            );
        }

        if samples.is_empty() {
            anyhow::bail!("No images found under {:?}", root_dir);
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            class_to_idx,
            idx_to_class,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.class_to_idx.len()
    }

    /// Get samples for a specific class
    pub fn samples_by_class(&self, class_idx: usize) -> Vec<&ImageSample> {
        self.samples
            .iter()
            .filter(|s| s.label == class_idx)
            .collect()
    }

    /// Get statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.idx_to_class.clone(),
        }
    }
}

/// Load an image from disk as RGB
pub fn load_rgb(path: &Path) -> std::result::Result<DynamicImage, CarVisionError> {
    let img = ImageReader::open(path)
        .map_err(|e| CarVisionError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| CarVisionError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Statistics about the dataset
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: HashMap<usize, String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\nDataset statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        let mut sorted: Vec<_> = self.class_names.iter().collect();
        sorted.sort_by_key(|(idx, _)| *idx);

        for (idx, name) in sorted {
            println!("    {:3}. {:24} {:5}", idx, name, self.class_counts[*idx]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_image(path: &Path, w: u32, h: u32) {
        let img = RgbImage::from_pixel(w, h, Rgb([120, 40, 200]));
        img.save(path).unwrap();
    }

    fn fixture_dataset(classes: &[(&str, usize)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, count) in classes {
            let class_dir = dir.path().join(name);
            std::fs::create_dir(&class_dir).unwrap();
            for i in 0..*count {
                write_image(&class_dir.join(format!("img_{i}.png")), 8, 8);
            }
        }
        dir
    }

    #[test]
    fn test_discovers_classes_in_sorted_order() {
        let dir = fixture_dataset(&[("sonata", 2), ("avante", 3)]);
        let dataset = CarDataset::new(dir.path()).unwrap();

        assert_eq!(dataset.num_classes(), 2);
        assert_eq!(dataset.class_to_idx["avante"], 0);
        assert_eq!(dataset.class_to_idx["sonata"], 1);
        assert_eq!(dataset.len(), 5);
    }

    #[test]
    fn test_missing_directory_fails() {
        let err = CarDataset::new("/nonexistent/dataset/path").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CarVisionError>(),
            Some(CarVisionError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_load_rgb_reports_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        assert!(matches!(
            load_rgb(&bad),
            Err(CarVisionError::ImageLoad(_, _))
        ));
        assert!(matches!(
            load_rgb(Path::new("/nonexistent/img.png")),
            Err(CarVisionError::ImageLoad(_, _))
        ));
    }

    #[test]
    fn test_no_class_dirs_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CarDataset::new(dir.path()).is_err());
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = fixture_dataset(&[("k9", 2)]);
        std::fs::write(dir.path().join("k9").join("notes.txt"), "not an image").unwrap();

        let dataset = CarDataset::new(dir.path()).unwrap();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_stats_counts_per_class() {
        let dir = fixture_dataset(&[("avante", 3), ("k9", 1)]);
        let dataset = CarDataset::new(dir.path()).unwrap();

        let stats = dataset.stats();
        assert_eq!(stats.class_counts, vec![3, 1]);
        assert_eq!(stats.total_samples, 4);
    }
}
