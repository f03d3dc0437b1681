use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::category::{Category, CategoryTable};
use crate::ingest::CameraConfig;

const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_CAMERA_WIDTH: u32 = 1280;
const DEFAULT_CAMERA_HEIGHT: u32 = 960;
const DEFAULT_REFERENCE_SIZE: u32 = 640;
const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_CYCLE_INTERVAL_MS: u64 = 33;
const DEFAULT_CHANNEL_CAPACITY: usize = 8;
const DEFAULT_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
struct SortcamConfigFile {
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
    presentation: Option<PresentationConfigFile>,
    categories: Option<Vec<CategoryEntry>>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    reference_size: Option<u32>,
    class_names_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    threshold: Option<f32>,
    cycle_interval_ms: Option<u64>,
    channel_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct PresentationConfigFile {
    timeout_ms: Option<u64>,
    show_fps: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    label: String,
    category: Category,
}

#[derive(Debug, Clone)]
pub struct SortcamConfig {
    pub camera: CameraConfig,
    pub model: ModelSettings,
    pub threshold: f32,
    pub cycle_interval: Duration,
    pub channel_capacity: usize,
    pub no_detection_timeout: Duration,
    pub show_fps: bool,
    categories: Option<Vec<(String, Category)>>,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX model path; only used with the `backend-tract` feature.
    pub path: Option<PathBuf>,
    /// Side length of the model's square input space.
    pub reference_size: u32,
    /// Class-name list, one label per line.
    pub class_names_path: Option<PathBuf>,
}

impl SortcamConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SORTCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SortcamConfigFile) -> Self {
        let camera = CameraConfig {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let model = ModelSettings {
            path: file.model.as_ref().and_then(|model| model.path.clone()),
            reference_size: file
                .model
                .as_ref()
                .and_then(|model| model.reference_size)
                .unwrap_or(DEFAULT_REFERENCE_SIZE),
            class_names_path: file
                .model
                .as_ref()
                .and_then(|model| model.class_names_path.clone()),
        };
        let threshold = file
            .detection
            .as_ref()
            .and_then(|detection| detection.threshold)
            .unwrap_or(DEFAULT_THRESHOLD);
        let cycle_interval = Duration::from_millis(
            file.detection
                .as_ref()
                .and_then(|detection| detection.cycle_interval_ms)
                .unwrap_or(DEFAULT_CYCLE_INTERVAL_MS),
        );
        let channel_capacity = file
            .detection
            .as_ref()
            .and_then(|detection| detection.channel_capacity)
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let no_detection_timeout = Duration::from_millis(
            file.presentation
                .as_ref()
                .and_then(|presentation| presentation.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        );
        let show_fps = file
            .presentation
            .as_ref()
            .and_then(|presentation| presentation.show_fps)
            .unwrap_or(true);
        let categories = file.categories.map(|entries| {
            entries
                .into_iter()
                .map(|entry| (entry.label, entry.category))
                .collect()
        });
        Self {
            camera,
            model,
            threshold,
            cycle_interval,
            channel_capacity,
            no_detection_timeout,
            show_fps,
            categories,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SORTCAM_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(path) = std::env::var("SORTCAM_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("SORTCAM_CLASS_NAMES") {
            if !path.trim().is_empty() {
                self.model.class_names_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(threshold) = std::env::var("SORTCAM_THRESHOLD") {
            let value: f32 = threshold
                .parse()
                .map_err(|_| anyhow!("SORTCAM_THRESHOLD must be a float in [0, 1]"))?;
            self.threshold = value;
        }
        if let Ok(timeout) = std::env::var("SORTCAM_TIMEOUT_MS") {
            let millis: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("SORTCAM_TIMEOUT_MS must be an integer number of milliseconds"))?;
            self.no_detection_timeout = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(anyhow!(
                "threshold {} is outside [0, 1]",
                self.threshold
            ));
        }
        if self.model.reference_size == 0 {
            return Err(anyhow!("model reference size must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.cycle_interval.is_zero() {
            return Err(anyhow!("cycle interval must be greater than zero"));
        }
        if self.no_detection_timeout.is_zero() {
            return Err(anyhow!("no-detection timeout must be greater than zero"));
        }
        if self.channel_capacity == 0 {
            return Err(anyhow!("channel capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Category table: the configured override, or the built-in COCO map.
    pub fn category_table(&self) -> CategoryTable {
        match &self.categories {
            Some(pairs) => CategoryTable::new(pairs.iter().cloned()),
            None => CategoryTable::default(),
        }
    }

    /// Class-name list: the configured file, or the built-in COCO names.
    pub fn class_names(&self) -> Result<Vec<String>> {
        match &self.model.class_names_path {
            Some(path) => load_class_names(path),
            None => Ok(default_class_names()),
        }
    }
}

fn read_config_file(path: &Path) -> Result<SortcamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Load an ordered class-name list, one label per line, empty lines skipped
/// (the classic `coco.names` format).
pub fn load_class_names(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read class names {}: {}", path.display(), e))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The 80 COCO class names in model index order.
pub fn default_class_names() -> Vec<String> {
    const NAMES: &[&str] = &[
        "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
        "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
        "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
        "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
        "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
        "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
        "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
        "sofa", "pottedplant", "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse",
        "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
        "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
        "toothbrush",
    ];
    NAMES.iter().map(|&name| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_class_names_cover_coco() {
        let names = default_class_names();
        assert_eq!(names.len(), 80);
        assert_eq!(names[0], "person");
        assert_eq!(names[39], "bottle");
        assert_eq!(names[79], "toothbrush");
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut cfg = SortcamConfig::from_file(SortcamConfigFile::default());
        cfg.threshold = 1.2;
        assert!(cfg.validate().is_err());
        cfg.threshold = 0.5;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_durations() {
        let mut cfg = SortcamConfig::from_file(SortcamConfigFile::default());
        cfg.cycle_interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = SortcamConfig::from_file(SortcamConfigFile::default());
        cfg.no_detection_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_match_the_reference_deployment() {
        let cfg = SortcamConfig::from_file(SortcamConfigFile::default());
        assert_eq!(cfg.camera.url, "stub://camera");
        assert_eq!(cfg.model.reference_size, 640);
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.cycle_interval, Duration::from_millis(33));
        assert_eq!(cfg.no_detection_timeout, Duration::from_millis(2000));
        assert!(cfg.show_fps);
    }
}
