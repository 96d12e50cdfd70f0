//! Stream configuration management.
//!
//! Maps camera model names to the ordered list of streams enabled on a
//! fresh pipeline. The table is injected into the device manager at
//! construction time, so supporting a new camera model is a configuration
//! change, not a code change.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Depth,
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// 16-bit depth units.
    Z16,
    Rgb8,
    Bgr8,
}

/// One stream to enable, in the SDK's `enable_stream` argument order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    pub width: u32,
    pub height: u32,
    pub format: StreamFormat,
    pub fps: u32,
}

impl StreamDescriptor {
    pub fn new(kind: StreamKind, width: u32, height: u32, format: StreamFormat, fps: u32) -> Self {
        Self {
            kind,
            width,
            height,
            format,
            fps,
        }
    }
}

/// Model name to stream list. Assumes a USB 3.x connection; lower the
/// resolutions for USB 2 hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfigTable {
    models: BTreeMap<String, Vec<StreamDescriptor>>,
}

impl Default for StreamConfigTable {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "Intel RealSense D435".to_string(),
            vec![
                StreamDescriptor::new(StreamKind::Depth, 1280, 720, StreamFormat::Z16, 30),
                StreamDescriptor::new(StreamKind::Color, 1280, 720, StreamFormat::Rgb8, 30),
            ],
        );
        models.insert(
            "Intel RealSense L515".to_string(),
            vec![
                StreamDescriptor::new(StreamKind::Depth, 1024, 768, StreamFormat::Z16, 30),
                StreamDescriptor::new(StreamKind::Color, 1024, 768, StreamFormat::Rgb8, 30),
            ],
        );
        Self { models }
    }
}

impl StreamConfigTable {
    /// An empty table, for callers that register models themselves.
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, model: impl Into<String>, streams: Vec<StreamDescriptor>) {
        self.models.insert(model.into(), streams);
    }

    pub fn streams_for(&self, model: &str) -> Option<&[StreamDescriptor]> {
        self.models.get(model).map(|s| s.as_slice())
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }

    /// Load a table from a TOML file, falling back to the built-in
    /// defaults when the file does not exist.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Stream table not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::Io(format!("Failed to read stream table: {}", e)))?;

        let table: StreamConfigTable = toml::from_str(&contents)
            .map_err(|e| CameraError::Io(format!("Failed to parse stream table: {}", e)))?;

        log::info!("Loaded stream table from {:?}", path);
        Ok(table)
    }

    /// Save the table to a TOML file, creating parent directories as
    /// needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CameraError::Io(format!("Failed to create config dir: {}", e)))?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CameraError::Io(format!("Failed to serialize stream table: {}", e)))?;

        fs::write(path, contents)
            .map_err(|e| CameraError::Io(format!("Failed to write stream table: {}", e)))?;

        log::info!("Saved stream table to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_models() {
        let table = StreamConfigTable::default();
        assert!(table.streams_for("Intel RealSense D435").is_some());
        assert!(table.streams_for("Intel RealSense L515").is_some());
        assert!(table.streams_for("Intel RealSense D999").is_none());
    }

    #[test]
    fn default_streams_have_matched_resolutions() {
        // The hardware backend treats framesets as pixel-aligned only when
        // depth and color run at the same resolution.
        let table = StreamConfigTable::default();
        for model in table.models().collect::<Vec<_>>() {
            let streams = table.streams_for(model).unwrap();
            let (w, h) = (streams[0].width, streams[0].height);
            assert!(streams.iter().all(|s| s.width == w && s.height == h));
        }
    }

    #[test]
    fn table_survives_a_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.toml");
        let table = StreamConfigTable::default();
        table.save_to_file(&path).unwrap();
        assert_eq!(StreamConfigTable::load_from_file(&path).unwrap(), table);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let table = StreamConfigTable::load_from_file("/nonexistent/streams.toml").unwrap();
        assert_eq!(table, StreamConfigTable::default());
    }

    #[test]
    fn insert_registers_new_model() {
        let mut table = StreamConfigTable::empty();
        table.insert(
            "Synthetic D435",
            vec![StreamDescriptor::new(
                StreamKind::Color,
                640,
                480,
                StreamFormat::Rgb8,
                30,
            )],
        );
        assert_eq!(table.streams_for("Synthetic D435").unwrap().len(), 1);
    }
}
