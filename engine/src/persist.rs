use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bevy_math::Vec3;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::graph::{Waypoint, WaypointGraph, DEFAULT_MIN_LOOP_SIZE};

pub const FORMAT_VERSION: u32 = 1;

/// On-disk encodings, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Ron,
    Json,
    /// bincode, gzip-compressed.
    Binary,
}

impl TrackFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            "bin" => Ok(Self::Binary),
            _ => Err(TrackError::UnknownFormat(path.display().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointRecord {
    pub label: String,
    pub position: [f32; 3],
    pub forward: [f32; 3],
}

impl WaypointRecord {
    pub fn new(label: impl Into<String>, waypoint: &Waypoint) -> Self {
        Self {
            label: label.into(),
            position: waypoint.position.to_array(),
            forward: waypoint.forward.to_array(),
        }
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(Vec3::from_array(self.position), Vec3::from_array(self.forward))
    }
}

/// `Waypoint001`, `Waypoint002`, ... for zero-based index `i`.
pub fn waypoint_label(i: usize) -> String {
    format!("Waypoint{:03}", i + 1)
}

/// Versioned, serializable form of a [`WaypointGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub version: u32,
    pub name: String,
    pub generated_at: Option<DateTime<Utc>>,
    pub looped: bool,
    pub min_loop_size: usize,
    pub start: Option<usize>,
    pub finish: Option<usize>,
    pub waypoints: Vec<WaypointRecord>,
}

impl Default for TrackFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            name: String::new(),
            generated_at: None,
            looped: false,
            min_loop_size: DEFAULT_MIN_LOOP_SIZE,
            start: None,
            finish: None,
            waypoints: Vec::new(),
        }
    }
}

impl TrackFile {
    pub fn from_graph(name: impl Into<String>, graph: &WaypointGraph) -> Self {
        let over = graph.start_finish_override();
        Self {
            name: name.into(),
            generated_at: Some(Utc::now()),
            looped: graph.is_looped(),
            min_loop_size: graph.min_loop_size(),
            start: over.map(|sf| sf.start),
            finish: over.map(|sf| sf.finish),
            waypoints: graph
                .iter()
                .enumerate()
                .map(|(i, w)| WaypointRecord::new(waypoint_label(i), w))
                .collect(),
            ..Default::default()
        }
    }

    /// Rebuilds the graph. A lone `start` or `finish` is completed from the
    /// derived defaults.
    pub fn to_graph(&self) -> Result<WaypointGraph> {
        let waypoints = self.waypoints.iter().map(WaypointRecord::waypoint).collect();
        let graph = WaypointGraph::new(waypoints, self.looped).with_min_loop_size(self.min_loop_size);
        if self.start.is_none() && self.finish.is_none() {
            return Ok(graph);
        }
        let derived = graph.start_finish();
        let start = self.start.or(derived.map(|sf| sf.start)).unwrap_or(0);
        let finish = self.finish.or(derived.map(|sf| sf.finish)).unwrap_or(0);
        graph.with_start_finish(start, finish)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = TrackFormat::from_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        Self::read_from(reader, format)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = TrackFormat::from_path(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R, format: TrackFormat) -> Result<Self> {
        let file: Self = match format {
            TrackFormat::Ron => {
                let mut text = String::new();
                reader.read_to_string(&mut text)?;
                ron::from_str(&text)?
            }
            TrackFormat::Json => serde_json::from_reader(reader)?,
            TrackFormat::Binary => bincode::deserialize_from(GzDecoder::new(reader))?,
        };
        if file.version != FORMAT_VERSION {
            return Err(TrackError::UnsupportedVersion { found: file.version, expected: FORMAT_VERSION });
        }
        Ok(file)
    }

    pub fn write_to<W: Write>(&self, mut writer: W, format: TrackFormat) -> Result<()> {
        match format {
            TrackFormat::Ron => {
                let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
                writer.write_all(text.as_bytes())?;
            }
            TrackFormat::Json => serde_json::to_writer_pretty(writer, self)?,
            TrackFormat::Binary => {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                bincode::serialize_into(&mut encoder, self)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(TrackFormat::from_path(Path::new("a/track.RON")).unwrap(), TrackFormat::Ron);
        assert_eq!(TrackFormat::from_path(Path::new("track.json")).unwrap(), TrackFormat::Json);
        assert_eq!(TrackFormat::from_path(Path::new("track.bin")).unwrap(), TrackFormat::Binary);
        assert!(matches!(
            TrackFormat::from_path(Path::new("track.txt")),
            Err(TrackError::UnknownFormat(_))
        ));
    }

    #[test]
    fn labels_are_one_based_and_padded() {
        assert_eq!(waypoint_label(0), "Waypoint001");
        assert_eq!(waypoint_label(41), "Waypoint042");
    }

    #[test]
    fn future_versions_are_rejected() {
        let file = TrackFile { version: FORMAT_VERSION + 1, ..Default::default() };
        let mut buf = Vec::new();
        file.write_to(&mut buf, TrackFormat::Json).unwrap();
        let err = TrackFile::read_from(buf.as_slice(), TrackFormat::Json).unwrap_err();
        assert!(matches!(err, TrackError::UnsupportedVersion { found: 2, expected: 1 }));
    }

    #[test]
    fn start_finish_override_is_kept() {
        let graph = WaypointGraph::circle(Vec3::ZERO, 20.0, 8).with_start_finish(2, 5).unwrap();
        let file = TrackFile::from_graph("circle", &graph);
        assert_eq!((file.start, file.finish), (Some(2), Some(5)));
        let back = file.to_graph().unwrap();
        assert_eq!(back.start_finish_override(), graph.start_finish_override());

        let plain = TrackFile::from_graph("circle", &WaypointGraph::circle(Vec3::ZERO, 20.0, 8));
        assert_eq!((plain.start, plain.finish), (None, None));
    }

    #[test]
    fn lone_finish_fills_in_start() {
        let graph = WaypointGraph::circle(Vec3::ZERO, 20.0, 8);
        let mut file = TrackFile::from_graph("circle", &graph);
        file.finish = Some(3);
        let sf = file.to_graph().unwrap().start_finish().unwrap();
        assert_eq!((sf.start, sf.finish), (0, 3));
        file.finish = Some(30);
        assert!(matches!(file.to_graph(), Err(TrackError::IndexOutOfRange { index: 30, len: 8 })));
    }
}
