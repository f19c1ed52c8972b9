use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use track_engine::{
    DebugCapture, ExtractionParams, ExtractionStatus, HeightSampler, Heightmap, PathWalker, TerrainExtent, TrackFile,
    TrackMask, Vec2, Vec3, WaypointGraph, DEFAULT_LINE_THRESHOLD,
};
use tracing::{info, warn};

mod ops;
mod preview;

use preview::Preview;

#[derive(Parser, Debug)]
#[command(name = "trackctl", version, about = "Extract and maintain track waypoint files")]
struct Cli {
    /// Debug logging unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// World placement of mask and heightmap images.
#[derive(Args, Debug, Clone)]
struct ExtentArgs {
    /// Minimum corner of the terrain, `x,y,z`.
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
    origin: Vec3,

    /// Terrain size along world x and z, `x,z`.
    #[arg(long, value_parser = parse_vec2)]
    size: Vec2,
}

impl ExtentArgs {
    fn extent(&self) -> TerrainExtent {
        TerrainExtent::new(self.origin, self.size)
    }
}

#[derive(Args, Debug, Clone)]
struct HeightmapArgs {
    /// Greyscale heightmap covering the same extent.
    #[arg(long)]
    heightmap: Option<PathBuf>,

    /// World height of a white heightmap pixel above the origin.
    #[arg(long, default_value_t = 100.0)]
    max_height: f32,
}

impl HeightmapArgs {
    fn load(&self, extent: TerrainExtent) -> Result<Option<Heightmap>> {
        self.heightmap
            .as_ref()
            .map(|path| {
                Heightmap::open(path, extent, self.max_height)
                    .with_context(|| format!("loading heightmap {}", path.display()))
            })
            .transpose()
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk a mask image into a track file.
    Extract {
        /// Drivability mask; the red channel marks the track.
        #[arg(long)]
        mask: PathBuf,
        #[command(flatten)]
        extent: ExtentArgs,
        #[command(flatten)]
        terrain: HeightmapArgs,
        /// Extraction parameters in RON; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        spacing: Option<f32>,
        #[arg(long)]
        max_waypoints: Option<usize>,
        #[arg(long)]
        track_width: Option<f32>,
        /// Radius of the direction sample ring.
        #[arg(long)]
        sample_radius: Option<f32>,
        #[arg(long)]
        name: Option<String>,
        /// Also render the run's sampled and rejected points to this PNG.
        #[arg(long)]
        debug_png: Option<PathBuf>,
        /// Output track file (.ron, .json or .bin).
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Move every waypoint onto the terrain surface.
    Snap {
        track: PathBuf,
        #[command(flatten)]
        extent: ExtentArgs,
        #[arg(long)]
        heightmap: PathBuf,
        #[arg(long, default_value_t = 100.0)]
        max_height: f32,
        #[arg(long, default_value_t = 0.5)]
        height_above: f32,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Point each waypoint at the next one.
    Orient {
        track: PathBuf,
        /// Wrap the last waypoint to the first even on open tracks.
        #[arg(long)]
        strict: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Add a waypoint halfway to the successor of waypoint `after`.
    Insert {
        track: PathBuf,
        #[arg(long)]
        after: usize,
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
        origin: Vec3,
        /// Terrain size, required with --heightmap.
        #[arg(long, value_parser = parse_vec2)]
        size: Option<Vec2>,
        #[command(flatten)]
        terrain: HeightmapArgs,
        #[arg(long, default_value_t = 0.5)]
        height_above: f32,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Relabel waypoints Waypoint001, Waypoint002, ... in order.
    Renumber {
        track: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Reorder waypoints by label.
    Sort {
        track: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write a looped circular layout.
    Circle {
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
        center: Vec3,
        #[arg(long, default_value_t = 20.0)]
        radius: f32,
        #[arg(long, default_value_t = 8)]
        count: usize,
        #[arg(long, default_value = "circle")]
        name: String,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Render a track over its mask.
    Preview {
        track: PathBuf,
        #[arg(long)]
        mask: PathBuf,
        #[command(flatten)]
        extent: ExtentArgs,
        #[arg(long, default_value_t = 4)]
        scale: u32,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print a summary of a track file.
    Info { track: PathBuf },
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got `{s}`"));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|e| format!("`{part}`: {e}"))?;
    }
    Ok(out)
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    parse_floats::<3>(s).map(Vec3::from_array)
}

fn parse_vec2(s: &str) -> Result<Vec2, String> {
    parse_floats::<2>(s).map(Vec2::from_array)
}

fn load_track(path: &Path) -> Result<TrackFile> {
    TrackFile::load(path).with_context(|| format!("reading track {}", path.display()))
}

fn save_track(file: &TrackFile, path: &Path) -> Result<()> {
    file.save(path).with_context(|| format!("writing track {}", path.display()))?;
    info!(path = %path.display(), waypoints = file.waypoints.len(), "saved track");
    Ok(())
}

fn load_mask(path: &Path, extent: TerrainExtent) -> Result<TrackMask> {
    TrackMask::open(path, extent).with_context(|| format!("loading mask {}", path.display()))
}

/// Applies `edit` to the track at `track` and writes it to `out`, or back in place.
fn edit_track(track: &Path, out: Option<&Path>, edit: impl FnOnce(&mut TrackFile) -> Result<()>) -> Result<()> {
    let mut file = load_track(track)?;
    edit(&mut file)?;
    save_track(&file, out.unwrap_or(track))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            mask,
            extent,
            terrain,
            config,
            spacing,
            max_waypoints,
            track_width,
            sample_radius,
            name,
            debug_png,
            out,
        } => {
            let mut params = match &config {
                Some(path) => ExtractionParams::load(path)
                    .with_context(|| format!("reading parameters {}", path.display()))?,
                None => ExtractionParams::default(),
            };
            if let Some(v) = spacing {
                params.step_spacing = v;
            }
            if let Some(v) = max_waypoints {
                params.max_waypoints = v;
            }
            if let Some(v) = track_width {
                params.track_width = v;
            }
            if let Some(v) = sample_radius {
                params.sample_radius = v;
            }

            let extent = extent.extent();
            let track_mask = load_mask(&mask, extent)?;
            let heightmap = terrain.load(extent)?;
            let mut capture = DebugCapture::new();

            let mut walker = PathWalker::new(&track_mask, params).with_observer(&mut capture);
            if let Some(heightmap) = &heightmap {
                walker = walker.with_terrain(heightmap);
            }
            let extraction = walker.extract()?;

            if let Some(path) = &debug_png {
                let mut preview = Preview::new(&track_mask, 4);
                preview.draw_capture(&capture).draw_graph(&extraction.graph);
                preview
                    .into_image()
                    .save(path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            match extraction.status {
                ExtractionStatus::SeedNotFound => {
                    bail!("no drivable pixel found in {}", mask.display())
                }
                ExtractionStatus::AdvanceFailed { produced } => {
                    warn!(produced, "extraction stopped early, track is incomplete")
                }
                _ => {}
            }

            let name = name.unwrap_or_else(|| {
                mask.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "track".into())
            });
            save_track(&TrackFile::from_graph(name, &extraction.graph), &out)
        }
        Command::Snap { track, extent, heightmap, max_height, height_above, out } => {
            let map = Heightmap::open(&heightmap, extent.extent(), max_height)
                .with_context(|| format!("loading heightmap {}", heightmap.display()))?;
            edit_track(&track, out.as_deref(), |file| {
                ops::snap_to_terrain(file, &map, height_above);
                Ok(())
            })
        }
        Command::Orient { track, strict, out } => edit_track(&track, out.as_deref(), |file| {
            ops::orient(file, strict);
            Ok(())
        }),
        Command::Insert { track, after, origin, size, terrain, height_above, out } => {
            let heightmap = match (&terrain.heightmap, size) {
                (Some(_), Some(size)) => terrain.load(TerrainExtent::new(origin, size))?,
                (Some(_), None) => bail!("--heightmap needs --size"),
                _ => None,
            };
            edit_track(&track, out.as_deref(), |file| {
                let snap = heightmap.as_ref().map(|h| (h as &dyn HeightSampler, height_above));
                ops::insert_after(file, after, snap)?;
                Ok(())
            })
        }
        Command::Renumber { track, out } => edit_track(&track, out.as_deref(), |file| {
            ops::renumber(file);
            Ok(())
        }),
        Command::Sort { track, out } => edit_track(&track, out.as_deref(), |file| {
            ops::sort_by_label(file);
            Ok(())
        }),
        Command::Circle { center, radius, count, name, out } => {
            if count < 2 {
                bail!("a circle needs at least 2 waypoints");
            }
            let graph = WaypointGraph::circle(center, radius, count);
            save_track(&TrackFile::from_graph(name, &graph), &out)
        }
        Command::Preview { track, mask, extent, scale, out } => {
            let graph = load_track(&track)?.to_graph()?;
            let track_mask = load_mask(&mask, extent.extent())?;
            let mut preview = Preview::new(&track_mask, scale);
            preview.draw_graph(&graph);
            preview
                .into_image()
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            Ok(())
        }
        Command::Info { track } => {
            let file = load_track(&track)?;
            let graph = file.to_graph()?;
            println!("name:        {}", file.name);
            if let Some(at) = file.generated_at {
                println!("generated:   {at}");
            }
            println!("waypoints:   {}", graph.len());
            println!("looped:      {} (wraps: {})", graph.is_looped(), graph.wraps());
            println!("length:      {:.1}", graph.total_length());
            if let Some(sf) = graph.start_finish() {
                println!("start:       {}", file.waypoints[sf.start].label);
                println!("finish:      {}", file.waypoints[sf.finish].label);
            }
            if let (Some(first), Some(last)) = (graph.first(), graph.last()) {
                let gap = first.position.distance(last.position);
                println!("closing gap: {gap:.2} (finish line radius {DEFAULT_LINE_THRESHOLD})");
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
    run(cli)
}
