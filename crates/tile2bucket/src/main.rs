use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use rayon::prelude::*;
use shape_bucket::{
    group_layers, parse_style, transfer, Bucket, BucketOptions, Extent, FeatureIndex, ShapeBucket,
    ShapeLayer, SpriteAtlas, TileFeature,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use walkdir::WalkDir;

#[derive(Parser, Debug, Clone)]
#[command(name = "tile2bucket", version)]
struct Args {
    /// Directory of decoded tiles (`*.json`, searched recursively).
    #[arg(long, default_value = "tiles")]
    input_dir: String,

    #[arg(long, default_value = "buckets")]
    output_dir: String,

    /// Style document; only its `shape` layers are used.
    #[arg(long)]
    style: String,

    /// Sprite index JSON. Without it, icon layers produce no geometry.
    #[arg(long)]
    sprite: Option<String>,

    /// Evaluate style functions at this zoom instead of each tile's own.
    #[arg(long)]
    zoom: Option<f32>,

    /// Tile-local coordinate range, used when a tile does not state its own.
    #[arg(long, default_value_t = 8192)]
    extent: u32,

    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Deflate bucket bodies.
    #[arg(long, default_value_t = false)]
    compress: bool,
}

/// A decoded tile: `{"z", "x", "y", "extent"?, "layers": {name: [feature]}}`.
#[derive(Debug, serde::Deserialize)]
struct TileFile {
    z: u32,
    x: u32,
    y: u32,
    #[serde(default)]
    extent: Option<u32>,
    layers: HashMap<String, Vec<TileFeature>>,
}

/// Shared, read-only inputs for every tile.
struct Job {
    args: Args,
    groups: Vec<Vec<Arc<ShapeLayer>>>,
    atlas: SpriteAtlas,
}

fn find_tiles(input_dir: &str) -> Vec<PathBuf> {
    let mut tiles: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();

    tiles.sort();
    tiles
}

fn output_path(output_dir: &str, tile: &TileFile, layer_id: &str) -> PathBuf {
    Path::new(output_dir).join(format!("{}-{}-{}.{}.shpb", tile.z, tile.x, tile.y, layer_id))
}

/// Build and write every layer group's bucket for one tile. Returns the number of files written.
fn process_tile(path: &Path, job: &Job) -> Result<usize> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tile: TileFile =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let extent = Extent::new(tile.extent.unwrap_or(job.args.extent))
        .with_context(|| format!("{}: bad extent", path.display()))?;
    let zoom = job.args.zoom.unwrap_or(tile.z as f32);

    let mut feature_index = FeatureIndex::new();
    let mut written = 0;

    for (index, group) in job.groups.iter().enumerate() {
        let Some(features) = tile.layers.get(&group[0].source_layer) else {
            continue;
        };

        let out_path = output_path(&job.args.output_dir, &tile, &group[0].id);
        if out_path.exists() && !job.args.overwrite {
            debug!("Skipping existing file: {}", out_path.display());
            continue;
        }

        let options = BucketOptions::new(index as u32, zoom).with_extent(extent);
        let mut bucket = ShapeBucket::new(options, group.clone())?;

        let needed = bucket.populate(features, &mut feature_index);
        let icons = job.atlas.resolve(&needed);
        if icons.len() < needed.len() {
            debug!(
                "{}: {} of {} icons missing from the sprite",
                out_path.display(),
                needed.len() - icons.len(),
                needed.len()
            );
        }

        bucket.prepare(&icons);
        bucket.place();

        if bucket.is_empty() {
            continue;
        }

        let buffers = bucket.finish();
        transfer::write_file(&out_path, &buffers, job.args.compress)
            .with_context(|| format!("writing {}", out_path.display()))?;

        debug!(
            "{}: {} vertices, {} triangles, {} segments",
            out_path.display(),
            buffers.vertex_count(),
            buffers.triangle_count(),
            buffers.segments().len()
        );
        written += 1;
    }

    debug!("{}: {} features indexed", path.display(), feature_index.len());

    Ok(written)
}

fn load_job(args: Args) -> Result<Job> {
    let style = fs::read_to_string(&args.style).with_context(|| format!("reading {}", args.style))?;
    let layers = parse_style(&style).with_context(|| format!("parsing {}", args.style))?;
    let groups = group_layers(layers);

    let atlas = match &args.sprite {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            SpriteAtlas::from_sprite_json(&json).with_context(|| format!("parsing {}", path))?
        }
        None => SpriteAtlas::new(),
    };

    info!(
        "Style: {} shape layers in {} buckets; sprite: {} images",
        groups.iter().map(Vec::len).sum::<usize>(),
        groups.len(),
        atlas.len()
    );

    Ok(Job { args, groups, atlas })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    fs::create_dir_all(&args.output_dir)?;

    let tiles = find_tiles(&args.input_dir);
    let job = load_job(args)?;

    info!("Processing {} tiles...", tiles.len());
    let start = Instant::now();

    let written: usize = tiles
        .par_iter()
        .map(|path| match process_tile(path, &job) {
            Ok(n) => n,
            Err(err) => {
                warn!("Error processing {}: {:#}", path.display(), err);
                0
            }
        })
        .sum();

    info!(
        "Wrote {} buckets from {} tiles in {:.2?}",
        written,
        tiles.len(),
        start.elapsed()
    );

    Ok(())
}
