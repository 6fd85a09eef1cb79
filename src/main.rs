//! Command-line demo: generates terrain, digs a lit cave, prints the shading.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use hashbrown::HashMap;
use log::LevelFilter;
use lumen_blocks::{Block, BlockRegistry};
use lumen_lighting::LightingSettings;
use lumen_runtime::{ChannelObserver, LightEngine, LightEvent};
use lumen_world::{CHUNK_SIZE_I32, ChunkCoord, Generator, GridWorld, WorldView};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "2D voxel lighting demo")]
struct Args {
    /// Block definitions (TOML)
    #[arg(long, default_value = "assets/blocks.toml")]
    blocks: PathBuf,
    /// Lighting settings (TOML); defaults when omitted
    #[arg(long)]
    lighting: Option<PathBuf>,
    #[arg(long, default_value_t = 1337)]
    seed: i32,
    /// World width in chunks
    #[arg(long, default_value_t = 4)]
    width: i32,
    /// Overrides `lookup_radius` from the settings file
    #[arg(long)]
    radius: Option<u32>,
    /// Worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    workers: usize,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

const SHADES: &[u8] = b" .:-=+*#%@";

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &args.log_file {
        loggers.push(WriteLogger::new(
            LevelFilter::Trace,
            Config::default(),
            File::create(path)?,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

fn block_named(reg: &BlockRegistry, name: &str) -> Result<Block, Box<dyn Error>> {
    reg.make_block_by_name(name)
        .ok_or_else(|| format!("block `{name}` missing from registry").into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let reg = Arc::new(BlockRegistry::load_from_path(&args.blocks)?);
    let mut settings = match &args.lighting {
        Some(path) => LightingSettings::load_from_path(path)?,
        None => LightingSettings::default(),
    };
    if let Some(r) = args.radius {
        settings.lookup_radius = r;
    }
    settings.validate()?;

    let stone = block_named(&reg, "stone")?;
    let torch = block_named(&reg, "torch")?;
    let crystal = block_named(&reg, "crystal")?;

    let world = Arc::new(
        GridWorld::new(
            Arc::clone(&reg),
            Generator::Noise {
                seed: args.seed,
                base_y: 4,
                amplitude: 6.0,
                frequency: 0.04,
                block: stone,
            },
        )
        .with_bottom_y(-3 * CHUNK_SIZE_I32),
    );
    let width = args.width.max(1);
    world.load_area(ChunkCoord::new(0, -3), ChunkCoord::new(width - 1, 0));

    let workers = if args.workers == 0 {
        std::thread::available_parallelism().map_or(4, |n| n.get())
    } else {
        args.workers
    };
    let view: Arc<dyn WorldView> = world.clone();
    let engine = LightEngine::new(view, settings, workers)?;
    let observer = Arc::new(ChannelObserver::new(false));
    engine.add_observer(observer.clone());

    let t0 = Instant::now();
    let mut coords = world.loaded_chunks();
    coords.sort_by_key(|c| (-c.cy, c.cx));
    for coord in coords {
        engine.chunk_loaded(coord);
    }
    engine.wait_idle();
    log::info!(target: "perf", "ms={} initial_light chunks={}", t0.elapsed().as_millis(), engine.loaded_chunks().len());

    let t1 = Instant::now();
    let span = width * CHUNK_SIZE_I32;
    for x in 3..span - 3 {
        for y in -14..=-9 {
            let old = world.set_block(x, y, Block::AIR);
            engine.block_changed(x, y, old, Block::AIR, false);
        }
    }
    // a shaft up to the surface near the left end
    for y in -8..=12 {
        let old = world.set_block(5, y, Block::AIR);
        engine.block_changed(5, y, old, Block::AIR, false);
    }
    for (i, x) in (12..span - 3).step_by(11).enumerate() {
        let b = if i % 3 == 2 { crystal } else { torch };
        let old = world.set_block(x, -14, b);
        engine.block_changed(x, -14, old, b, true);
    }
    engine.wait_idle();
    log::info!(target: "perf", "ms={} edits_settled", t1.elapsed().as_millis());

    let mut stale: HashMap<ChunkCoord, usize> = HashMap::new();
    for ev in observer.drain_events() {
        if let LightEvent::ChunkStale { coord, .. } = ev {
            *stale.entry(coord).or_insert(0) += 1;
        }
    }

    for y in (-20..=14).rev() {
        let mut row = String::with_capacity(span as usize + 8);
        row.push_str(&format!("{y:>4} "));
        for x in 0..span {
            let emits = world
                .material_at(x, y, false)
                .is_some_and(|ty| ty.emits_light);
            let ch = match engine.cell_snapshot(x, y) {
                _ if emits => 'o',
                Some(cell) if cell.is_skylight => ' ',
                Some(cell) => {
                    let i = (cell.average * (SHADES.len() - 1) as f32).round() as usize;
                    SHADES[(SHADES.len() - 1) - i.min(SHADES.len() - 1)] as char
                }
                None => '?',
            };
            row.push(ch);
        }
        println!("{row}");
    }

    let s = engine.stats();
    println!(
        "full jobs: started={} published={} superseded={} unloaded={}",
        s.full_started, s.full_published, s.full_superseded, s.full_unloaded
    );
    println!(
        "partial runs={} cells changed={} chunks invalidated={}",
        s.partial_runs,
        s.cells_changed,
        stale.len()
    );
    Ok(())
}
