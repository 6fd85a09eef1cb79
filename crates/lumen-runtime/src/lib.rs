//! Light recalculation scheduling on a worker pool.
#![forbid(unsafe_code)]

mod inflight;
pub mod observer;

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use hashbrown::HashMap;
use lumen_blocks::Block;
use lumen_lighting::cell::CellState;
use lumen_lighting::{ChunkLight, JobOutcome, LightContext, LightingSettings};
use lumen_world::{ChunkCoord, ColumnMap, TopBlockFlags, WorldView, chunk_of, local_of};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::inflight::InflightTracker;
pub use crate::observer::{ChannelObserver, LightEvent, LightObserver};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub full_started: u64,
    pub full_published: u64,
    pub full_superseded: u64,
    pub full_unloaded: u64,
    pub partial_runs: u64,
    pub cells_changed: u64,
}

#[derive(Default)]
struct Counters {
    full_started: AtomicU64,
    full_published: AtomicU64,
    full_superseded: AtomicU64,
    full_unloaded: AtomicU64,
    partial_runs: AtomicU64,
    cells_changed: AtomicU64,
}

struct Shared {
    world: Arc<dyn WorldView>,
    columns: ColumnMap,
    chunks: RwLock<HashMap<ChunkCoord, Arc<ChunkLight>>>,
    settings: RwLock<Arc<LightingSettings>>,
    observers: RwLock<Vec<Arc<dyn LightObserver>>>,
    inflight: Arc<InflightTracker>,
    counters: Counters,
}

impl Shared {
    fn settings(&self) -> Arc<LightingSettings> {
        Arc::clone(&self.settings.read().unwrap())
    }

    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<ChunkLight>> {
        self.chunks.read().unwrap().get(&coord).cloned()
    }

    fn notify(&self, coord: ChunkCoord, changed: &[(usize, usize)], prioritized: bool) {
        if changed.is_empty() {
            return;
        }
        self.counters
            .cells_changed
            .fetch_add(changed.len() as u64, Ordering::Relaxed);
        for obs in self.observers.read().unwrap().iter() {
            if obs.wants_cell_events() {
                for &(lx, ly) in changed {
                    obs.cell_changed(coord, lx, ly);
                }
            }
            obs.chunk_stale(coord, prioritized);
        }
    }

    fn run_full(&self, chunk: &ChunkLight, generation: u64, prioritized: bool) {
        let t0 = Instant::now();
        let settings = self.settings();
        let ctx = LightContext {
            world: self.world.as_ref(),
            columns: &self.columns,
            settings: &settings,
        };
        let coord = chunk.coord;
        match chunk.recalc_full(&ctx, generation) {
            JobOutcome::Published { changed } => {
                self.counters.full_published.fetch_add(1, Ordering::Relaxed);
                log::info!(
                    target: "perf",
                    "ms={} light_full chunk=({}, {}) gen={} changed={}",
                    t0.elapsed().as_millis(),
                    coord.cx,
                    coord.cy,
                    generation,
                    changed.len()
                );
                self.notify(coord, &changed, prioritized);
            }
            JobOutcome::Superseded => {
                self.counters.full_superseded.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "light_full chunk=({}, {}) gen={} superseded by gen={}",
                    coord.cx,
                    coord.cy,
                    generation,
                    chunk.generation()
                );
            }
            JobOutcome::Unloaded => {
                self.counters.full_unloaded.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "light_full chunk=({}, {}) gen={} discarded: chunk unloaded",
                    coord.cx,
                    coord.cy,
                    generation
                );
            }
        }
    }

    fn run_partial(&self, chunk: &ChunkLight, center: (i32, i32), radius: i32, prioritized: bool) {
        let settings = self.settings();
        let ctx = LightContext {
            world: self.world.as_ref(),
            columns: &self.columns,
            settings: &settings,
        };
        let r2 = i64::from(radius) * i64::from(radius);
        let outcome = chunk.recalc_partial(&ctx, |wx, wy| {
            let dx = i64::from(wx - center.0);
            let dy = i64::from(wy - center.1);
            dx * dx + dy * dy <= r2
        });
        self.counters.partial_runs.fetch_add(1, Ordering::Relaxed);
        match outcome {
            JobOutcome::Published { changed } => {
                log::debug!(
                    "light_partial chunk=({}, {}) around ({}, {}) changed={}",
                    chunk.coord.cx,
                    chunk.coord.cy,
                    center.0,
                    center.1,
                    changed.len()
                );
                self.notify(chunk.coord, &changed, prioritized);
            }
            JobOutcome::Superseded | JobOutcome::Unloaded => log::warn!(
                "light_partial chunk=({}, {}) discarded: chunk unloaded",
                chunk.coord.cx,
                chunk.coord.cy
            ),
        }
    }
}

/// Schedules light recomputation in reaction to chunk lifecycle and block
/// edits.
///
/// Full-chunk jobs are ordered by a per-chunk generation: starting a new one
/// makes any running one discard its results at publish time. Partial jobs
/// triggered by light-relevant edits in neighboring chunks are never
/// superseded.
pub struct LightEngine {
    shared: Arc<Shared>,
    pool: Arc<ThreadPool>,
}

impl LightEngine {
    pub fn new(
        world: Arc<dyn WorldView>,
        settings: LightingSettings,
        workers: usize,
    ) -> Result<Self, Box<dyn Error>> {
        settings.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("lumen-light-{i}"))
            .build()?;
        Ok(Self {
            shared: Arc::new(Shared {
                world,
                columns: ColumnMap::new(),
                chunks: RwLock::new(HashMap::new()),
                settings: RwLock::new(Arc::new(settings)),
                observers: RwLock::new(Vec::new()),
                inflight: Arc::new(InflightTracker::default()),
                counters: Counters::default(),
            }),
            pool: Arc::new(pool),
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn LightObserver>) {
        self.shared.observers.write().unwrap().push(observer);
    }

    pub fn settings(&self) -> Arc<LightingSettings> {
        self.shared.settings()
    }

    /// Replaces the settings and recomputes every loaded chunk with them.
    /// Jobs already running keep the settings they started with.
    pub fn set_settings(&self, settings: LightingSettings) -> Result<(), Box<dyn Error>> {
        settings.validate()?;
        *self.shared.settings.write().unwrap() = Arc::new(settings);
        for coord in self.loaded_chunks() {
            self.request_full_recalc(coord, false);
        }
        Ok(())
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.shared.columns
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut v: Vec<ChunkCoord> = self.shared.chunks.read().unwrap().keys().copied().collect();
        v.sort();
        v
    }

    pub fn chunk_light(&self, coord: ChunkCoord) -> Option<Arc<ChunkLight>> {
        self.shared.chunk(coord)
    }

    /// A chunk finished loading: track it, seed its cells from column state,
    /// and schedule a full recompute for it and any chunk whose column top it
    /// raised.
    pub fn chunk_loaded(&self, coord: ChunkCoord) {
        let world = self.shared.world.as_ref();
        let column = self.shared.columns.get_or_create(coord.cx);
        let changes = column.chunk_loaded(world, coord.cy);

        let chunk = {
            let mut chunks = self.shared.chunks.write().unwrap();
            Arc::clone(
                chunks
                    .entry(coord)
                    .or_insert_with(|| Arc::new(ChunkLight::new(coord))),
            )
        };
        let settings = self.shared.settings();
        let ctx = LightContext {
            world,
            columns: &self.shared.columns,
            settings: &settings,
        };
        chunk.init_from_columns(&ctx);
        log::debug!("chunk ({}, {}) loaded", coord.cx, coord.cy);

        let mut targets = vec![coord];
        for change in &changes {
            targets.extend(change.affected_chunks(world, settings.radius()));
        }
        targets.sort();
        targets.dedup();
        for t in targets {
            self.request_full_recalc(t, false);
        }
    }

    /// Drops the chunk's light state. Any job still running for it discards
    /// its results.
    pub fn chunk_unloaded(&self, coord: ChunkCoord) {
        let removed = self.shared.chunks.write().unwrap().remove(&coord);
        if let Some(chunk) = removed {
            chunk.invalidate();
            log::debug!("chunk ({}, {}) unloaded", coord.cx, coord.cy);
        }
    }

    /// A block at `(wx, wy)` changed from `old` to `new`. `interactive`
    /// marks edits made by a player so renderer invalidation is prioritized.
    pub fn block_changed(&self, wx: i32, wy: i32, old: Block, new: Block, interactive: bool) {
        let world = self.shared.world.as_ref();
        let settings = self.shared.settings();
        let radius = settings.radius();
        let home = ChunkCoord::from_world(wx, wy);

        let mut full = vec![home];
        if let Some(column) = self.shared.columns.get(chunk_of(wx)) {
            if let Some(change) = column.update_top_block(world, local_of(wx), Some(wy)) {
                full.extend(change.affected_chunks(world, radius));
            }
        }
        full.sort();
        full.dedup();
        for &coord in &full {
            self.request_full_recalc(coord, interactive);
        }

        let reg = world.registry();
        let (a, b) = (reg.material(old), reg.material(new));
        let light_relevant = a.emits_light != b.emits_light
            || a.light_color != b.light_color
            || a.light_opacity != b.light_opacity;
        if !light_relevant {
            return;
        }
        for cx in chunk_of(wx - radius)..=chunk_of(wx + radius) {
            for cy in chunk_of(wy - radius)..=chunk_of(wy + radius) {
                let coord = ChunkCoord::new(cx, cy);
                if !full.contains(&coord) {
                    self.request_partial_recalc(coord, (wx, wy), radius, interactive);
                }
            }
        }
    }

    /// Starts a full recompute of `coord`, superseding any running one.
    /// Returns the new generation, or `None` when the chunk is not loaded.
    pub fn request_full_recalc(&self, coord: ChunkCoord, prioritized: bool) -> Option<u64> {
        let chunk = self.shared.chunk(coord)?;
        let generation = chunk.begin_full();
        self.shared
            .counters
            .full_started
            .fetch_add(1, Ordering::Relaxed);
        let guard = self.shared.inflight.start();
        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let _guard = guard;
            shared.run_full(&chunk, generation, prioritized);
        });
        Some(generation)
    }

    /// Recomputes the cells of `coord` within `radius` of `center` without
    /// touching the chunk's generation.
    pub fn request_partial_recalc(
        &self,
        coord: ChunkCoord,
        center: (i32, i32),
        radius: i32,
        prioritized: bool,
    ) -> bool {
        let Some(chunk) = self.shared.chunk(coord) else {
            return false;
        };
        let guard = self.shared.inflight.start();
        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let _guard = guard;
            shared.run_partial(&chunk, center, radius, prioritized);
        });
        true
    }

    /// Blocks until every scheduled job has finished.
    pub fn wait_idle(&self) {
        self.shared.inflight.wait_idle();
    }

    pub fn inflight(&self) -> usize {
        self.shared.inflight.count()
    }

    /// Last published state of block `(wx, wy)`.
    pub fn cell_snapshot(&self, wx: i32, wy: i32) -> Option<Arc<CellState>> {
        let chunk = self.shared.chunk(ChunkCoord::from_world(wx, wy))?;
        Some(chunk.cell(local_of(wx), local_of(wy)).snapshot())
    }

    /// Whether every block of `coord` is above its column top, letting the
    /// renderer skip shading it.
    pub fn is_chunk_all_sky(&self, coord: ChunkCoord) -> Option<bool> {
        let column = self.shared.columns.get(coord.cx)?;
        column
            .is_initialized()
            .then(|| column.is_chunk_above_top_block(coord.cy, TopBlockFlags::BLOCKS_LIGHT))
    }

    /// Top of the light-blocking column at world x, if tracked.
    pub fn top_block_height(&self, wx: i32) -> Option<i32> {
        self.shared.columns.top_at(wx, TopBlockFlags::BLOCKS_LIGHT)
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.shared.counters;
        EngineStats {
            full_started: c.full_started.load(Ordering::Relaxed),
            full_published: c.full_published.load(Ordering::Relaxed),
            full_superseded: c.full_superseded.load(Ordering::Relaxed),
            full_unloaded: c.full_unloaded.load(Ordering::Relaxed),
            partial_runs: c.partial_runs.load(Ordering::Relaxed),
            cells_changed: c.cells_changed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for LightEngine {
    fn drop(&mut self) {
        self.wait_idle();
    }
}
