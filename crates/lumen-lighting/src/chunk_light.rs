use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lumen_world::{CHUNK_SIZE, ChunkCoord};
use rayon::prelude::*;

use crate::cell::{CellState, LightCell, LightContext, compute_cell, evaluate_cell, initial_state};

/// Result of trying to publish a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Local coordinates of the cells whose visible state changed.
    Published { changed: Vec<(usize, usize)> },
    /// A newer full recompute started before this one could publish.
    Superseded,
    /// The chunk was unloaded while the job ran.
    Unloaded,
}

/// Full-chunk results computed under one generation, not yet visible. Holds
/// the computed state of every cell, indexed like the cell arena.
#[derive(Debug)]
pub struct StagedRecalc {
    pub generation: u64,
    pub states: Vec<CellState>,
}

/// Light cells of one chunk plus the generation counter that orders full
/// recomputes.
pub struct ChunkLight {
    pub coord: ChunkCoord,
    cells: Box<[LightCell]>,
    generation: AtomicU64,
    valid: AtomicBool,
    publish: Mutex<()>,
}

impl ChunkLight {
    pub fn new(coord: ChunkCoord) -> Self {
        let cells = (0..CHUNK_SIZE * CHUNK_SIZE).map(|_| LightCell::new()).collect();
        Self {
            coord,
            cells,
            generation: AtomicU64::new(0),
            valid: AtomicBool::new(true),
            publish: Mutex::new(()),
        }
    }

    #[inline]
    pub fn idx(lx: usize, ly: usize) -> usize {
        assert!(
            lx < CHUNK_SIZE && ly < CHUNK_SIZE,
            "local coordinate ({lx}, {ly}) outside chunk"
        );
        lx * CHUNK_SIZE + ly
    }

    #[inline]
    fn world_of(&self, i: usize) -> (i32, i32) {
        self.coord.to_world(i / CHUNK_SIZE, i % CHUNK_SIZE)
    }

    #[inline]
    pub fn cell(&self, lx: usize, ly: usize) -> &LightCell {
        &self.cells[Self::idx(lx, ly)]
    }

    pub fn cells(&self) -> &[LightCell] {
        &self.cells
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Marks the chunk unloaded; pending publishes are dropped from now on.
    pub fn invalidate(&self) {
        let _g = self.publish.lock().unwrap();
        self.valid.store(false, Ordering::Release);
    }

    /// Starts a new full recompute, superseding any running one.
    pub fn begin_full(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    fn is_current(&self, generation: u64) -> bool {
        self.is_valid() && self.generation() == generation
    }

    /// Seeds every cell from the column state.
    pub fn init_from_columns(&self, ctx: &LightContext<'_>) {
        for (i, cell) in self.cells.iter().enumerate() {
            let (wx, wy) = self.world_of(i);
            cell.publish(initial_state(ctx.columns, wx, wy));
        }
    }

    /// Computes every cell under `generation`. Returns `None` as soon as a
    /// newer generation or an unload is observed.
    pub fn compute_full(&self, ctx: &LightContext<'_>, generation: u64) -> Option<StagedRecalc> {
        let states: Option<Vec<CellState>> = (0..self.cells.len())
            .into_par_iter()
            .map(|i| {
                if !self.is_current(generation) {
                    return None;
                }
                let (wx, wy) = self.world_of(i);
                Some(evaluate_cell(ctx, wx, wy))
            })
            .collect();
        Some(StagedRecalc {
            generation,
            states: states?,
        })
    }

    /// Makes staged results visible if their generation is still current.
    ///
    /// Each cell is compared against what is published now, not against what
    /// the job saw while computing, so a partial publish that raced the
    /// computation is overwritten.
    pub fn publish_full(&self, staged: StagedRecalc) -> JobOutcome {
        let _g = self.publish.lock().unwrap();
        if !self.is_valid() {
            return JobOutcome::Unloaded;
        }
        if self.generation() != staged.generation {
            return JobOutcome::Superseded;
        }
        let mut changed = Vec::new();
        for (i, state) in staged.states.into_iter().enumerate() {
            let cell = &self.cells[i];
            if state.same_as(&cell.snapshot()) {
                continue;
            }
            cell.publish(state);
            changed.push((i / CHUNK_SIZE, i % CHUNK_SIZE));
        }
        JobOutcome::Published { changed }
    }

    /// Full recompute in one call: compute then publish.
    pub fn recalc_full(&self, ctx: &LightContext<'_>, generation: u64) -> JobOutcome {
        match self.compute_full(ctx, generation) {
            Some(staged) => self.publish_full(staged),
            None if !self.is_valid() => JobOutcome::Unloaded,
            None => JobOutcome::Superseded,
        }
    }

    /// Recomputes the cells accepted by `filter` and publishes each one
    /// directly. Never superseded by a full recompute; only an unload stops it.
    pub fn recalc_partial(
        &self,
        ctx: &LightContext<'_>,
        filter: impl Fn(i32, i32) -> bool + Sync,
    ) -> JobOutcome {
        let changed: Vec<(usize, usize)> = (0..self.cells.len())
            .into_par_iter()
            .filter(|&i| {
                let (wx, wy) = self.world_of(i);
                filter(wx, wy)
            })
            .filter_map(|i| {
                if !self.is_valid() {
                    return None;
                }
                let (wx, wy) = self.world_of(i);
                let prev = self.cells[i].snapshot();
                let next = compute_cell(ctx, wx, wy, &prev)?;
                let _g = self.publish.lock().unwrap();
                if !self.is_valid() {
                    return None;
                }
                self.cells[i].publish(next);
                Some((i / CHUNK_SIZE, i % CHUNK_SIZE))
            })
            .collect();
        if self.is_valid() {
            JobOutcome::Published { changed }
        } else {
            JobOutcome::Unloaded
        }
    }

    /// True when every cell is currently skylit.
    pub fn is_all_sky(&self) -> bool {
        self.cells.iter().all(|c| c.is_skylight())
    }
}
