use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use hashbrown::HashMap;
use lumen_blocks::BlockType;

use crate::{CHUNK_SIZE, CHUNK_SIZE_I32, ChunkCoord, WorldView, chunk_of, local_of};

/// Number of chunks scanned above the last known top before falling back to
/// the downward scan.
pub const TOP_SEARCH_WINDOW_CHUNKS: i32 = CHUNK_SIZE_I32;

const UNSET: i32 = i32::MIN;

/// Selects which material property defines the top of a column.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopBlockFlags(u8);

impl TopBlockFlags {
    pub const SOLID: TopBlockFlags = TopBlockFlags(0b01);
    pub const BLOCKS_LIGHT: TopBlockFlags = TopBlockFlags(0b10);
    pub const ALL: TopBlockFlags = TopBlockFlags(0b11);

    #[inline]
    pub fn contains(self, other: TopBlockFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for TopBlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TopBlockFlags::SOLID => f.write_str("SOLID"),
            TopBlockFlags::BLOCKS_LIGHT => f.write_str("BLOCKS_LIGHT"),
            TopBlockFlags::ALL => f.write_str("ALL"),
            TopBlockFlags(bits) => write!(f, "TopBlockFlags({bits:#b})"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Track {
    Solid,
    Light,
}

impl Track {
    #[inline]
    fn matches(self, ty: &BlockType) -> bool {
        match self {
            Track::Solid => ty.solid,
            Track::Light => ty.blocks_light,
        }
    }
}

/// A column top moved. Heights are world Y; `bottom_y - 1` means the column
/// is open all the way down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopBlockChange {
    pub wx: i32,
    pub old_solid: i32,
    pub new_solid: i32,
    pub old_light: i32,
    pub new_light: i32,
}

impl TopBlockChange {
    #[inline]
    pub fn light_changed(&self) -> bool {
        self.old_light != self.new_light
    }

    /// Loaded chunks whose light state may depend on the moved light top:
    /// this column's chunks between the old and new top (one chunk of slack
    /// each way) and neighboring chunks within `radius` blocks of the exposed
    /// span, since their skylight candidates read this column.
    pub fn affected_chunks<W: WorldView + ?Sized>(&self, world: &W, radius: i32) -> Vec<ChunkCoord> {
        if !self.light_changed() {
            return Vec::new();
        }
        let lo = self.old_light.min(self.new_light);
        let hi = self.old_light.max(self.new_light);
        let own = chunk_of(self.wx);
        let mut out = Vec::new();
        for cy in chunk_of(lo) - 1..=chunk_of(hi) + 1 {
            out.push(ChunkCoord::new(own, cy));
        }
        // Neighbor reach includes the +-1 columns the wall test reads.
        let reach = radius + 1;
        for cx in chunk_of(self.wx - reach)..=chunk_of(self.wx + reach) {
            for cy in chunk_of(lo - radius)..=chunk_of(hi + radius) {
                out.push(ChunkCoord::new(cx, cy));
            }
        }
        out.sort();
        out.dedup();
        out.retain(|c| world.is_chunk_loaded(*c));
        out
    }
}

/// Cached top-block heights for one chunk-x column.
///
/// Each local x owns its own pair of atomic slots and its own update lock, so
/// updates to different x never contend and readers never lock.
pub struct ChunkColumn {
    cx: i32,
    top_solid: [AtomicI32; CHUNK_SIZE],
    top_light: [AtomicI32; CHUNK_SIZE],
    locks: [Mutex<()>; CHUNK_SIZE],
}

impl fmt::Debug for ChunkColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let solid: Vec<i32> = self.top_solid.iter().map(|a| a.load(Ordering::Relaxed)).collect();
        let light: Vec<i32> = self.top_light.iter().map(|a| a.load(Ordering::Relaxed)).collect();
        f.debug_struct("ChunkColumn")
            .field("cx", &self.cx)
            .field("top_solid", &solid)
            .field("top_light", &light)
            .finish()
    }
}

impl ChunkColumn {
    pub fn new(cx: i32) -> Self {
        Self {
            cx,
            top_solid: std::array::from_fn(|_| AtomicI32::new(UNSET)),
            top_light: std::array::from_fn(|_| AtomicI32::new(UNSET)),
            locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    #[inline]
    pub fn cx(&self) -> i32 {
        self.cx
    }

    #[inline]
    fn wx(&self, lx: usize) -> i32 {
        self.cx * CHUNK_SIZE_I32 + lx as i32
    }

    #[inline]
    fn slot(&self, track: Track, lx: usize) -> &AtomicI32 {
        match track {
            Track::Solid => &self.top_solid[lx],
            Track::Light => &self.top_light[lx],
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.top_solid
            .iter()
            .chain(self.top_light.iter())
            .all(|a| a.load(Ordering::Acquire) != UNSET)
    }

    /// World Y of the highest block selected by `flags` at local `lx`.
    ///
    /// Panics if no selected slot has been computed: a loaded column always
    /// has a top, so this is corrupted state.
    pub fn top_block_height(&self, lx: usize, flags: TopBlockFlags) -> i32 {
        match self.try_top_block_height(lx, flags) {
            Some(y) => y,
            None => panic!(
                "column {} x={lx} has no tracked top for {flags:?}",
                self.cx
            ),
        }
    }

    /// Like [`Self::top_block_height`] but `None` for an unset slot.
    #[inline]
    pub fn try_top_block_height(&self, lx: usize, flags: TopBlockFlags) -> Option<i32> {
        assert!(lx < CHUNK_SIZE, "local x {lx} outside column");
        let mut best = UNSET;
        if flags.contains(TopBlockFlags::SOLID) {
            best = best.max(self.top_solid[lx].load(Ordering::Acquire));
        }
        if flags.contains(TopBlockFlags::BLOCKS_LIGHT) {
            best = best.max(self.top_light[lx].load(Ordering::Acquire));
        }
        (best != UNSET).then_some(best)
    }

    #[inline]
    pub fn is_block_above_top_block(&self, lx: usize, wy: i32, flags: TopBlockFlags) -> bool {
        self.top_block_height(lx, flags) < wy
    }

    /// True only when every x of chunk row `cy` lies above its top.
    pub fn is_chunk_above_top_block(&self, cy: i32, flags: TopBlockFlags) -> bool {
        let bottom = cy * CHUNK_SIZE_I32;
        (0..CHUNK_SIZE).all(|lx| self.top_block_height(lx, flags) < bottom)
    }

    /// Computes every slot by scanning down from the top of chunk row `from_cy`.
    pub fn initialize<W: WorldView + ?Sized>(&self, world: &W, from_cy: i32) {
        let start = (from_cy + 1) * CHUNK_SIZE_I32 - 1;
        for lx in 0..CHUNK_SIZE {
            let _g = self.locks[lx].lock().unwrap();
            let wx = self.wx(lx);
            for track in [Track::Solid, Track::Light] {
                let y = scan_down(world, wx, start, world.bottom_y(), track, true);
                self.slot(track, lx).store(y, Ordering::Release);
            }
        }
        log::trace!("column {} initialized from chunk row {from_cy}", self.cx);
    }

    /// Chunk row `cy` just became resident; raise any top it now covers.
    pub fn chunk_loaded<W: WorldView + ?Sized>(&self, world: &W, cy: i32) -> Vec<TopBlockChange> {
        if !self.is_initialized() {
            self.initialize(world, cy);
            return Vec::new();
        }
        let top = (cy + 1) * CHUNK_SIZE_I32 - 1;
        let bottom = cy * CHUNK_SIZE_I32;
        let mut changes = Vec::new();
        for lx in 0..CHUNK_SIZE {
            let _g = self.locks[lx].lock().unwrap();
            let wx = self.wx(lx);
            let mut next = [0; 2];
            let mut prev = [0; 2];
            for (i, track) in [Track::Solid, Track::Light].into_iter().enumerate() {
                let cur = self.slot(track, lx).load(Ordering::Acquire);
                prev[i] = cur;
                next[i] = cur;
                if cur < top {
                    let floor = bottom.max(cur + 1);
                    let hit = scan_down(world, wx, top, floor, track, false);
                    if hit >= floor {
                        self.slot(track, lx).store(hit, Ordering::Release);
                        next[i] = hit;
                    }
                }
            }
            if prev != next {
                changes.push(TopBlockChange {
                    wx,
                    old_solid: prev[0],
                    new_solid: next[0],
                    old_light: prev[1],
                    new_light: next[1],
                });
            }
        }
        changes
    }

    /// Re-evaluates the top at `lx` after the block at `hint` (if any) changed.
    ///
    /// A hint above the current top that satisfies the predicate is taken
    /// directly. Otherwise, when the current top no longer qualifies or lies
    /// below the hint, the column is searched: first a window of chunks above
    /// the last known top chunk, then downward chunk by chunk to the world
    /// bottom.
    pub fn update_top_block<W: WorldView + ?Sized>(
        &self,
        world: &W,
        lx: usize,
        hint: Option<i32>,
    ) -> Option<TopBlockChange> {
        assert!(lx < CHUNK_SIZE, "local x {lx} outside column");
        let _g = self.locks[lx].lock().unwrap();
        let wx = self.wx(lx);
        let old_solid = self.slot(Track::Solid, lx).load(Ordering::Acquire);
        let old_light = self.slot(Track::Light, lx).load(Ordering::Acquire);
        let new_solid = self.find_top(world, wx, old_solid, hint, Track::Solid);
        let new_light = self.find_top(world, wx, old_light, hint, Track::Light);
        self.slot(Track::Solid, lx).store(new_solid, Ordering::Release);
        self.slot(Track::Light, lx).store(new_light, Ordering::Release);
        if old_solid == new_solid && old_light == new_light {
            return None;
        }
        log::debug!(
            "column top moved at x={wx}: solid {old_solid} -> {new_solid}, light {old_light} -> {new_light}"
        );
        Some(TopBlockChange {
            wx,
            old_solid,
            new_solid,
            old_light,
            new_light,
        })
    }

    fn find_top<W: WorldView + ?Sized>(
        &self,
        world: &W,
        wx: i32,
        current: i32,
        hint: Option<i32>,
        track: Track,
    ) -> i32 {
        let bottom = world.bottom_y();
        if let Some(h) = hint {
            if (current == UNSET || h > current) && satisfies(world, wx, h, track, true) {
                return h;
            }
        }
        let known = current != UNSET;
        let current_ok = known && current >= bottom && satisfies(world, wx, current, track, true);
        let below_hint = hint.is_some_and(|h| !known || current < h);
        if current_ok && !below_hint {
            return current;
        }
        let anchor = if known {
            current.max(bottom)
        } else {
            hint.unwrap_or(bottom).max(bottom)
        };
        let last_cy = chunk_of(anchor);
        let window_top = (last_cy + TOP_SEARCH_WINDOW_CHUNKS + 1) * CHUNK_SIZE_I32 - 1;
        let window_bottom = (last_cy + 1) * CHUNK_SIZE_I32;
        let hit = scan_down(world, wx, window_top, window_bottom, track, false);
        if hit >= window_bottom {
            return hit;
        }
        scan_down(world, wx, window_bottom - 1, bottom, track, true)
    }
}

/// Columns keyed by chunk x.
#[derive(Default)]
pub struct ColumnMap {
    columns: RwLock<HashMap<i32, Arc<ChunkColumn>>>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cx: i32) -> Option<Arc<ChunkColumn>> {
        self.columns.read().unwrap().get(&cx).cloned()
    }

    pub fn get_or_create(&self, cx: i32) -> Arc<ChunkColumn> {
        if let Some(c) = self.get(cx) {
            return c;
        }
        self.columns
            .write()
            .unwrap()
            .entry(cx)
            .or_insert_with(|| Arc::new(ChunkColumn::new(cx)))
            .clone()
    }

    pub fn remove(&self, cx: i32) -> Option<Arc<ChunkColumn>> {
        self.columns.write().unwrap().remove(&cx)
    }

    /// Tracked top at world x, `None` where the column is unknown or unset.
    #[inline]
    pub fn top_at(&self, wx: i32, flags: TopBlockFlags) -> Option<i32> {
        self.get(chunk_of(wx))
            .and_then(|c| c.try_top_block_height(local_of(wx), flags))
    }

    /// Tracked top at world x. Panics when the column is missing or unset.
    pub fn top_block_height(&self, wx: i32, flags: TopBlockFlags) -> i32 {
        match self.get(chunk_of(wx)) {
            Some(c) => c.top_block_height(local_of(wx), flags),
            None => panic!("no column tracked for chunk x {}", chunk_of(wx)),
        }
    }
}

#[inline]
fn satisfies<W: WorldView + ?Sized>(world: &W, wx: i32, wy: i32, track: Track, load: bool) -> bool {
    world
        .material_at(wx, wy, load)
        .is_some_and(|ty| track.matches(ty))
}

/// Highest y in `[floor, from]` whose block matches `track`, walking one
/// chunk at a time; `floor - 1` when nothing matches.
fn scan_down<W: WorldView + ?Sized>(
    world: &W,
    wx: i32,
    from: i32,
    floor: i32,
    track: Track,
    load: bool,
) -> i32 {
    let floor = floor.max(world.bottom_y());
    if from < floor {
        return floor - 1;
    }
    let mut cy = chunk_of(from);
    while cy >= chunk_of(floor) {
        let coord = ChunkCoord::new(chunk_of(wx), cy);
        if load || world.is_chunk_loaded(coord) {
            let hi = from.min((cy + 1) * CHUNK_SIZE_I32 - 1);
            let lo = floor.max(cy * CHUNK_SIZE_I32);
            for wy in (lo..=hi).rev() {
                if satisfies(world, wx, wy, track, load) {
                    return wy;
                }
            }
        }
        cy -= 1;
    }
    floor - 1
}
