use std::sync::Arc;

use arc_swap::ArcSwap;
use lumen_geom::Vec2;
use lumen_world::{ColumnMap, TopBlockFlags, WorldView};

use crate::light_map::{LightMap, RES};
use crate::occlusion::RayOcclusion;
use crate::settings::LightingSettings;
use crate::sources::{LightSource, gather_sources};
use crate::tone::{falloff, tone_map};

/// Everything a cell recomputation reads.
#[derive(Clone, Copy)]
pub struct LightContext<'a> {
    pub world: &'a dyn WorldView,
    pub columns: &'a ColumnMap,
    pub settings: &'a LightingSettings,
}

/// Published light state of one block.
#[derive(Clone, Debug)]
pub struct CellState {
    pub is_skylight: bool,
    pub is_lit: bool,
    pub average: f32,
    pub map: Arc<LightMap>,
}

impl CellState {
    pub fn skylight() -> Self {
        Self {
            is_skylight: true,
            is_lit: true,
            average: 1.0,
            map: LightMap::fully_bright(),
        }
    }

    pub fn dark() -> Self {
        Self {
            is_skylight: false,
            is_lit: false,
            average: 0.0,
            map: LightMap::fully_dark(),
        }
    }

    fn full_bright() -> Self {
        Self {
            is_skylight: false,
            ..Self::skylight()
        }
    }

    fn lit(map: LightMap, average: f32) -> Self {
        Self {
            is_skylight: false,
            is_lit: true,
            average,
            map: Arc::new(map),
        }
    }

    /// Same flags and brightness, comparing maps by value.
    pub fn same_as(&self, other: &CellState) -> bool {
        self.is_skylight == other.is_skylight
            && self.is_lit == other.is_lit
            && self.average.to_bits() == other.average.to_bits()
            && (Arc::ptr_eq(&self.map, &other.map) || *self.map == *other.map)
    }
}

/// Light state of one block, replaced wholesale on every publish so readers
/// always see a consistent snapshot without locking.
pub struct LightCell {
    state: ArcSwap<CellState>,
}

impl Default for LightCell {
    fn default() -> Self {
        Self::new()
    }
}

impl LightCell {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(CellState::dark()),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<CellState> {
        self.state.load_full()
    }

    #[inline]
    pub fn publish(&self, state: CellState) {
        self.state.store(Arc::new(state));
    }

    pub fn is_lit(&self) -> bool {
        self.state.load().is_lit
    }

    pub fn is_skylight(&self) -> bool {
        self.state.load().is_skylight
    }

    pub fn average_brightness(&self) -> f32 {
        self.state.load().average
    }

    pub fn light_map(&self) -> Arc<LightMap> {
        Arc::clone(&self.state.load().map)
    }

    /// Recomputes and publishes. Returns whether the visible state changed.
    pub fn recalculate(&self, ctx: &LightContext<'_>, wx: i32, wy: i32) -> bool {
        match compute_cell(ctx, wx, wy, &self.snapshot()) {
            Some(next) => {
                self.publish(next);
                true
            }
            None => false,
        }
    }
}

/// Seed state on chunk load: skylight above the column top, dark below.
pub fn initial_state(columns: &ColumnMap, wx: i32, wy: i32) -> CellState {
    if columns.top_block_height(wx, TopBlockFlags::BLOCKS_LIGHT) < wy {
        CellState::skylight()
    } else {
        CellState::dark()
    }
}

/// Brightness of block `(wx, wy)` before tone mapping, max-merged over
/// `sources`.
pub fn raw_light_map(ctx: &LightContext<'_>, wx: i32, wy: i32, sources: &[LightSource]) -> LightMap {
    let s = ctx.settings;
    let max_dist = s.lookup_radius as f32;
    let rays = RayOcclusion::new(ctx.world);
    let mut map = LightMap::default();
    for src in sources {
        let center = src.center();
        let tint = src.color.channels();
        let comp = if s.tint_compensation {
            src.color.compensation()
        } else {
            1.0
        };
        for sx in 0..RES {
            for sy in 0..RES {
                let (ox, oy) = LightMap::subcell_center(sx, sy);
                let p = Vec2::new(wx as f32 + ox, wy as f32 + oy);
                let base = falloff(s.intensity_mapping, p.distance_sq(center), max_dist);
                if base <= 0.0 {
                    continue;
                }
                let att = if s.occlusion {
                    rays.compute_attenuation(center, p)
                } else {
                    1.0
                };
                if att <= 0.0 {
                    continue;
                }
                let k = base * att * s.intensity_multiplier * comp;
                map.accumulate_max(sx, sy, tint.map(|c| c * k));
            }
        }
    }
    map
}

#[inline]
fn rounds_to_floor(average: f32, floor: f32) -> bool {
    (average * 255.0).round() / 255.0 <= floor
}

/// State block `(wx, wy)` should publish given the current world.
pub fn evaluate_cell(ctx: &LightContext<'_>, wx: i32, wy: i32) -> CellState {
    let s = ctx.settings;
    if !s.enabled {
        return CellState::full_bright();
    }
    if ctx.columns.top_block_height(wx, TopBlockFlags::BLOCKS_LIGHT) < wy {
        return CellState::skylight();
    }
    let sources = gather_sources(ctx.world, ctx.columns, wx, wy, s.radius());
    if sources.is_empty() {
        return CellState::dark();
    }
    let mut map = raw_light_map(ctx, wx, wy, &sources);
    tone_map(&mut map, s);
    let average = map.average().clamp(0.0, 1.0);
    if rounds_to_floor(average, s.darkness_floor) {
        CellState::dark()
    } else {
        CellState::lit(map, average)
    }
}

/// Next state for block `(wx, wy)`, or `None` when it matches `prev`.
pub fn compute_cell(ctx: &LightContext<'_>, wx: i32, wy: i32, prev: &CellState) -> Option<CellState> {
    let next = evaluate_cell(ctx, wx, wy);
    if next.same_as(prev) {
        log::trace!("cell ({wx}, {wy}) unchanged");
        None
    } else {
        Some(next)
    }
}
