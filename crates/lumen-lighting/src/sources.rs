use hashbrown::HashSet;
use lumen_blocks::LightColor;
use lumen_geom::Vec2;
use lumen_world::{ColumnMap, TopBlockFlags, WorldView};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Emitter,
    Sky,
}

/// A block that lights its surroundings from its center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
    pub x: i32,
    pub y: i32,
    pub color: LightColor,
    pub kind: SourceKind,
}

impl LightSource {
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::block_center(self.x, self.y)
    }
}

#[inline]
fn within(dx: i32, dy: i32, radius: i32) -> bool {
    dx * dx + dy * dy < radius * radius
}

/// Light-emitting blocks strictly within `radius` of `(wx, wy)`. Only
/// resident chunks are consulted.
pub fn luminescent_sources(world: &dyn WorldView, wx: i32, wy: i32, radius: i32) -> Vec<LightSource> {
    let mut out = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if !within(dx, dy, radius) {
                continue;
            }
            let (x, y) = (wx + dx, wy + dy);
            if let Some(ty) = world.material_at(x, y, false) {
                if ty.emits_light {
                    out.push(LightSource {
                        x,
                        y,
                        color: ty.emitted_color(),
                        kind: SourceKind::Emitter,
                    });
                }
            }
        }
    }
    out
}

/// Open-sky blocks visible around `(wx, wy)`.
///
/// For each column within `radius`, a column whose taller neighbor's top
/// stands more than one block above its own exposes a shaft of sky blocks up
/// to that neighbor's top; otherwise only the block just above the column top
/// is a candidate.
pub fn sky_sources(columns: &ColumnMap, wx: i32, wy: i32, radius: i32) -> Vec<LightSource> {
    let top = |x: i32| columns.top_at(x, TopBlockFlags::BLOCKS_LIGHT);
    let mut out = Vec::new();
    for dx in -radius..=radius {
        let x = wx + dx;
        let Some(t) = top(x) else { continue };
        let wall = top(x - 1)
            .unwrap_or(i32::MIN)
            .max(top(x + 1).unwrap_or(i32::MIN));
        let (lo, hi) = if wall > t + 1 {
            ((t + 1).max(wy - radius), wall.min(wy + radius))
        } else {
            (t + 1, t + 1)
        };
        for y in lo..=hi {
            if within(dx, y - wy, radius) {
                out.push(LightSource {
                    x,
                    y,
                    color: LightColor::WHITE,
                    kind: SourceKind::Sky,
                });
            }
        }
    }
    out
}

/// Both candidate sets gathered in parallel, deduplicated by position. An
/// emitter sitting in open sky keeps its own tint.
pub fn gather_sources(
    world: &dyn WorldView,
    columns: &ColumnMap,
    wx: i32,
    wy: i32,
    radius: i32,
) -> Vec<LightSource> {
    let (emitters, sky) = rayon::join(
        || luminescent_sources(world, wx, wy, radius),
        || sky_sources(columns, wx, wy, radius),
    );
    let mut seen: HashSet<(i32, i32)> = HashSet::with_capacity(emitters.len() + sky.len());
    let mut out = Vec::with_capacity(emitters.len() + sky.len());
    for s in emitters.into_iter().chain(sky) {
        if seen.insert((s.x, s.y)) {
            out.push(s);
        }
    }
    out
}
