use lumen_geom::Vec2;
use lumen_world::WorldView;

use crate::light_map::RES;

const RES_I32: i32 = RES as i32;

/// Attenuation along straight rays through the block grid.
///
/// Rays are marched over a subgrid `RES` times finer than the blocks. Each
/// traversed subcell scales the ray by `1 - opacity * normalizer`, where the
/// normalizer (euclidean over manhattan length of the ray) keeps diagonal
/// rays, which cross more cells per unit length, from darkening faster than
/// axis-aligned ones. An axis-aligned ray through a fully opaque block is
/// stopped outright, while a diagonal one keeps a small remainder.
pub struct RayOcclusion<'a> {
    world: &'a dyn WorldView,
}

impl<'a> RayOcclusion<'a> {
    pub fn new(world: &'a dyn WorldView) -> Self {
        Self { world }
    }

    #[inline]
    fn opacity(&self, bx: i32, by: i32) -> f32 {
        self.world
            .material_at(bx, by, false)
            .map_or(0.0, |ty| ty.light_opacity)
    }

    /// Fraction of light from `src` reaching `dst`, both in world block units.
    ///
    /// The blocks containing `src` and `dst` never occlude their own ray.
    pub fn compute_attenuation(&self, src: Vec2, dst: Vec2) -> f32 {
        let a = src * RES as f32;
        let b = dst * RES as f32;
        let (mut cx, mut cy) = a.floor_i32();
        let end = b.floor_i32();
        if (cx, cy) == end {
            return 1.0;
        }
        let src_block = (cx.div_euclid(RES_I32), cy.div_euclid(RES_I32));
        let dst_block = (end.0.div_euclid(RES_I32), end.1.div_euclid(RES_I32));

        let d = b - a;
        let manhattan = d.manhattan();
        let normalizer = if manhattan > 0.0 { d.length() / manhattan } else { 1.0 };

        let step_x = if d.x > 0.0 { 1 } else { -1 };
        let step_y = if d.y > 0.0 { 1 } else { -1 };
        let t_delta_x = if d.x != 0.0 { 1.0 / d.x.abs() } else { f32::INFINITY };
        let t_delta_y = if d.y != 0.0 { 1.0 / d.y.abs() } else { f32::INFINITY };
        let mut t_max_x = if d.x > 0.0 {
            (cx as f32 + 1.0 - a.x) * t_delta_x
        } else if d.x < 0.0 {
            (a.x - cx as f32) * t_delta_x
        } else {
            f32::INFINITY
        };
        let mut t_max_y = if d.y > 0.0 {
            (cy as f32 + 1.0 - a.y) * t_delta_y
        } else if d.y < 0.0 {
            (a.y - cy as f32) * t_delta_y
        } else {
            f32::INFINITY
        };

        let steps = (end.0 - cx).abs() + (end.1 - cy).abs();
        let mut attenuation = 1.0_f32;
        let mut cached: Option<((i32, i32), f32)> = None;
        for _ in 0..steps {
            if t_max_x < t_max_y {
                cx += step_x;
                t_max_x += t_delta_x;
            } else {
                cy += step_y;
                t_max_y += t_delta_y;
            }
            if (cx, cy) == end {
                break;
            }
            let block = (cx.div_euclid(RES_I32), cy.div_euclid(RES_I32));
            if block == src_block || block == dst_block {
                continue;
            }
            let opacity = match cached {
                Some((k, o)) if k == block => o,
                _ => {
                    let o = self.opacity(block.0, block.1);
                    cached = Some((block, o));
                    o
                }
            };
            if opacity <= 0.0 {
                continue;
            }
            attenuation *= 1.0 - opacity * normalizer;
            if attenuation <= 0.0 {
                return 0.0;
            }
        }
        attenuation
    }
}
