use crate::light_map::LightMap;
use crate::settings::{IntensityMapping, LightingSettings, ToneMapping};

#[inline]
fn smoothstep(s: f32) -> f32 {
    let s = s.clamp(0.0, 1.0);
    s * s * (3.0 - 2.0 * s)
}

/// Geometric falloff for a source `dist_sq` (squared blocks) away, reaching
/// zero at `max_dist`.
#[inline]
pub fn falloff(mapping: IntensityMapping, dist_sq: f32, max_dist: f32) -> f32 {
    if max_dist <= 0.0 {
        return 0.0;
    }
    match mapping {
        IntensityMapping::Linear => (1.0 - dist_sq.sqrt() / max_dist).clamp(0.0, 1.0),
        IntensityMapping::Smoothstep => smoothstep(1.0 - dist_sq.sqrt() / max_dist),
        // no sqrt on this path
        IntensityMapping::SmoothstepSquared => smoothstep(1.0 - dist_sq / (max_dist * max_dist)),
    }
}

#[inline]
fn luminance(c: [f32; 3]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

/// Applies `op` to one subcell. Inputs are non-negative linear intensities.
pub fn tone_map_rgb(op: ToneMapping, white_point: f32, c: [f32; 3]) -> [f32; 3] {
    match op {
        ToneMapping::None => c,
        ToneMapping::Reinhard => c.map(|v| v / (1.0 + v)),
        ToneMapping::ReinhardExtended => {
            let w2 = white_point * white_point;
            c.map(|v| v * (1.0 + v / w2) / (1.0 + v))
        }
        ToneMapping::ReinhardJodie => {
            let l = luminance(c);
            c.map(|v| {
                let tv = v / (1.0 + v);
                let lv = v / (1.0 + l);
                lv + (tv - lv) * tv
            })
        }
    }
}

/// Tone maps every subcell in place and clamps the result to `[0, 1]`.
pub fn tone_map(map: &mut LightMap, settings: &LightingSettings) {
    let op = settings.tone_mapping;
    let wp = settings.white_point;
    map.map_channels(|c| tone_map_rgb(op, wp, c.map(|v| v.max(0.0))));
    map.clamp_unit();
}
