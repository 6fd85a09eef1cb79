use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::{BlockDef, BlocksConfig};
use super::types::{Block, BlockId, LightColor};

/// Light-facing surface of one block type.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub solid: bool,
    pub blocks_light: bool,
    /// Fraction of light absorbed per traversed cell, in `[0,1]`.
    pub light_opacity: f32,
    pub emits_light: bool,
    pub light_color: Option<LightColor>,
}

impl BlockType {
    fn air() -> Self {
        BlockType {
            id: 0,
            name: "air".into(),
            solid: false,
            blocks_light: false,
            light_opacity: 0.0,
            emits_light: false,
            light_color: None,
        }
    }

    fn placeholder(id: BlockId) -> Self {
        BlockType {
            id,
            ..BlockType::air()
        }
    }

    fn compile(id: BlockId, def: BlockDef) -> Self {
        let solid = def.solid.unwrap_or(true);
        let blocks_light = def.blocks_light.unwrap_or(solid);
        let default_opacity = if blocks_light { 1.0 } else { 0.0 };
        let light_opacity = def
            .light_opacity
            .unwrap_or(default_opacity)
            .clamp(0.0, 1.0);
        let emits_light = def.emits_light.unwrap_or(def.light_color.is_some());
        BlockType {
            id,
            name: def.name,
            solid,
            blocks_light,
            light_opacity,
            emits_light,
            light_color: def.light_color,
        }
    }

    /// Tint used when this block acts as a light source.
    #[inline]
    pub fn emitted_color(&self) -> LightColor {
        self.light_color.unwrap_or(LightColor::WHITE)
    }
}

#[derive(Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Registry holding only air at id 0.
    pub fn new() -> Self {
        let air = BlockType::air();
        let by_name = HashMap::from([(air.name.clone(), air.id)]);
        Self {
            blocks: vec![air],
            by_name,
        }
    }

    /// Block type for `id`; ids outside the table resolve to air.
    #[inline]
    pub fn get(&self, id: BlockId) -> &BlockType {
        self.blocks.get(id as usize).unwrap_or(&self.blocks[0])
    }

    #[inline]
    pub fn material(&self, b: Block) -> &BlockType {
        self.get(b.id)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn make_block_by_name(&self, name: &str) -> Option<Block> {
        self.id_by_name(name).map(Block::new)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_configs(cfg)
    }

    pub fn load_from_path(blocks_path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(blocks_path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_configs(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        let mut assigned = vec![true];
        for def in cfg.blocks.into_iter() {
            let id = def.id.unwrap_or(reg.blocks.len() as u16);
            if id == 0 {
                if def.name != "air" {
                    return Err(format!("block id 0 is reserved for air, got `{}`", def.name).into());
                }
                continue;
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(format!("duplicate block name `{}`", def.name).into());
            }
            if reg.blocks.len() <= id as usize {
                reg.blocks
                    .resize_with(id as usize + 1, || BlockType::placeholder(0));
                assigned.resize(id as usize + 1, false);
            }
            if assigned[id as usize] {
                return Err(format!("duplicate block id {id} for `{}`", def.name).into());
            }
            let ty = BlockType::compile(id, def);
            reg.by_name.insert(ty.name.clone(), id);
            reg.blocks[id as usize] = ty;
            assigned[id as usize] = true;
        }
        let gaps = assigned.iter().filter(|a| !**a).count();
        if gaps > 0 {
            log::warn!("block registry has {gaps} unassigned id(s); they resolve to air");
            for (i, ok) in assigned.iter().enumerate() {
                if !ok {
                    reg.blocks[i] = BlockType::placeholder(i as BlockId);
                }
            }
        }
        Ok(reg)
    }
}
