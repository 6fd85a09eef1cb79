use serde::Deserialize;

use crate::types::{BlockId, LightColor};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

// Every field but the name is optional; defaults are resolved by the registry.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<BlockId>,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub blocks_light: Option<bool>,
    #[serde(default)]
    pub light_opacity: Option<f32>,
    #[serde(default)]
    pub emits_light: Option<bool>,
    #[serde(default)]
    pub light_color: Option<LightColor>,
}
