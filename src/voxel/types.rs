use crate::config::ConfigError;
use crate::constants::DEFAULT_GRAY;
use serde::{Deserialize, Serialize};

/// Index into the block catalog. Air is the absence of a voxel, not an id.
pub type BlockId = u8;

/// Immutable catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockType {
    pub name: String,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub top_texture: Option<String>,
    #[serde(default)]
    pub bottom_texture: Option<String>,
    #[serde(default)]
    pub color: Option<u32>,
}

impl BlockType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transparent: false,
            texture: None,
            top_texture: None,
            bottom_texture: None,
            color: None,
        }
    }

    pub fn with_texture(mut self, texture: &str) -> Self {
        self.texture = Some(texture.to_string());
        self
    }

    pub fn with_top(mut self, texture: &str) -> Self {
        self.top_texture = Some(texture.to_string());
        self
    }

    pub fn with_bottom(mut self, texture: &str) -> Self {
        self.bottom_texture = Some(texture.to_string());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    /// Types with a top or bottom override are split into top/bottom/side groups.
    pub fn has_face_overrides(&self) -> bool {
        self.top_texture.is_some() || self.bottom_texture.is_some()
    }

    pub fn face_classes(&self) -> &'static [FaceClass] {
        if self.has_face_overrides() {
            &[FaceClass::Top, FaceClass::Bottom, FaceClass::Side]
        } else {
            &[FaceClass::All]
        }
    }

    /// Material for a face class: override, then base texture, then flat color, then gray.
    pub fn material(&self, class: FaceClass) -> Material {
        let override_texture = match class {
            FaceClass::Top => self.top_texture.as_ref(),
            FaceClass::Bottom => self.bottom_texture.as_ref(),
            FaceClass::Side | FaceClass::All => None,
        };
        if let Some(texture) = override_texture.or(self.texture.as_ref()) {
            Material::Texture(texture.clone())
        } else if let Some(color) = self.color {
            Material::Color(color)
        } else {
            Material::Default
        }
    }
}

/// Which faces of a voxel share one material.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub enum FaceClass {
    All,
    Top,
    Bottom,
    Side,
}

impl FaceClass {
    pub fn accepts(self, face: FaceClass) -> bool {
        self == FaceClass::All || self == face
    }
}

/// Material binding handed to the renderer with each draw group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Material {
    Texture(String),
    Color(u32),
    Default,
}

impl Material {
    /// Flat color the renderer should use when no texture is bound.
    pub fn fallback_color(&self) -> u32 {
        match self {
            Material::Color(c) => *c,
            _ => DEFAULT_GRAY,
        }
    }
}

const TEXTURE_ROOT: &str = "textures/block";

fn texture(name: &str) -> String {
    format!("{TEXTURE_ROOT}/{name}.png")
}

/// Ordered, read-only list of block types; id = index.
#[derive(Clone, Debug)]
pub struct BlockCatalog {
    types: Vec<BlockType>,
}

impl BlockCatalog {
    pub fn new(types: Vec<BlockType>) -> Self {
        Self { types }
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.types.get(id as usize)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        (id as usize) < self.types.len()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Name lookup is for startup wiring only.
    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .and_then(|i| BlockId::try_from(i).ok())
    }

    pub fn face_classes(&self, id: BlockId) -> &'static [FaceClass] {
        match self.get(id) {
            Some(block) => block.face_classes(),
            None => &[FaceClass::All],
        }
    }

    pub fn material(&self, id: BlockId, class: FaceClass) -> Material {
        self.get(id)
            .map(|block| block.material(class))
            .unwrap_or(Material::Default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockType)> {
        self.types.iter().enumerate().map(|(i, t)| (i as BlockId, t))
    }
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::new(vec![
            BlockType::new("null").with_color(0x000000),
            BlockType::new("dirt").with_texture(&texture("dirt")).with_color(0x8B4513),
            BlockType::new("stone").with_texture(&texture("stone")).with_color(0x808080),
            BlockType::new("oak_planks")
                .with_texture(&texture("oak_planks"))
                .with_color(0xDEB887),
            BlockType::new("oak_log")
                .with_texture(&texture("oak_log"))
                .with_top(&texture("oak_log_top"))
                .with_bottom(&texture("oak_log_top"))
                .with_color(0x8B4513),
            BlockType::new("grass")
                .with_texture(&texture("grass_block_side"))
                .with_top(&texture("grass_block_top"))
                .with_bottom(&texture("dirt"))
                .with_color(0x8B4513),
            BlockType::new("oak_leaves")
                .with_texture(&texture("oak_leaves"))
                .with_color(0x3A7D22)
                .transparent(),
        ])
    }
}

/// Block ids the terrain generator places, resolved once at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TerrainPalette {
    pub grass: BlockId,
    pub dirt: BlockId,
    pub stone: BlockId,
    pub log: BlockId,
    pub leaves: BlockId,
}

impl TerrainPalette {
    /// Looks up every terrain block by name. A catalog missing any of them
    /// cannot back the noise generator.
    pub fn resolve(catalog: &BlockCatalog) -> Result<Self, ConfigError> {
        let pick = |name: &str| {
            catalog.id_of(name).ok_or_else(|| {
                ConfigError::Invalid(format!("block catalog has no '{name}' type for terrain generation"))
            })
        };
        Ok(Self {
            grass: pick("grass")?,
            dirt: pick("dirt")?,
            stone: pick("stone")?,
            log: pick("oak_log")?,
            leaves: pick("oak_leaves")?,
        })
    }
}

/// Ids of the built-in catalog.
impl Default for TerrainPalette {
    fn default() -> Self {
        Self {
            grass: 5,
            dirt: 1,
            stone: 2,
            log: 4,
            leaves: 6,
        }
    }
}
