// Production recipes and the fixed resource table.

/// Item name produced by every miner.
pub const MINER_RESOURCE: &str = "iron-ore";

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeItem {
    pub name: String,
    pub quantity: u32,
}

impl RecipeItem {
    pub fn new(name: &str, quantity: u32) -> Self {
        Self {
            name: name.to_string(),
            quantity,
        }
    }
}

/// An assembler conversion. Inputs are consumed and outputs produced
/// atomically within a single tick; there is no partial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub inputs: Vec<RecipeItem>,
    pub outputs: Vec<RecipeItem>,
}

impl Recipe {
    pub fn iron_gear() -> Self {
        Self {
            name: "iron-gear".to_string(),
            inputs: vec![RecipeItem::new("iron-plate", 2)],
            outputs: vec![RecipeItem::new("iron-gear", 1)],
        }
    }

    pub fn iron_plate() -> Self {
        Self {
            name: "iron-plate".to_string(),
            inputs: vec![RecipeItem::new(MINER_RESOURCE, 1)],
            outputs: vec![RecipeItem::new("iron-plate", 1)],
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "iron-gear" => Some(Self::iron_gear()),
            "iron-plate" => Some(Self::iron_plate()),
            _ => None,
        }
    }
}
