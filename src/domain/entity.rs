// Domain-level simulation entities: machines, enemies, projectiles.

use crate::domain::recipe::Recipe;

/// Cell coordinate on the build grid. Machines occupy exactly one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Continuous center of the cell, used for distance checks against enemies.
    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x as f32 + 0.5,
            y: self.y as f32 + 0.5,
        }
    }
}

/// Continuous world position for enemies and projectiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Grid-aligned orientation for belts and inserters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "north" => Some(Self::North),
            "east" => Some(Self::East),
            "south" => Some(Self::South),
            "west" => Some(Self::West),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// The cell one step from `from` in this direction. North is -y.
    pub fn step(self, from: GridPos) -> GridPos {
        match self {
            Self::North => GridPos::new(from.x, from.y - 1),
            Self::East => GridPos::new(from.x + 1, from.y),
            Self::South => GridPos::new(from.x, from.y + 1),
            Self::West => GridPos::new(from.x - 1, from.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    Miner,
    Assembler,
    Belt,
    Inserter,
    Turret,
}

impl MachineKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "miner" => Some(Self::Miner),
            "assembler" => Some(Self::Assembler),
            "belt" => Some(Self::Belt),
            "inserter" => Some(Self::Inserter),
            "turret" => Some(Self::Turret),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Miner => "miner",
            Self::Assembler => "assembler",
            Self::Belt => "belt",
            Self::Inserter => "inserter",
            Self::Turret => "turret",
        }
    }

    /// Power draw in arbitrary grid units. Negative values would mark producers,
    /// but none of the placeable kinds generate power themselves.
    pub fn power_required(&self) -> f32 {
        match self {
            Self::Miner => 5.0,
            Self::Assembler => 10.0,
            Self::Belt => 1.0,
            Self::Inserter => 1.0,
            Self::Turret => 8.0,
        }
    }
}

/// One named stack inside a machine inventory.
///
/// Invariants are maintained by the `inventory` helpers: at most one stack per
/// distinct `name`, and a stack is dropped as soon as its quantity reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub icon: Option<String>,
}

impl ItemStack {
    pub fn new(name: &str, quantity: u32) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            quantity,
            icon: None,
        }
    }
}

/// Power contract for a machine. A machine only runs its behavior while
/// `connected` and `available >= required`; `required < 0` denotes a producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerState {
    pub required: f32,
    pub available: f32,
    pub connected: bool,
}

impl PowerState {
    pub fn satisfied(&self) -> bool {
        self.connected && self.available >= self.required
    }
}

pub struct Machine {
    pub id: u64,
    pub kind: MachineKind,
    pub position: GridPos,
    pub facing: Facing,

    pub health: i32,
    pub max_health: i32,

    pub inventory: Vec<ItemStack>,
    pub power: PowerState,
    pub recipe: Option<Recipe>,

    // Powered ticks accumulated toward the next production event (miner cadence).
    pub progress: u32,
}

impl Machine {
    pub fn new(id: u64, kind: MachineKind, position: GridPos, facing: Facing) -> Self {
        let required = kind.power_required();
        Self {
            id,
            kind,
            position,
            facing,
            health: 100,
            max_health: 100,
            inventory: Vec::new(),
            power: PowerState {
                required,
                // Placed machines start powered; the grid simulation that would
                // adjust `available` lives outside this crate.
                available: required.max(0.0),
                connected: true,
            },
            recipe: match kind {
                MachineKind::Assembler => Some(Recipe::iron_gear()),
                _ => None,
            },
            progress: 0,
        }
    }
}

pub struct Enemy {
    pub id: u64,
    pub position: Vec2,

    pub health: i32,
    pub max_health: i32,

    pub speed: f32,
    pub damage: i32,

    // Remembered seek target; the enemy idles when the machine is gone.
    pub target: Option<u64>,

    // Seconds until the next allowed melee swing.
    pub attack_cooldown: f32,
}

pub struct Projectile {
    pub id: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Machine,
    Enemy,
    Projectile,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Enemy => "enemy",
            Self::Projectile => "projectile",
        }
    }
}
