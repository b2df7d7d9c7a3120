//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Identifier of a live agent, assigned sequentially by the population registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Identifier of a comb cell (index into the comb)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u32);

/// Identifier of a flower source in the forage field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

/// Resumption token for a travel step.
///
/// Minted per travel request; an arrival carrying any other token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepToken(pub u32);

/// Simulation tick counter
pub type Tick = u64;

/// Agent role, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Worker,
    Forager,
}

/// Resources agents carry and cells store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Nectar,
    Water,
    Honey,
}

/// What a comb cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Nectar,
    Water,
    Honey,
    Brood,
}

impl CellKind {
    /// Stored resource, `None` for brood cells
    pub fn resource(&self) -> Option<Resource> {
        match self {
            CellKind::Nectar => Some(Resource::Nectar),
            CellKind::Water => Some(Resource::Water),
            CellKind::Honey => Some(Resource::Honey),
            CellKind::Brood => None,
        }
    }
}

impl From<Resource> for CellKind {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Nectar => CellKind::Nectar,
            Resource::Water => CellKind::Water,
            Resource::Honey => CellKind::Honey,
        }
    }
}

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}
