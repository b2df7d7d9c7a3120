//! The forage field outside the hive
//!
//! Flowers appear at a fixed interval in a band near the ground and wither
//! after a while unless a forager has claimed them. A claimed flower stays
//! until its forager either consumes it or lets it go.

use serde::{Deserialize, Serialize};

use crate::core::config::FieldConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, SourceId, Vec2};
use crate::hive::claim::{Claim, Claimant};

/// Flowers spawn between these distances above the bottom edge
const SPAWN_BAND_TOP: f32 = 120.0;
const SPAWN_BAND_BOTTOM: f32 = 20.0;
/// Flowers spawn left of this fraction of the width
const SPAWN_MAX_X: f32 = 0.9;

/// A flower foragers can collect nectar and water from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowerSource {
    pub id: SourceId,
    pub position: Vec2,
    age_ms: f32,
    claimed_by: Option<AgentId>,
}

impl FlowerSource {
    pub fn age_ms(&self) -> f32 {
        self.age_ms
    }

    pub fn claimed_by(&self) -> Option<AgentId> {
        self.claimed_by
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}

/// What changed in the field during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldChange {
    Spawned { source: SourceId, position: Vec2 },
    Expired { source: SourceId },
}

#[derive(Debug, Clone)]
pub struct Field {
    width: f32,
    height: f32,
    base: Vec2,
    sources: Vec<FlowerSource>,
    since_spawn_ms: f32,
    next_id: u32,
}

impl Field {
    pub fn new(config: &FieldConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            base: Vec2::new(config.base_x, config.height - config.base_height),
            sources: Vec::new(),
            since_spawn_ms: 0.0,
            next_id: 0,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Hive entrance
    pub fn base(&self) -> Vec2 {
        self.base
    }

    pub fn sources(&self) -> &[FlowerSource] {
        &self.sources
    }

    pub fn source(&self, id: SourceId) -> Option<&FlowerSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Keep a point inside the field
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.width),
            position.y.clamp(0.0, self.height),
        )
    }

    /// Age flowers, wither unclaimed ones and spawn new ones on schedule
    pub fn tick(
        &mut self,
        dt_ms: f32,
        config: &FieldConfig,
        random: &mut dyn RandomSource,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        for source in &mut self.sources {
            source.age_ms += dt_ms;
        }
        self.sources.retain(|source| {
            let withered = !source.is_claimed() && source.age_ms >= config.flower_lifetime_ms;
            if withered {
                changes.push(FieldChange::Expired { source: source.id });
            }
            !withered
        });

        self.since_spawn_ms += dt_ms;
        while config.flower_interval_ms > 0.0 && self.since_spawn_ms >= config.flower_interval_ms {
            self.since_spawn_ms -= config.flower_interval_ms;
            let x = random.between(
                config.flower_min_x as i32,
                (self.width * SPAWN_MAX_X) as i32,
            );
            let y = random.between(
                (self.height - SPAWN_BAND_TOP) as i32,
                (self.height - SPAWN_BAND_BOTTOM) as i32,
            );
            let position = Vec2::new(x as f32, y as f32);
            let source = self.spawn_at(position);
            changes.push(FieldChange::Spawned { source, position });
        }

        changes
    }

    /// Place a flower at an exact position
    pub fn spawn_at(&mut self, position: Vec2) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.push(FlowerSource {
            id,
            position,
            age_ms: 0.0,
            claimed_by: None,
        });
        id
    }

    /// Closest unclaimed flower within `radius` of `position`
    pub fn nearest_unclaimed_within(&self, position: Vec2, radius: f32) -> Option<SourceId> {
        self.sources
            .iter()
            .filter(|s| !s.is_claimed())
            .map(|s| (s.id, s.position.distance(&position)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn try_claim(&mut self, id: SourceId, agent: AgentId) -> Result<Claim<SourceId>> {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ColonyError::SourceNotFound(id))?;
        if source.is_claimed() {
            return Err(ColonyError::SourceBusy(id));
        }
        source.claimed_by = Some(agent);
        Ok(Claim::new(id, Claimant::Agent(agent)))
    }

    /// Let a flower go; it resumes withering normally
    pub fn release(&mut self, claim: Claim<SourceId>) {
        if let Some(source) = self.sources.iter_mut().find(|s| s.id == claim.target()) {
            source.claimed_by = None;
        }
    }

    /// Remove a claimed flower after it has been collected
    pub fn consume(&mut self, claim: Claim<SourceId>) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != claim.target());
        self.sources.len() < before
    }

    /// Player collects an unclaimed flower directly
    pub fn harvest(&mut self, id: SourceId) -> Result<Vec2> {
        let idx = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or(ColonyError::SourceNotFound(id))?;
        if self.sources[idx].is_claimed() {
            return Err(ColonyError::SourceBusy(id));
        }
        Ok(self.sources.remove(idx).position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::{FirstPick, SeededRandom};

    #[test]
    fn test_base_position() {
        let config = FieldConfig::default();
        let field = Field::new(&config);
        assert_eq!(field.base(), Vec2::new(190.0, 720.0 - 140.0));
    }

    #[test]
    fn test_flowers_spawn_on_interval_inside_band() {
        let config = FieldConfig::default();
        let mut field = Field::new(&config);
        let mut random = SeededRandom::new(11);

        assert!(field.tick(4999.0, &config, &mut random).is_empty());
        let changes = field.tick(1.0, &config, &mut random);
        assert_eq!(changes.len(), 1);

        let source = &field.sources()[0];
        assert!(source.position.x >= config.flower_min_x);
        assert!(source.position.x <= config.width * 0.9);
        assert!(source.position.y >= config.height - 120.0);
        assert!(source.position.y <= config.height - 20.0);
    }

    #[test]
    fn test_unclaimed_flowers_wither() {
        let config = FieldConfig::default();
        let mut field = Field::new(&config);
        let id = field.spawn_at(Vec2::new(500.0, 650.0));

        let changes = field.tick(config.flower_lifetime_ms, &config, &mut FirstPick);
        assert!(changes.contains(&FieldChange::Expired { source: id }));
        assert!(field.source(id).is_none());
    }

    #[test]
    fn test_claimed_flowers_do_not_wither() {
        let config = FieldConfig::default();
        let mut field = Field::new(&config);
        let id = field.spawn_at(Vec2::new(500.0, 650.0));
        let claim = field.try_claim(id, AgentId(1)).unwrap();

        field.tick(config.flower_lifetime_ms * 2.0, &config, &mut FirstPick);
        assert!(field.source(id).is_some());

        field.release(claim);
        field.tick(1.0, &config, &mut FirstPick);
        assert!(field.source(id).is_none(), "withers once released");
    }

    #[test]
    fn test_claims_are_exclusive() {
        let config = FieldConfig::default();
        let mut field = Field::new(&config);
        let id = field.spawn_at(Vec2::new(500.0, 650.0));

        let claim = field.try_claim(id, AgentId(1)).unwrap();
        assert_eq!(field.try_claim(id, AgentId(2)), Err(ColonyError::SourceBusy(id)));
        assert_eq!(field.harvest(id), Err(ColonyError::SourceBusy(id)));
        assert_eq!(field.nearest_unclaimed_within(Vec2::new(500.0, 650.0), 50.0), None);

        assert!(field.consume(claim));
        assert!(field.sources().is_empty());
    }

    #[test]
    fn test_nearest_unclaimed_within_radius() {
        let config = FieldConfig::default();
        let mut field = Field::new(&config);
        let far = field.spawn_at(Vec2::new(540.0, 650.0));
        let near = field.spawn_at(Vec2::new(510.0, 650.0));
        let _out_of_range = field.spawn_at(Vec2::new(900.0, 650.0));

        let here = Vec2::new(500.0, 650.0);
        assert_eq!(field.nearest_unclaimed_within(here, 50.0), Some(near));
        let _claim = field.try_claim(near, AgentId(0)).unwrap();
        assert_eq!(field.nearest_unclaimed_within(here, 50.0), Some(far));
    }
}
