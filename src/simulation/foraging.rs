//! Forager behavior: wandering the field, collecting from flowers and
//! bringing the load back to the hive

use tracing::{debug, trace};

use crate::core::config::ColonyConfig;
use crate::core::random::{choose, RandomSource};
use crate::core::types::{CellKind, Resource, SourceId, StepToken, Vec2};
use crate::entity::agent::{Agent, ForagePhase};
use crate::hive::claim::Claimant;
use crate::hive::comb::Comb;
use crate::simulation::tick::ColonyEvent;
use crate::world::field::Field;

/// What a forager can reach
pub struct ForageContext<'a> {
    pub field: &'a mut Field,
    pub comb: &'a mut Comb,
    pub config: &'a ColonyConfig,
    pub random: &'a mut dyn RandomSource,
    pub events: &'a mut Vec<ColonyEvent>,
}

fn take_phase(agent: &mut Agent) -> Option<ForagePhase> {
    agent
        .forager_mut()
        .map(|f| std::mem::replace(&mut f.phase, ForagePhase::AtBase))
}

fn put_phase(agent: &mut Agent, phase: ForagePhase) {
    if let Some(forager) = agent.forager_mut() {
        forager.phase = phase;
    }
}

/// Advance one forager by `dt_ms`
pub fn step_forager(ctx: &mut ForageContext, agent: &mut Agent, dt_ms: f32) {
    let Some(phase) = take_phase(agent) else {
        return;
    };

    let next = match phase {
        ForagePhase::Wandering { turn_in_ms } => wander(ctx, agent, turn_in_ms - dt_ms, dt_ms),
        ForagePhase::Collecting {
            claim,
            remaining_ms,
        } => {
            let remaining_ms = remaining_ms - dt_ms;
            if remaining_ms > 0.0 {
                ForagePhase::Collecting {
                    claim,
                    remaining_ms,
                }
            } else if agent.carried.nectar > 0 {
                let source = claim.target();
                ctx.field.consume(claim);
                ctx.events.push(ColonyEvent::SourceConsumed {
                    source,
                    agent: agent.id,
                });
                let base = ctx.field.base();
                let token = request_travel(ctx, agent, base);
                ForagePhase::Returning { token }
            } else {
                let source = claim.target();
                ctx.field.release(claim);
                ctx.events.push(ColonyEvent::ForagerReleased {
                    agent: agent.id,
                    source,
                });
                ForagePhase::Wandering { turn_in_ms: 0.0 }
            }
        }
        // Waiting on an arrival or the deposit sequence
        waiting => waiting,
    };

    put_phase(agent, next);
}

fn request_travel(ctx: &mut ForageContext, agent: &mut Agent, target: Vec2) -> StepToken {
    let token = agent.next_token();
    agent.destination = Some(target);
    ctx.events.push(ColonyEvent::TravelRequested {
        agent: agent.id,
        token,
        target,
    });
    token
}

fn wander(ctx: &mut ForageContext, agent: &mut Agent, mut turn_in_ms: f32, dt_ms: f32) -> ForagePhase {
    let config = ctx.config;
    let field_config = &config.field;

    if turn_in_ms <= 0.0 {
        let heading = pick_heading(ctx.random, agent.position, config);
        if let Some(forager) = agent.forager_mut() {
            forager.velocity = heading;
        }
        turn_in_ms = ctx
            .random
            .between(field_config.wander_min_ms, field_config.wander_max_ms) as f32;
    }

    let velocity = agent.forager().map(|f| f.velocity).unwrap_or_default();
    agent.position = ctx.field.clamp(agent.position + velocity * (dt_ms / 1000.0));

    if agent.carried.nectar < config.forager_capacity.nectar {
        if let Some(source) = ctx
            .field
            .nearest_unclaimed_within(agent.position, field_config.aura_radius)
        {
            match ctx.field.try_claim(source, agent.id) {
                Ok(claim) => {
                    let target = ctx
                        .field
                        .source(source)
                        .map(|s| s.position)
                        .unwrap_or(agent.position);
                    trace!(agent = ?agent.id, ?source, "flower spotted");
                    ctx.events.push(ColonyEvent::SourceClaimed {
                        source,
                        agent: agent.id,
                    });
                    let token = request_travel(ctx, agent, target);
                    return ForagePhase::Pursuing { claim, token };
                }
                Err(err) => trace!(agent = ?agent.id, %err, "flower taken"),
            }
        }
    }

    ForagePhase::Wandering { turn_in_ms }
}

/// New wandering velocity, biased away from the side edges and back down
/// toward the flower band
pub fn pick_heading(random: &mut dyn RandomSource, position: Vec2, config: &ColonyConfig) -> Vec2 {
    let field = &config.field;

    let x = if position.x < field.width * field.edge_bias {
        random.between(20, 70)
    } else if position.x > field.width * (1.0 - field.edge_bias) {
        random.between(-70, -20)
    } else {
        random.between(-40, 70)
    };

    let y = if position.y < field.height * field.flight_band {
        random.between(5, 10)
    } else {
        random.between(-10, 10)
    };

    Vec2::new(x as f32, y as f32)
}

/// Resume a forager on arrival. Returns false for a stale token.
pub fn on_arrival(ctx: &mut ForageContext, agent: &mut Agent, token: StepToken) -> bool {
    let Some(phase) = take_phase(agent) else {
        return false;
    };

    let next = match phase {
        ForagePhase::Pursuing { claim, token: awaited } if awaited == token => {
            if let Some(destination) = agent.destination.take() {
                agent.position = destination;
            }
            gather(ctx, agent, claim.target());
            ForagePhase::Collecting {
                claim,
                remaining_ms: ctx.config.collect_delay_ms,
            }
        }
        ForagePhase::Returning { token: awaited } if awaited == token => {
            agent.destination = None;
            agent.position = ctx.field.base();
            if let Some(forager) = agent.forager_mut() {
                forager.visible = false;
                forager.velocity = Vec2::default();
            }
            debug!(agent = ?agent.id, nectar = agent.carried.nectar, water = agent.carried.water, "forager back at the hive");
            ctx.events.push(ColonyEvent::AgentReturnedToBase { agent: agent.id });
            ForagePhase::AtBase
        }
        other => {
            trace!(agent = ?agent.id, ?token, "stale arrival ignored");
            put_phase(agent, other);
            return false;
        }
    };

    put_phase(agent, next);
    true
}

fn gather(ctx: &mut ForageContext, agent: &mut Agent, source: SourceId) {
    let config = ctx.config;
    let limits = &config.forager_capacity;
    let nectar = ctx.random.between(1, config.forager_nectar_yield as i32) as u32;
    let water = ctx.random.between(1, config.forager_water_yield as i32) as u32;

    let nectar = agent.load(Resource::Nectar, nectar, limits);
    let water = agent.load(Resource::Water, water, limits);

    ctx.events.push(ColonyEvent::NectarGathered {
        agent: agent.id,
        source,
        nectar,
        water,
    });
}

/// Finish the hive-side deposit sequence of a forager at base.
///
/// Carried water and nectar go into a random unclaimed cell of each kind;
/// whatever does not fit is lost. Returns false if the forager was not
/// waiting at base.
pub fn complete_deposit(ctx: &mut ForageContext, agent: &mut Agent) -> bool {
    let at_base = agent
        .forager()
        .is_some_and(|f| matches!(f.phase, ForagePhase::AtBase));
    if !at_base {
        return false;
    }

    for resource in [Resource::Water, Resource::Nectar] {
        let amount = agent.unload(resource);
        if amount == 0 {
            continue;
        }

        let kind = CellKind::from(resource);
        let Some(cell) = choose(ctx.random, &ctx.comb.unclaimed(kind)) else {
            debug!(agent = ?agent.id, ?resource, amount, "no cell free, load lost");
            continue;
        };

        let stored = ctx
            .comb
            .scoped(cell, Claimant::Agent(agent.id), |comb, claim| comb.deposit(claim, amount));
        match stored {
            Ok(Ok(stored)) => {
                if stored < amount {
                    debug!(agent = ?agent.id, ?cell, lost = amount - stored, "cell overflowed");
                }
                ctx.events.push(ColonyEvent::ResourceDeposited {
                    cell,
                    resource,
                    amount: stored,
                });
            }
            Ok(Err(err)) | Err(err) => debug!(agent = ?agent.id, ?cell, %err, "deposit failed"),
        }
    }

    if let Some(forager) = agent.forager_mut() {
        forager.visible = true;
        forager.phase = ForagePhase::Wandering { turn_in_ms: 0.0 };
    }
    true
}
