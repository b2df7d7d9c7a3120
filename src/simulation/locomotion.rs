//! How travel requests turn into arrivals
//!
//! With [`Locomotion::External`] a presentation layer moves the sprites and
//! reports arrivals through `Colony::arrived`. [`Locomotion::Autopilot`]
//! stands in for it: each journey takes distance over speed, and the hive
//! side deposit sequence of a returning forager takes a fixed time.

use crate::core::config::ColonyConfig;
use crate::core::types::{AgentId, Role, StepToken, Vec2};
use crate::simulation::population::Population;
use crate::simulation::tick::ColonyEvent;

#[derive(Debug, Default)]
pub enum Locomotion {
    #[default]
    External,
    Autopilot(Autopilot),
}

impl Locomotion {
    pub fn autopilot() -> Self {
        Locomotion::Autopilot(Autopilot::default())
    }

    pub fn is_autopilot(&self) -> bool {
        matches!(self, Locomotion::Autopilot(_))
    }

    /// Schedule whatever the autopilot must answer among `events`
    pub fn observe(&mut self, events: &[ColonyEvent], population: &Population, config: &ColonyConfig) {
        let Locomotion::Autopilot(pilot) = self else {
            return;
        };

        for event in events {
            match *event {
                ColonyEvent::TravelRequested { agent, token, target } => {
                    let Some(traveller) = population.get(agent) else {
                        continue;
                    };
                    let duration = match traveller.role() {
                        Role::Worker => {
                            travel_time_ms(traveller.position, target, config.worker_speed)
                                + config.arrival_settle_ms
                        }
                        Role::Forager => {
                            travel_time_ms(traveller.position, target, config.forager_speed)
                        }
                    };
                    pilot.dispatch(agent, token, duration);
                }
                ColonyEvent::AgentReturnedToBase { agent } => {
                    pilot.hold_deposit(agent, config.deposit_sequence_ms);
                }
                ColonyEvent::AgentExpired { agent, .. } => pilot.forget(agent),
                _ => {}
            }
        }
    }
}

/// Time to cover the distance at `speed` units per second
pub fn travel_time_ms(from: Vec2, to: Vec2, speed: f32) -> f32 {
    if speed <= 0.0 {
        return 0.0;
    }
    from.distance(&to) / speed * 1000.0
}

#[derive(Debug, Clone, Copy)]
struct Journey {
    agent: AgentId,
    token: StepToken,
    remaining_ms: f32,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    agent: AgentId,
    remaining_ms: f32,
}

/// What came due during one advance
#[derive(Debug, Default, PartialEq)]
pub struct Due {
    pub arrivals: Vec<(AgentId, StepToken)>,
    pub deposits: Vec<AgentId>,
}

/// Headless stand-in for the presentation layer.
///
/// Kept in Vecs so due items come out in the order they were scheduled.
#[derive(Debug, Default)]
pub struct Autopilot {
    journeys: Vec<Journey>,
    deposits: Vec<Countdown>,
}

impl Autopilot {
    pub fn dispatch(&mut self, agent: AgentId, token: StepToken, duration_ms: f32) {
        self.journeys.push(Journey {
            agent,
            token,
            remaining_ms: duration_ms,
        });
    }

    pub fn hold_deposit(&mut self, agent: AgentId, duration_ms: f32) {
        self.deposits.push(Countdown {
            agent,
            remaining_ms: duration_ms,
        });
    }

    /// Drop everything scheduled for an agent
    pub fn forget(&mut self, agent: AgentId) {
        self.journeys.retain(|j| j.agent != agent);
        self.deposits.retain(|d| d.agent != agent);
    }

    pub fn in_flight(&self) -> usize {
        self.journeys.len() + self.deposits.len()
    }

    pub fn advance(&mut self, dt_ms: f32) -> Due {
        let mut due = Due::default();

        self.journeys.retain_mut(|journey| {
            journey.remaining_ms -= dt_ms;
            if journey.remaining_ms <= 0.0 {
                due.arrivals.push((journey.agent, journey.token));
                false
            } else {
                true
            }
        });

        self.deposits.retain_mut(|countdown| {
            countdown.remaining_ms -= dt_ms;
            if countdown.remaining_ms <= 0.0 {
                due.deposits.push(countdown.agent);
                false
            } else {
                true
            }
        });

        due
    }
}
