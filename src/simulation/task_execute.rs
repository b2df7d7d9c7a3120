//! Worker transactions: starting a task, resuming it on arrival or timer
//! expiry, and finishing it
//!
//! Every way out of a transaction hands all of its claims back to the comb.

use tracing::{debug, trace};

use crate::core::config::ColonyConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::random::{choose, RandomSource};
use crate::core::types::{CellId, CellKind, Resource, StepToken};
use crate::entity::agent::Agent;
use crate::entity::tasks::{Errand, Stage, Task, Transaction};
use crate::hive::claim::{Claim, Claimant};
use crate::hive::comb::Comb;
use crate::simulation::tick::ColonyEvent;

/// What a worker can reach while it runs a task
pub struct TaskContext<'a> {
    pub comb: &'a mut Comb,
    pub config: &'a ColonyConfig,
    pub random: &'a mut dyn RandomSource,
    pub events: &'a mut Vec<ColonyEvent>,
}

/// Start `task`: pick targets, claim them and request the first travel step.
///
/// Returns false when the worker stays idle this tick (nothing eligible, or
/// a claim was lost to someone else).
pub fn begin_task(ctx: &mut TaskContext, agent: &mut Agent, task: Task) -> bool {
    if agent.worker().map_or(true, |w| w.transaction.is_some()) {
        return false;
    }

    let errand = match task {
        Task::Eat => plan_eat(ctx),
        Task::FeedLarvae => plan_feed_larvae(ctx, agent),
        Task::MakeHoney => plan_make_honey(ctx, agent),
        Task::Idle => None,
    };
    let Some(errand) = errand else {
        trace!(agent = ?agent.id, ?task, "no eligible target");
        return false;
    };

    let target = match ctx.comb.position(errand.destination()) {
        Ok(position) => position,
        Err(err) => {
            debug!(agent = ?agent.id, %err, "cannot start task");
            return false;
        }
    };

    let claims = match claim_targets(ctx.comb, &errand, Claimant::Agent(agent.id)) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(agent = ?agent.id, ?task, %err, "claim refused, retrying next tick");
            return false;
        }
    };

    let token = agent.next_token();
    agent.destination = Some(target);
    if let Some(worker) = agent.worker_mut() {
        worker.transaction = Some(Transaction::new(task, errand, token, claims));
    }

    debug!(agent = ?agent.id, ?task, ?errand, "task assigned");
    ctx.events.push(ColonyEvent::TaskAssigned {
        agent: agent.id,
        task,
    });
    ctx.events.push(ColonyEvent::TravelRequested {
        agent: agent.id,
        token,
        target,
    });
    true
}

fn plan_eat(ctx: &mut TaskContext) -> Option<Errand> {
    let honey = choose(ctx.random, &ctx.comb.available(CellKind::Honey))?;
    Some(Errand::Eat { honey })
}

fn plan_feed_larvae(ctx: &mut TaskContext, agent: &Agent) -> Option<Errand> {
    let brood = choose(ctx.random, &ctx.comb.awaiting_brood())?;
    let required = required_honey(ctx.comb, brood, ctx.config)?;

    if agent.carried.honey < required {
        let honey = choose(ctx.random, &ctx.comb.available(CellKind::Honey))?;
        Some(Errand::FetchHoney { honey, brood })
    } else {
        Some(Errand::FeedBrood { brood })
    }
}

fn plan_make_honey(ctx: &mut TaskContext, agent: &Agent) -> Option<Errand> {
    let water_target = ctx.config.water_per_batch();
    let nectar_target = ctx.config.honey_yield_threshold;
    let carried = agent.carried;

    if carried.water < water_target {
        if let Some(cell) = choose(ctx.random, &ctx.comb.available(CellKind::Water)) {
            return Some(Errand::Collect {
                cell,
                resource: Resource::Water,
            });
        }
    }

    if carried.nectar < nectar_target {
        if let Some(cell) = choose(ctx.random, &ctx.comb.available(CellKind::Nectar)) {
            return Some(Errand::Collect {
                cell,
                resource: Resource::Nectar,
            });
        }
    }

    if carried.water >= water_target && carried.nectar >= nectar_target {
        let cell = choose(ctx.random, &ctx.comb.unfilled(CellKind::Honey))?;
        return Some(Errand::StoreHoney { cell });
    }

    None
}

fn required_honey(comb: &Comb, brood: CellId, config: &ColonyConfig) -> Option<u32> {
    comb.cell(brood)
        .and_then(|cell| cell.brood())
        .map(|b| b.required_honey(config.honey_per_stage))
}

/// Claim every cell an errand touches, all or nothing
fn claim_targets(comb: &mut Comb, errand: &Errand, claimant: Claimant) -> Result<Vec<Claim<CellId>>> {
    match *errand {
        Errand::FetchHoney { honey, brood } => {
            let brood_claim = comb.try_claim(brood, claimant)?;
            match comb.try_claim(honey, claimant) {
                Ok(honey_claim) => Ok(vec![brood_claim, honey_claim]),
                Err(err) => {
                    comb.release(brood_claim);
                    Err(err)
                }
            }
        }
        other => Ok(vec![comb.try_claim(other.destination(), claimant)?]),
    }
}

/// Resume the worker's transaction on arrival.
///
/// Returns false for a stale token; the worker is left untouched.
pub fn on_arrival(ctx: &mut TaskContext, agent: &mut Agent, token: StepToken) -> bool {
    let awaited = agent
        .worker()
        .and_then(|w| w.transaction.as_ref())
        .is_some_and(|tx| tx.awaits(token));
    if !awaited {
        trace!(agent = ?agent.id, ?token, "stale arrival ignored");
        return false;
    }

    // Every completed journey costs energy, whatever happens next
    agent.drain(ctx.config.travel_cost);
    if let Some(destination) = agent.destination.take() {
        agent.position = destination;
    }

    let Some(mut tx) = agent.worker_mut().and_then(|w| w.transaction.take()) else {
        return false;
    };

    if let Errand::StoreHoney { .. } = tx.errand {
        tx.stage = Stage::Maturing {
            remaining_ms: ctx.config.maturation_ms,
        };
        if let Some(worker) = agent.worker_mut() {
            worker.transaction = Some(tx);
        }
        return true;
    }

    finish(ctx, agent, tx);
    true
}

/// Run the maturation timer of a worker waiting on honey
pub fn advance_timers(ctx: &mut TaskContext, agent: &mut Agent, dt_ms: f32) {
    let matured = match agent.worker_mut().and_then(|w| w.transaction.as_mut()) {
        Some(Transaction {
            stage: Stage::Maturing { remaining_ms },
            ..
        }) => {
            *remaining_ms -= dt_ms;
            *remaining_ms <= 0.0
        }
        _ => false,
    };
    if !matured {
        return;
    }

    if let Some(tx) = agent.worker_mut().and_then(|w| w.transaction.take()) {
        finish(ctx, agent, tx);
    }
}

/// Honey left maturing by a worker that died before the timer ran out.
///
/// The honey cell stays claimed by the keeper until the batch lands.
#[derive(Debug)]
pub struct MaturingBatch {
    pub cell: CellId,
    pub batch: u32,
    pub remaining_ms: f32,
    claim: Claim<CellId>,
}

/// Take a dying worker's maturing honey off its hands.
///
/// Returns None unless the worker is waiting on maturation; any other
/// transaction is left for `Agent::surrender_claims`.
pub fn detach_maturation(comb: &mut Comb, agent: &mut Agent) -> Option<MaturingBatch> {
    let (cell, remaining_ms) = match agent.worker().and_then(|w| w.transaction.as_ref()) {
        Some(Transaction {
            errand: Errand::StoreHoney { cell },
            stage: Stage::Maturing { remaining_ms },
            ..
        }) => (*cell, *remaining_ms),
        _ => return None,
    };

    let tx = agent.worker_mut()?.transaction.take()?;
    let batch = agent.unload(Resource::Nectar) + agent.unload(Resource::Water);

    // The lock passes straight from the worker to the keeper
    comb.release_all(tx.into_claims());
    match comb.try_claim(cell, Claimant::Keeper) {
        Ok(claim) => Some(MaturingBatch {
            cell,
            batch,
            remaining_ms,
            claim,
        }),
        Err(err) => {
            debug!(agent = ?agent.id, ?cell, %err, "maturing honey lost");
            None
        }
    }
}

/// Run the timers of batches whose workers are gone, storing the ripe ones
pub fn advance_batches(ctx: &mut TaskContext, batches: &mut Vec<MaturingBatch>, dt_ms: f32) {
    for batch in batches.iter_mut() {
        batch.remaining_ms -= dt_ms;
    }
    let (ripe, waiting): (Vec<_>, Vec<_>) = std::mem::take(batches)
        .into_iter()
        .partition(|b| b.remaining_ms <= 0.0);
    *batches = waiting;

    for MaturingBatch {
        cell, batch, claim, ..
    } in ripe
    {
        let stored = match ctx.comb.deposit(&claim, batch) {
            Ok(stored) => stored,
            Err(err) => {
                debug!(?cell, %err, "maturing honey lost");
                0
            }
        };
        ctx.comb.release(claim);

        trace!(?cell, stored, "unattended honey matured");
        ctx.events.push(ColonyEvent::ResourceDeposited {
            cell,
            resource: Resource::Honey,
            amount: stored,
        });
    }
}

/// Carry out the last step of a transaction and hand back its claims
fn finish(ctx: &mut TaskContext, agent: &mut Agent, tx: Transaction) {
    let outcome = match tx.errand {
        Errand::Eat { honey } => eat(ctx, agent, &tx, honey),
        Errand::Collect { cell, resource } => collect(ctx, agent, &tx, cell, resource),
        Errand::StoreHoney { cell } => store_honey(ctx, agent, &tx, cell),
        Errand::FetchHoney { honey, brood } => fetch_honey(ctx, agent, &tx, honey, brood),
        Errand::FeedBrood { brood } => feed_brood(ctx, agent, &tx, brood),
    };

    let task = tx.task;
    ctx.comb.release_all(tx.into_claims());

    match outcome {
        Ok(()) => {
            trace!(agent = ?agent.id, ?task, "task completed");
            ctx.events.push(ColonyEvent::TaskCompleted {
                agent: agent.id,
                task,
            });
        }
        Err(err) => {
            debug!(agent = ?agent.id, ?task, %err, "task abandoned");
            ctx.events.push(ColonyEvent::TaskAbandoned {
                agent: agent.id,
                task,
                reason: err.to_string(),
            });
        }
    }
}

fn held<'t>(tx: &'t Transaction, cell: CellId) -> Result<&'t Claim<CellId>> {
    tx.claim_on(cell).ok_or(ColonyError::LockConflict(cell))
}

fn stock(comb: &Comb, cell: CellId) -> Result<u32> {
    let amount = comb
        .cell(cell)
        .map(|c| c.amount())
        .ok_or(ColonyError::CellNotFound(cell))?;
    if amount == 0 {
        return Err(ColonyError::InvalidTarget(format!("cell {:?} is empty", cell)));
    }
    Ok(amount)
}

fn eat(ctx: &mut TaskContext, agent: &mut Agent, tx: &Transaction, honey: CellId) -> Result<()> {
    stock(ctx.comb, honey)?;
    let eaten = ctx.comb.withdraw(held(tx, honey)?, ctx.config.meal_size)?;
    agent.restore(eaten as f32 * ctx.config.energy_per_honey);

    ctx.events.push(ColonyEvent::ResourceWithdrawn {
        cell: honey,
        resource: Resource::Honey,
        amount: eaten,
    });
    Ok(())
}

fn collect(
    ctx: &mut TaskContext,
    agent: &mut Agent,
    tx: &Transaction,
    cell: CellId,
    resource: Resource,
) -> Result<()> {
    stock(ctx.comb, cell)?;

    let target = match resource {
        Resource::Water => ctx.config.water_per_batch(),
        _ => ctx.config.honey_yield_threshold,
    };
    let limits = &ctx.config.worker_capacity;
    let carried = agent.carried.get(resource);
    let want = target
        .saturating_sub(carried)
        .min(limits.of(resource).saturating_sub(carried));

    let taken = ctx.comb.withdraw(held(tx, cell)?, want)?;
    agent.load(resource, taken, limits);

    ctx.events.push(ColonyEvent::ResourceWithdrawn {
        cell,
        resource,
        amount: taken,
    });
    Ok(())
}

fn store_honey(ctx: &mut TaskContext, agent: &mut Agent, tx: &Transaction, cell: CellId) -> Result<()> {
    let batch = agent.carried.nectar + agent.carried.water;
    let stored = ctx.comb.deposit(held(tx, cell)?, batch)?;
    agent.unload(Resource::Nectar);
    agent.unload(Resource::Water);

    if stored < batch {
        debug!(agent = ?agent.id, cell = ?cell, lost = batch - stored, "honey cell overflowed");
    }
    ctx.events.push(ColonyEvent::ResourceDeposited {
        cell,
        resource: Resource::Honey,
        amount: stored,
    });
    Ok(())
}

fn fetch_honey(
    ctx: &mut TaskContext,
    agent: &mut Agent,
    tx: &Transaction,
    honey: CellId,
    brood: CellId,
) -> Result<()> {
    let required = required_honey(ctx.comb, brood, ctx.config)
        .ok_or_else(|| ColonyError::InvalidTarget(format!("cell {:?} holds no brood", brood)))?;
    stock(ctx.comb, honey)?;

    let want = required.saturating_sub(agent.carried.honey);
    let taken = ctx.comb.withdraw(held(tx, honey)?, want)?;
    agent.load(Resource::Honey, taken, &ctx.config.worker_capacity);

    ctx.events.push(ColonyEvent::ResourceWithdrawn {
        cell: honey,
        resource: Resource::Honey,
        amount: taken,
    });
    Ok(())
}

fn feed_brood(ctx: &mut TaskContext, agent: &mut Agent, tx: &Transaction, brood: CellId) -> Result<()> {
    let hungry = ctx
        .comb
        .cell(brood)
        .and_then(|cell| cell.brood())
        .is_some_and(|b| b.is_awaiting_food());
    if !hungry {
        return Err(ColonyError::InvalidTarget(format!(
            "larva in {:?} is no longer waiting for food",
            brood
        )));
    }
    let honey = agent.carried.honey;
    if honey == 0 {
        return Err(ColonyError::InvalidTarget("no honey carried".into()));
    }

    ctx.comb
        .feed_brood(held(tx, brood)?, honey, ctx.config.nutrient_ms)?;
    agent.unload(Resource::Honey);

    ctx.events.push(ColonyEvent::BroodFed { cell: brood, honey });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::FirstPick;
    use crate::core::types::{AgentId, Vec2};
    use crate::entity::agent::Activity;

    struct Bench {
        comb: Comb,
        config: ColonyConfig,
        random: FirstPick,
        events: Vec<ColonyEvent>,
    }

    impl Bench {
        fn new(kinds: &[CellKind]) -> Self {
            let config = ColonyConfig::default();
            let mut comb = Comb::new();
            for (i, kind) in kinds.iter().enumerate() {
                comb.add_cell(*kind, Vec2::new(i as f32 * 56.0, 105.0), &config);
            }
            Self {
                comb,
                config,
                random: FirstPick,
                events: Vec::new(),
            }
        }

        fn ctx(&mut self) -> TaskContext<'_> {
            TaskContext {
                comb: &mut self.comb,
                config: &self.config,
                random: &mut self.random,
                events: &mut self.events,
            }
        }
    }

    fn last_token(events: &[ColonyEvent]) -> StepToken {
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                ColonyEvent::TravelRequested { token, .. } => Some(*token),
                _ => None,
            })
            .expect("travel requested")
    }

    #[test]
    fn test_eat_restores_energy_and_releases() {
        let mut bench = Bench::new(&[CellKind::Honey]);
        bench.comb.fill(CellId(0), 4).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);
        agent.energy = 15.0;

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::Eat));
        assert_eq!(agent.activity(), Activity::Eating);
        assert!(bench.comb.cell(CellId(0)).unwrap().is_locked());

        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));

        // 15 - 3 travel + 4 * 10 honey
        assert_eq!(agent.energy, 52.0);
        assert_eq!(bench.comb.cell(CellId(0)).unwrap().amount(), 0);
        assert!(!bench.comb.cell(CellId(0)).unwrap().is_locked());
        assert_eq!(agent.activity(), Activity::Idle);
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let mut bench = Bench::new(&[CellKind::Honey]);
        bench.comb.fill(CellId(0), 4).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::Eat));
        let token = last_token(&bench.events);
        assert!(!on_arrival(&mut bench.ctx(), &mut agent, StepToken(token.0 + 7)));
        assert_eq!(agent.energy, 100.0);
        assert!(bench.comb.cell(CellId(0)).unwrap().is_locked());
    }

    #[test]
    fn test_make_honey_cycle() {
        let mut bench = Bench::new(&[CellKind::Nectar, CellKind::Water, CellKind::Honey]);
        bench.comb.fill(CellId(0), 10).unwrap();
        bench.comb.fill(CellId(1), 10).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);

        // Water first, then nectar, then the honey cell
        for expected in [CellId(1), CellId(0)] {
            assert!(begin_task(&mut bench.ctx(), &mut agent, Task::MakeHoney));
            let tx = agent.worker().unwrap().transaction.as_ref().unwrap();
            assert_eq!(tx.errand.destination(), expected);
            let token = last_token(&bench.events);
            assert!(on_arrival(&mut bench.ctx(), &mut agent, token));
        }
        assert_eq!(agent.carried.water, 1);
        assert_eq!(agent.carried.nectar, 2);

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::MakeHoney));
        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));
        assert_eq!(agent.activity(), Activity::Transacting);

        advance_timers(&mut bench.ctx(), &mut agent, 4999.0);
        assert_eq!(bench.comb.ledger().honey, 0);
        advance_timers(&mut bench.ctx(), &mut agent, 1.0);

        assert_eq!(bench.comb.ledger().honey, 3);
        assert_eq!(agent.carried.nectar, 0);
        assert_eq!(agent.carried.water, 0);
        assert!(!bench.comb.cell(CellId(2)).unwrap().is_locked());
        assert_eq!(agent.activity(), Activity::Idle);
    }

    #[test]
    fn test_feed_larvae_fetches_then_feeds() {
        let mut bench = Bench::new(&[CellKind::Brood, CellKind::Honey]);
        bench.comb.fill(CellId(1), 10).unwrap();
        bench.comb.advance_brood(CellId(0), 4).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::FeedLarvae));
        assert!(bench.comb.cell(CellId(0)).unwrap().is_locked(), "brood reserved");
        assert!(bench.comb.cell(CellId(1)).unwrap().is_locked());
        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));
        assert_eq!(agent.carried.honey, 2);
        assert!(!bench.comb.cell(CellId(0)).unwrap().is_locked());

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::FeedLarvae));
        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));

        let brood = bench.comb.cell(CellId(0)).unwrap().brood().unwrap();
        assert_eq!(brood.nutrients(), 2);
        assert!(brood.timer_pending());
        assert_eq!(agent.carried.honey, 0);
        assert!(bench.events.contains(&ColonyEvent::BroodFed {
            cell: CellId(0),
            honey: 2
        }));
    }

    #[test]
    fn test_claim_conflict_leaves_worker_idle() {
        let mut bench = Bench::new(&[CellKind::Honey]);
        bench.comb.fill(CellId(0), 4).unwrap();
        let mut first = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);
        let mut second = Agent::new_worker(AgentId(1), Vec2::default(), 100.0);

        assert!(begin_task(&mut bench.ctx(), &mut first, Task::Eat));
        assert!(!begin_task(&mut bench.ctx(), &mut second, Task::Eat));
        assert_eq!(second.activity(), Activity::Idle);
    }

    #[test]
    fn test_empty_target_abandons_task() {
        let mut bench = Bench::new(&[CellKind::Honey]);
        bench.comb.fill(CellId(0), 4).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);
        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::Eat));

        // Drain the claimed cell behind the worker's back
        let claim = Claim::new(CellId(0), Claimant::Agent(AgentId(0)));
        bench.comb.withdraw(&claim, 4).unwrap();

        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));
        assert!(matches!(
            bench.events.last(),
            Some(ColonyEvent::TaskAbandoned { task: Task::Eat, .. })
        ));
        assert!(!bench.comb.cell(CellId(0)).unwrap().is_locked());
        assert_eq!(agent.energy, 97.0, "travel is paid even when the task fails");
    }

    #[test]
    fn test_detached_batch_matures_without_worker() {
        let mut bench = Bench::new(&[CellKind::Honey, CellKind::Nectar]);
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);
        agent.carried.nectar = 2;
        agent.carried.water = 1;

        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::MakeHoney));
        let token = last_token(&bench.events);
        assert!(on_arrival(&mut bench.ctx(), &mut agent, token));
        advance_timers(&mut bench.ctx(), &mut agent, 1000.0);

        let batch = detach_maturation(&mut bench.comb, &mut agent).unwrap();
        assert_eq!(batch.batch, 3);
        assert_eq!(batch.remaining_ms, 4000.0);
        assert_eq!(agent.activity(), Activity::Idle);
        assert_eq!(agent.carried.nectar + agent.carried.water, 0);
        assert_eq!(
            bench.comb.cell(CellId(0)).unwrap().holder(),
            Some(Claimant::Keeper)
        );

        let mut batches = vec![batch];
        advance_batches(&mut bench.ctx(), &mut batches, 3999.0);
        assert_eq!(batches.len(), 1);
        assert_eq!(bench.comb.ledger().honey, 0);
        advance_batches(&mut bench.ctx(), &mut batches, 1.0);

        assert!(batches.is_empty());
        assert_eq!(bench.comb.ledger().honey, 3);
        assert!(!bench.comb.cell(CellId(0)).unwrap().is_locked());
    }

    #[test]
    fn test_only_maturing_workers_detach() {
        let mut bench = Bench::new(&[CellKind::Honey]);
        bench.comb.fill(CellId(0), 4).unwrap();
        let mut agent = Agent::new_worker(AgentId(0), Vec2::default(), 100.0);
        assert!(begin_task(&mut bench.ctx(), &mut agent, Task::Eat));

        assert!(detach_maturation(&mut bench.comb, &mut agent).is_none());
        assert!(agent.worker().unwrap().transaction.is_some(), "left for surrender");
    }
}
