pub mod agent;
pub mod tasks;

pub use agent::{Activity, Agent, Carried, ForagePhase, ForagerState, RoleState, WorkerState};
pub use tasks::{Errand, Stage, Task, Transaction};
