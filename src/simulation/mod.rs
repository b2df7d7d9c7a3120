pub mod action_select;
pub mod brood_growth;
pub mod colony;
pub mod foraging;
pub mod locomotion;
pub mod population;
pub mod task_execute;
pub mod tick;

pub use action_select::{choose_task, Census};
pub use colony::{ActivityCounts, BroodCounts, Colony, ColonyReport};
pub use locomotion::{Autopilot, Locomotion};
pub use population::Population;
pub use tick::{run_colony_tick, ColonyEvent};
