//! Hive Colony - bee colony resource and task-scheduling simulation

pub mod core;
pub mod entity;
pub mod hive;
pub mod simulation;
pub mod world;
