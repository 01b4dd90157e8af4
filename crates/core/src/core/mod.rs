//! Pipeline core: reservation stations, register renaming, memory,
//! load/store ordering, speculation, and the per-cycle driver.

pub mod engine;
pub mod execute;
pub mod issue;
pub mod loadstore;
pub mod memory;
pub mod register;
pub mod speculation;
pub mod station;
pub mod writeback;

pub use engine::{Engine, Snapshot};
