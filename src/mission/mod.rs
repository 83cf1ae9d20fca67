//! Mission orchestration: one concurrent agent loop per vehicle.

mod runner;

pub use runner::{MissionError, MissionRunner};
