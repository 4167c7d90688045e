//! Parallel execution: partitioning the source list and running one worker
//! task per partition on a fixed-size pool

pub mod engine;
pub mod partition;
pub mod task;

pub use engine::*;
pub use partition::*;
pub use task::*;
