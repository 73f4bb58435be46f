//! Conflict-Based Search with Task Assignment: a two-level MAPD solver,
//! grounded on `examples/original_source/src/cbs_ta/cbs_mapd.hpp` and the
//! base repository's `common/` + `solver/cbs.rs` CBS idiom.

mod constraints;
mod environment;
mod lowlevel;
mod state;

pub mod highlevel;

pub use state::Task;
