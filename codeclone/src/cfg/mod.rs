//! Per-function control-flow graphs.
//!
//! Blocks live in an arena (`Vec<Block>`) and edges are integer ids, so the
//! naturally cyclic loop structure needs no reference counting. Block ids
//! are assigned in creation order during a source-order walk, which makes
//! them deterministic across runs.

mod builder;
mod fingerprint;
mod model;

pub use builder::CfgBuilder;
pub use fingerprint::{bucket_loc, canonical_cfg_dump, cfg_fingerprint};
pub use model::{Block, BlockStmt, Cfg};
