//! Core orchestration for termgraph.
//!
//! - [`pipeline`]: `build` (concept exports + relationship dump → CSVs)
//! - [`resolve`]: `resolve` (ID list → Snowstorm → JSON + not-found list)

pub mod pipeline;
pub mod resolve;
