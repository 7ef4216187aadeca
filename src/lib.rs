//! Multi-model weather consensus engine.
//!
//! Fans a single location out across several independent forecast models,
//! reconciles their readings into one consensus forecast with a confidence
//! score, and narrates the result. See each module for its piece of the
//! pipeline (spec §1).

pub mod aggregate;
pub mod config;
pub mod confidence;
pub mod endpoints;
pub mod error;
pub mod fanout;
pub mod geocoding;
pub mod logging;
pub mod model;
pub mod model_client;
pub mod narrative;
pub mod stats;
pub mod table;
pub mod units;
