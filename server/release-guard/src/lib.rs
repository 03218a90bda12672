//! Release Guard Core: risk tiers, high-risk path matching, policy decisions,
//! record queries and the live settings store.
//!
//! Scores arrive from elsewhere; this crate never computes them. Decisions
//! are pure values. Applying them (labels, merge blocks, fix branches) is
//! left to an external actuator.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod paths;
pub mod policy;
pub mod query;
pub mod records;
pub mod settings;
pub mod stream;
pub mod summary;
pub mod tier;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::{GuardError, ValidationError};
pub use settings::SettingsStore;
pub use tier::classify;
pub use types::{Action, PolicyDecision, PolicySettings, Request, RiskTier, ScoredItem};
