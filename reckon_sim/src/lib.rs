//! Reckon Deterministic Simulation Harness
//!
//! Drives the dead-reckoning verifier through scripted federates on a
//! virtual clock, so every verdict is reproducible from a 64-bit seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  publish   ┌───────────────┐  recv()   ┌──────────────────────┐
//! │  Oracle  │───────────►│ ScheduledFeed │──────────►│ DeadReckoningVerifier│
//! │ (truth)  │  + jitter  │ (virtual time)│           │    + Evaluator       │
//! └──────────┘            └───────────────┘           └──────────────────────┘
//!                                ▲
//!                                │ replay
//!                         ┌──────┴──────┐
//!                         │   capture   │
//!                         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use reckon_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::HourRollover).await;
//! assert!(result.passed);
//! ```

pub mod capture;
mod context;
mod error;
mod feed;
mod oracle;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use feed::{ScheduledFeed, ScheduledUpdate};
pub use oracle::{Oracle, SimEntity, TagMode};
pub use runner::{ingest, IngestStats, ScenarioPlan, ScenarioResult, ScenarioRunner, MAX_JITTER_MICROS};
