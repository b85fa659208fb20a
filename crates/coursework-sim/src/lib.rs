//! Coursework Simulator
//!
//! Drives live sessions against a seeded in-memory backend and checks that
//! the published status never disagrees with a full refold:
//! - [`SimService`]: backend with injected failures and latency
//! - [`invariants`]: checks over every published tree and at rest
//! - [`run_simulator`] / [`run_certification`]: one seed, or a range of them

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod invariants;
pub mod service;
pub mod simulator;

// Re-exports
pub use invariants::{InvariantCheck, InvariantViolation};
pub use service::SimService;
pub use simulator::{
    run_certification, run_simulator, CertificationReport, SimulatedOperation, SimulatorConfig,
    SimulatorReport, SimulatorStats, Violation,
};
