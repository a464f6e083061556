//! # flowprobe Runtime
//!
//! HTTP steps, state oracles and the runner for end-to-end flow checks
//! against a live backend.

mod client;
mod discovery;
mod health;
mod identity;
pub mod oracle;
mod runner;
mod signup;

pub use client::{ApiClient, ApiResponse};
pub use discovery::{discover_registration, DiscoveredEndpoint};
pub use health::{HealthProbe, ProbeReport, ProbeStatus, ProbeTarget};
pub use identity::{Identity, IdentityGenerator};
pub use oracle::{
    MemoryOracle, OracleError, ResourceLookup, ResourceRecord, StateOracle,
};
pub use runner::{FlowRunner, RunSummary};
pub use signup::{step_names, SignupFlow};

/// Prelude module for runtime types
pub mod prelude {
    pub use crate::{
        FlowRunner, Identity, ProbeReport, RunSummary, SignupFlow, StateOracle,
    };
}
