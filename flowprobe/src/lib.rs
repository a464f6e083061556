//! # flowprobe - End-to-End Flow Verification
//!
//! flowprobe drives a live backend through user registration, OTP
//! verification, login and product creation, and checks the backing store
//! after each state-changing call.
//!
//! ## Features
//!
//! - `postgres` (default): read OTPs and products straight from Postgres
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowprobe::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::from_file("config/flowprobe.yaml")?;
//!     let oracle = Arc::new(MemoryOracle::new());
//!
//!     let summary = FlowRunner::new(config, oracle).run().await;
//!     println!("completed: {}", summary.completed);
//!     Ok(())
//! }
//! ```

pub use flowprobe_config as config;
pub use flowprobe_context as context;
pub use flowprobe_core::*;
pub use flowprobe_logger as logger;
pub use flowprobe_runtime as runtime;

/// Prelude module for easy imports
pub mod prelude {
    pub use flowprobe_config::prelude::*;
    pub use flowprobe_context::{FlowContext, SharedContext};
    pub use flowprobe_core::prelude::*;
    pub use flowprobe_runtime::prelude::*;
    pub use flowprobe_runtime::MemoryOracle;
}
