//! # replyflow-core
//!
//! Building blocks shared by every replyflow crate.
//!
//! ## Core Concepts
//!
//! - **SharedState**: the mutable key/value scope of one pipeline run
//! - **Predicate**: a named condition over the state, evaluated by gate steps
//! - **FlowError**: errors raised while manipulating state or building pipelines
//!
//! ## Quick Start
//!
//! ```rust
//! use replyflow_core::prelude::*;
//!
//! let mut state = SharedState::new();
//! state
//!     .set("fetched_email_data", serde_json::json!({"status": "no_email"}))
//!     .unwrap();
//!
//! let gate = Predicate::status_is("fetched_email_data", "success");
//! assert!(!evaluate(&gate, &state));
//! ```

pub mod context;
pub mod error;
pub mod gate;

pub use context::{SharedState, SharedStateBuilder};
pub use error::{FlowError, Result};
pub use gate::{Predicate, evaluate};

/// Convenient re-exports for common use.
pub mod prelude {
    pub use serde::{Deserialize, Serialize};

    pub use crate::{
        context::{SharedState, SharedStateBuilder},
        error::{FlowError, Result},
        gate::{Predicate, evaluate},
    };
}
