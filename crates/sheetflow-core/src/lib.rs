//! Sheetflow Core - value-set lifecycle and variance engine
//!
//! Tracks the Requirement, Offered and AsBuilt value sets of a filled
//! datasheet and:
//! - Isolates tenants (foreign sheets are reported as not found)
//! - Freezes value-set mutation once the sheet is Verified or Approved
//! - Advances value-set status through a per-context state machine
//! - Compares requirement values with offered/as-built values and records
//!   reviewer decisions on deviations
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetflow_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), EngineError> {
//! let directory = Arc::new(InMemoryDirectory::new());
//! directory.register_sheet(SheetId(1), AccountId(1), SheetStatus::Draft);
//!
//! let engine = ValueSetEngine::new(
//!     EngineConfig::default(),
//!     directory,
//!     Arc::new(InMemoryStore::new()),
//! );
//!
//! let req = engine
//!     .create_value_set(AccountId(1), SheetId(1), CreateValueSet::new(ValueSetContext::Requirement))
//!     .await?;
//! engine
//!     .transition(AccountId(1), SheetId(1), req.value_set_id, ValueSetStatus::Locked)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod access;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod requests;
pub mod store;
pub mod transition;
pub mod types;
pub mod variance;

// Re-exports for convenience
pub use access::{AccessGuard, SheetAccess};
pub use audit::{AuditAction, AuditEvent, AuditLog};
pub use config::EngineConfig;
pub use engine::ValueSetEngine;
pub use error::{ConfigError, EngineError, EngineResult, ErrorKind, StoreError};
pub use gate::{MutationPermit, SheetStatusGate};
pub use requests::{
    CompareQuery, CreateValueSet, CreateValueSetRequest, PatchVariance, PatchVarianceRequest,
    SetFieldValueRequest, TransitionRequest,
};
pub use store::{CasOutcome, InMemoryDirectory, InMemoryStore, SheetDirectory, ValueSetStore};
pub use transition::StatusTransitionMachine;
pub use types::{
    AccountId, FieldDataType, FieldLayout, FieldValue, InfoTemplateId, PartyId, RawValue,
    SheetId, SheetLayout, SheetStatus, SubsheetId, SubsheetLayout, ValueSet, ValueSetContext,
    ValueSetId, ValueSetStatus, VarianceDecision, VarianceStatus,
};
pub use variance::{
    CompareCell, CompareField, CompareSubsheet, CompareView, VarianceEngine, VarianceSummary,
    UNASSIGNED_SUBSHEET_ID, UNASSIGNED_SUBSHEET_NAME,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sheetflow core
    pub use crate::{
        AccountId, CreateValueSet, EngineConfig, EngineError, InMemoryDirectory, InMemoryStore,
        PatchVariance, RawValue, SheetId, SheetStatus, ValueSetContext, ValueSetEngine,
        ValueSetId, ValueSetStatus, VarianceStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
