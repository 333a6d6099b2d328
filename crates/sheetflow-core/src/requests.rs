//! Request bodies and their validation
//!
//! Bodies deserialize leniently (every field optional) and are checked here
//! so that malformed input fails with a ValidationError before any store
//! access.

use crate::error::{EngineError, EngineResult};
use crate::types::{
    InfoTemplateId, PartyId, RawValue, ValueSetContext, ValueSetStatus, VarianceStatus,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn required<T: FromStr>(field: &str, value: Option<&str>) -> EngineResult<T> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::Validation(format!("{field} is required")))?;
    raw.parse()
        .map_err(|_| EngineError::Validation(format!("invalid {field}: {raw}")))
}

/// Body of "create value set"
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValueSetRequest {
    pub context: Option<String>,
    pub party_id: Option<u64>,
}

/// Validated "create value set" command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateValueSet {
    /// Context of the new set
    pub context: ValueSetContext,
    /// Offering party; Offered only
    pub party_id: Option<PartyId>,
}

impl CreateValueSet {
    /// Requirement or AsBuilt set
    #[inline]
    #[must_use]
    pub fn new(context: ValueSetContext) -> Self {
        Self {
            context,
            party_id: None,
        }
    }

    /// Offered set for a party
    #[inline]
    #[must_use]
    pub fn offered(party: Option<PartyId>) -> Self {
        Self {
            context: ValueSetContext::Offered,
            party_id: party,
        }
    }
}

impl CreateValueSetRequest {
    /// Validate into a command
    ///
    /// # Errors
    /// `EngineError::Validation` for a missing or unknown context, or a
    /// `partyId` on a non-Offered set.
    pub fn validate(&self) -> EngineResult<CreateValueSet> {
        let context: ValueSetContext = required("context", self.context.as_deref())?;
        if self.party_id.is_some() && context != ValueSetContext::Offered {
            return Err(EngineError::Validation(
                "partyId is only allowed for Offered value sets".to_string(),
            ));
        }
        Ok(CreateValueSet {
            context,
            party_id: self.party_id.map(PartyId),
        })
    }
}

/// Body of "transition value set status"
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransitionRequest {
    pub status: Option<String>,
}

impl TransitionRequest {
    /// Validate the requested status
    ///
    /// Any known status passes; legality for the context is decided later.
    ///
    /// # Errors
    /// `EngineError::Validation` for a missing or unknown status.
    pub fn validate(&self) -> EngineResult<ValueSetStatus> {
        required("status", self.status.as_deref())
    }
}

/// Body of "patch variance"
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchVarianceRequest {
    pub info_template_id: Option<u64>,
    pub status: Option<String>,
}

/// Validated variance decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchVariance {
    /// Template field
    pub info_template_id: InfoTemplateId,
    /// DeviatesAccepted or DeviatesRejected
    pub status: VarianceStatus,
}

impl PatchVarianceRequest {
    /// Validate into a decision
    ///
    /// # Errors
    /// `EngineError::Validation` for a missing field id, a missing or unknown
    /// status, or a computed-only status (`Matches`, `Deviates`).
    pub fn validate(&self) -> EngineResult<PatchVariance> {
        let info_template_id = self
            .info_template_id
            .map(InfoTemplateId)
            .ok_or_else(|| EngineError::Validation("infoTemplateId is required".to_string()))?;
        let status: VarianceStatus = required("status", self.status.as_deref())?;
        if !status.is_decision() {
            return Err(EngineError::Validation(format!(
                "status must be DeviatesAccepted or DeviatesRejected, got {status}"
            )));
        }
        Ok(PatchVariance {
            info_template_id,
            status,
        })
    }
}

/// Body of "set field value"; a missing or null value clears the field
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetFieldValueRequest {
    #[serde(default)]
    pub value: RawValue,
}

/// Query of the compare endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQuery {
    pub party_id: Option<u64>,
}
