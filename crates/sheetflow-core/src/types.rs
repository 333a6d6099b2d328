//! Core types for sheetflow
//!
//! Defines the fundamental domain types:
//! - Identifiers for sheets, tenants, value sets and template fields
//! - Sheet, value-set and variance statuses
//! - Value sets and the field values they hold
//! - Template layout used to group comparison output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value
            #[inline]
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Filled sheet identifier
    SheetId
);
numeric_id!(
    /// Tenant (account) identifier
    AccountId
);
numeric_id!(
    /// Value set identifier
    ValueSetId
);
numeric_id!(
    /// Template field identifier
    InfoTemplateId
);
numeric_id!(
    /// External party (supplier/vendor) identifier
    PartyId
);
numeric_id!(
    /// Subsheet identifier within a template
    SubsheetId
);

/// Error returned when a wire name does not match any variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Which enum was being parsed
    pub kind: &'static str,
    /// Rejected input
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of this variant
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Review-lifecycle status of a filled sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetStatus {
    /// Initial authoring
    Draft,
    /// Re-opened after approval for a new revision
    ModifiedDraft,
    /// Sent back by a reviewer
    Rejected,
    /// Checked by a verifier
    Verified,
    /// Signed off
    Approved,
}

wire_enum!(SheetStatus, "sheet status", {
    Draft,
    ModifiedDraft,
    Rejected,
    Verified,
    Approved,
});

/// Which party a value set speaks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSetContext {
    /// Buyer-specified values
    Requirement,
    /// Vendor-proposed values
    Offered,
    /// Values confirmed after installation
    AsBuilt,
}

wire_enum!(ValueSetContext, "value set context", {
    Requirement,
    Offered,
    AsBuilt,
});

impl ValueSetContext {
    /// Whether this context is compared against the requirement
    #[inline]
    #[must_use]
    pub fn is_counterpart(&self) -> bool {
        !matches!(self, ValueSetContext::Requirement)
    }
}

/// A value set's own status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSetStatus {
    /// Editable
    Draft,
    /// Frozen requirement or offer
    Locked,
    /// Confirmed as-built values
    Verified,
}

wire_enum!(ValueSetStatus, "value set status", {
    Draft,
    Locked,
    Verified,
});

/// Outcome of comparing one requirement value with its counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarianceStatus {
    /// Values are equal after normalization
    Matches,
    /// Values differ and no decision is on record
    Deviates,
    /// A reviewer accepted the deviation
    DeviatesAccepted,
    /// A reviewer rejected the deviation
    DeviatesRejected,
}

wire_enum!(VarianceStatus, "variance status", {
    Matches,
    Deviates,
    DeviatesAccepted,
    DeviatesRejected,
});

impl VarianceStatus {
    /// Whether a reviewer may record this status
    #[inline]
    #[must_use]
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            VarianceStatus::DeviatesAccepted | VarianceStatus::DeviatesRejected
        )
    }
}

/// Raw field value as entered: string, number or null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawValue {
    /// No value
    #[default]
    Null,
    /// Numeric entry
    Number(serde_json::Number),
    /// Free text or option key
    Text(String),
}

impl RawValue {
    /// Text value
    #[inline]
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// Numeric value; non-finite input becomes null
    #[inline]
    #[must_use]
    pub fn number(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(RawValue::Number)
            .unwrap_or(RawValue::Null)
    }

    /// Whether the value is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

/// One named collection of field values for a sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    /// Value set identifier
    pub value_set_id: ValueSetId,
    /// Owning sheet
    pub sheet_id: SheetId,
    /// Requirement, Offered or AsBuilt
    pub context: ValueSetContext,
    /// Offering party; only ever set for Offered sets
    pub party_id: Option<PartyId>,
    /// Own lifecycle status
    pub status: ValueSetStatus,
}

/// A single template-field value inside a value set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    /// Owning value set
    pub value_set_id: ValueSetId,
    /// Template field
    pub info_template_id: InfoTemplateId,
    /// Stored value
    pub value: RawValue,
}

/// Reviewer decision on a deviating field
///
/// The normalized values the decision was made against are kept so that a
/// later edit to either side supersedes the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceDecision {
    /// Sheet the pairing belongs to
    pub sheet_id: SheetId,
    /// Offered or AsBuilt value set
    pub value_set_id: ValueSetId,
    /// Template field
    pub info_template_id: InfoTemplateId,
    /// DeviatesAccepted or DeviatesRejected
    pub status: VarianceStatus,
    /// Normalized requirement value at decision time
    pub requirement_value: String,
    /// Normalized counterpart value at decision time
    pub counterpart_value: String,
}

/// Data type of a template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FieldDataType {
    /// Free text
    #[default]
    Text,
    /// Numeric quantity
    Number,
    /// Choice from a fixed option list
    Option,
}

/// A template field as laid out on a subsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLayout {
    /// Template field identifier
    pub info_template_id: InfoTemplateId,
    /// Display label
    pub label: String,
    /// Unit of measure, if any
    pub uom: Option<String>,
    /// Data type
    pub data_type: FieldDataType,
}

impl FieldLayout {
    /// Create a field layout
    #[inline]
    pub fn new(
        info_template_id: u64,
        label: impl Into<String>,
        data_type: FieldDataType,
    ) -> Self {
        Self {
            info_template_id: InfoTemplateId(info_template_id),
            label: label.into(),
            uom: None,
            data_type,
        }
    }

    /// With unit of measure
    #[inline]
    #[must_use]
    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.uom = Some(uom.into());
        self
    }
}

/// Ordered group of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsheetLayout {
    /// Subsheet identifier
    pub id: SubsheetId,
    /// Subsheet name
    pub name: String,
    /// Fields in display order
    pub fields: Vec<FieldLayout>,
}

impl SubsheetLayout {
    /// Create an empty subsheet
    #[inline]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// With field appended
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: FieldLayout) -> Self {
        self.fields.push(field);
        self
    }
}

/// Template structure of a sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SheetLayout {
    /// Subsheets in display order
    pub subsheets: Vec<SubsheetLayout>,
}

impl SheetLayout {
    /// Create an empty layout
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With subsheet appended
    #[inline]
    #[must_use]
    pub fn with_subsheet(mut self, subsheet: SubsheetLayout) -> Self {
        self.subsheets.push(subsheet);
        self
    }

    /// Look up a field anywhere in the layout
    #[must_use]
    pub fn field(&self, id: InfoTemplateId) -> Option<&FieldLayout> {
        self.subsheets
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.info_template_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for status in SheetStatus::ALL {
            assert_eq!(status.as_str().parse::<SheetStatus>().unwrap(), *status);
        }
        assert_eq!(
            "AsBuilt".parse::<ValueSetContext>().unwrap(),
            ValueSetContext::AsBuilt
        );
        assert_eq!(VarianceStatus::DeviatesAccepted.to_string(), "DeviatesAccepted");
    }

    #[test]
    fn parse_is_case_sensitive() {
        let err = "locked".parse::<ValueSetStatus>().unwrap_err();
        assert_eq!(err.kind, "value set status");
        assert_eq!(err.value, "locked");
    }

    #[test]
    fn only_reviewer_outcomes_are_decisions() {
        assert!(VarianceStatus::DeviatesAccepted.is_decision());
        assert!(VarianceStatus::DeviatesRejected.is_decision());
        assert!(!VarianceStatus::Matches.is_decision());
        assert!(!VarianceStatus::Deviates.is_decision());
    }

    #[test]
    fn raw_value_deserializes_untagged() {
        let text: RawValue = serde_json::from_str("\"120\"").unwrap();
        let number: RawValue = serde_json::from_str("125").unwrap();
        let null: RawValue = serde_json::from_str("null").unwrap();

        assert_eq!(text, RawValue::text("120"));
        assert!(matches!(number, RawValue::Number(_)));
        assert!(null.is_null());
    }

    #[test]
    fn value_set_serializes_camel_case() {
        let vs = ValueSet {
            value_set_id: ValueSetId(2),
            sheet_id: SheetId(1),
            context: ValueSetContext::Offered,
            party_id: Some(PartyId(5)),
            status: ValueSetStatus::Draft,
        };
        let json = serde_json::to_value(&vs).unwrap();
        assert_eq!(json["valueSetId"], 2);
        assert_eq!(json["partyId"], 5);
        assert_eq!(json["context"], "Offered");
    }

    #[test]
    fn layout_field_lookup() {
        let layout = SheetLayout::new().with_subsheet(
            SubsheetLayout::new(1, "Process")
                .with_field(FieldLayout::new(101, "Flow", FieldDataType::Number).with_uom("m3/h")),
        );
        assert_eq!(layout.field(InfoTemplateId(101)).unwrap().label, "Flow");
        assert!(layout.field(InfoTemplateId(999)).is_none());
    }
}
