//! Hash-chained audit trail of value-set mutations

use crate::types::{AccountId, SheetId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of recorded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// A value set was created
    ValueSetCreated,
    /// A value set changed status
    StatusTransitioned,
    /// A field value was written
    FieldValueSet,
    /// A reviewer decided on a deviation
    VarianceDecided,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::ValueSetCreated => "ValueSetCreated",
            AuditAction::StatusTransitioned => "StatusTransitioned",
            AuditAction::FieldValueSet => "FieldValueSet",
            AuditAction::VarianceDecided => "VarianceDecided",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub sheet_id: SheetId,
    pub account_id: AccountId,
    pub action: AuditAction,
    pub detail: String,
    pub prev_hash: String,
    pub hash: String,
}

/// Audit chain integrity failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("audit chain broken at sequence {sequence}")]
pub struct IntegrityViolation {
    /// First event that fails verification
    pub sequence: u64,
}

const GENESIS: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Append-only audit log
///
/// Records live in process memory and are never evicted, so the log grows
/// for as long as the engine runs and is lost on restart. It shares the
/// lifetime of the in-memory value-set store it audits.
#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl AuditLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, linking it to the previous one
    pub fn append(
        &self,
        sheet_id: SheetId,
        account_id: AccountId,
        action: AuditAction,
        detail: impl Into<String>,
    ) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard
            .last()
            .map_or_else(|| GENESIS.to_string(), |e| e.hash.clone());
        let mut event = AuditEvent {
            sequence: guard.len() as u64 + 1,
            timestamp: Utc::now(),
            sheet_id,
            account_id,
            action,
            detail: detail.into(),
            prev_hash,
            hash: String::new(),
        };
        event.hash = compute_hash(&event);
        let sequence = event.sequence;
        guard.push(event);
        sequence
    }

    /// Records touching one sheet, oldest first
    pub fn events_for_sheet(&self, sheet: SheetId) -> Vec<AuditEvent> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.sheet_id == sheet)
            .cloned()
            .collect()
    }

    /// Total records
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Recompute every link of the chain
    ///
    /// # Errors
    /// `IntegrityViolation` naming the first record whose link or hash is wrong.
    pub fn verify_integrity(&self) -> Result<(), IntegrityViolation> {
        let guard = self.inner.lock();
        let mut prev = GENESIS.to_string();
        for e in guard.iter() {
            if e.prev_hash != prev || e.hash != compute_hash(e) {
                return Err(IntegrityViolation {
                    sequence: e.sequence,
                });
            }
            prev = e.hash.clone();
        }
        Ok(())
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, detail: &str) {
        self.inner.lock()[index].detail = detail.to_string();
    }
}

fn compute_hash(event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.sequence.to_le_bytes());
    hasher.update(event.timestamp.to_rfc3339().as_bytes());
    hasher.update([0]);
    hasher.update(event.sheet_id.get().to_le_bytes());
    hasher.update(event.account_id.get().to_le_bytes());
    hasher.update(event.action.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}
