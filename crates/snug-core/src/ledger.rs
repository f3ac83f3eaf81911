//! # Ledger State
//!
//! Each company owns at most one ledger-state document: the accounting
//! export (SIE) its members collaborate on. The document moves through two
//! states:
//!
//! ```text
//! ABSENT ──write──▶ PRESENT(version = 1) ──write──▶ PRESENT(version = v + 1)
//! ```
//!
//! The row is created lazily on the first write, never at company creation.
//! Reading an ABSENT document yields [`LedgerSnapshot::empty`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{CompanyId, UserId};

/// The stored ledger-state row of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Owning company; unique across rows.
    pub company_id: CompanyId,
    /// The ledger document.
    pub content: String,
    /// Write counter. 1 after the first write, +1 on every later write.
    pub version: i64,
    /// Last writer. Absent only on rows carried over from before writers
    /// were recorded.
    pub updated_by: Option<UserId>,
    /// Time of the last write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// The version the next successful write will produce.
    pub fn next_version(current: Option<&LedgerState>) -> i64 {
        current.map_or(0, |s| s.version) + 1
    }
}

/// What a read returns: the document, or an empty value when none exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Company the snapshot belongs to.
    pub company_id: CompanyId,
    /// Document content, absent before the first write.
    pub content: Option<String>,
    /// Current version, absent before the first write.
    pub version: Option<i64>,
    /// Time of the last write.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last writer.
    pub updated_by: Option<UserId>,
}

impl LedgerSnapshot {
    /// The snapshot of a company that has never written a ledger state.
    pub fn empty(company_id: CompanyId) -> Self {
        Self {
            company_id,
            content: None,
            version: None,
            updated_at: None,
            updated_by: None,
        }
    }

    /// Whether the document is ABSENT.
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
    }
}

impl From<LedgerState> for LedgerSnapshot {
    fn from(state: LedgerState) -> Self {
        Self {
            company_id: state.company_id,
            content: Some(state.content),
            version: Some(state.version),
            updated_at: state.updated_at,
            updated_by: state.updated_by,
        }
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerWriteReceipt {
    /// Company written to.
    pub company_id: CompanyId,
    /// The version the write produced.
    pub version: i64,
    /// Commit time recorded on the row.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(version: i64) -> LedgerState {
        LedgerState {
            company_id: CompanyId::new(1),
            content: "#SIE".to_string(),
            version,
            updated_by: Some(UserId::new(1)),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn first_write_is_version_one() {
        assert_eq!(LedgerState::next_version(None), 1);
    }

    #[test]
    fn later_writes_increment_by_one() {
        assert_eq!(LedgerState::next_version(Some(&state(2))), 3);
    }

    #[test]
    fn empty_snapshot_has_no_content_or_version() {
        let snap = LedgerSnapshot::empty(CompanyId::new(5));
        assert!(snap.is_empty());
        assert!(snap.content.is_none());
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json["content"].is_null());
        assert!(json["version"].is_null());
    }

    #[test]
    fn snapshot_from_state_carries_everything() {
        let snap = LedgerSnapshot::from(state(4));
        assert_eq!(snap.version, Some(4));
        assert_eq!(snap.content.as_deref(), Some("#SIE"));
        assert!(!snap.is_empty());
    }
}
