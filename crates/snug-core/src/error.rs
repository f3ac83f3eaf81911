//! # Error Types
//!
//! Domain-level errors shared by every crate, built with `thiserror`.
//!
//! [`ValidationError`] carries the offending input so operators can diagnose
//! bad requests without guesswork. [`AccessDenied`] deliberately does not:
//! its `Display` is identical whether the caller has no membership or an
//! insufficient role, so the distinction never reaches a client.

use thiserror::Error;

/// Validation failures for domain values and request payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("{0} must not be blank")]
    Blank(&'static str),

    /// A text field exceeded its column width.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name as exposed to clients.
        field: &'static str,
        /// Maximum accepted length.
        max: usize,
    },

    /// Email address does not look like `local@domain`.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// Unknown membership role string.
    #[error("invalid membership role: \"{0}\" (expected OWNER, ADMIN or MEMBER)")]
    InvalidMembershipRole(String),

    /// Unknown membership status string.
    #[error("invalid membership status: \"{0}\" (expected ACTIVE or REMOVED)")]
    InvalidMembershipStatus(String),

    /// Unknown user role string.
    #[error("invalid user role: \"{0}\" (expected user or admin)")]
    InvalidUserRole(String),

    /// Unknown accounting standard string.
    #[error("invalid accounting standard: \"{0}\" (expected K2 or K3)")]
    InvalidAccountingStandard(String),

    /// Unknown customer kind string.
    #[error("invalid customer kind: \"{0}\" (expected private or company)")]
    InvalidCustomerKind(String),

    /// A numeric field was negative, NaN, or infinite.
    #[error("{0} must be a finite, non-negative number")]
    InvalidAmount(&'static str),
}

/// Why an access check refused a caller.
///
/// Kept for logging only; never rendered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No membership row exists for the (company, user) pair.
    NoMembership,
    /// A membership exists but is not ACTIVE.
    Inactive,
    /// The membership is active but its role is below the required level.
    InsufficientRole,
}

impl DenialReason {
    /// Short label for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMembership => "no_membership",
            Self::Inactive => "inactive",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

/// A company-scoped operation was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("access denied")]
pub struct AccessDenied {
    reason: DenialReason,
}

impl AccessDenied {
    /// Build a refusal with the given (private) reason.
    pub fn new(reason: DenialReason) -> Self {
        Self { reason }
    }

    /// The underlying reason, for operator logs.
    pub fn reason(&self) -> DenialReason {
        self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_display_hides_reason() {
        let a = AccessDenied::new(DenialReason::NoMembership);
        let b = AccessDenied::new(DenialReason::InsufficientRole);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "access denied");
        assert_ne!(a.reason(), b.reason());
    }

    #[test]
    fn validation_messages_carry_context() {
        let err = ValidationError::Blank("organization_number");
        assert!(err.to_string().contains("organization_number"));

        let err = ValidationError::TooLong {
            field: "accounting_standard",
            max: 2,
        };
        assert!(err.to_string().contains('2'));

        let err = ValidationError::InvalidMembershipRole("GOD".to_string());
        assert!(err.to_string().contains("GOD"));
    }

    #[test]
    fn denial_reason_labels() {
        assert_eq!(DenialReason::NoMembership.as_str(), "no_membership");
        assert_eq!(DenialReason::Inactive.as_str(), "inactive");
        assert_eq!(DenialReason::InsufficientRole.as_str(), "insufficient_role");
    }
}
