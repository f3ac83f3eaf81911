//! # Company Records
//!
//! Companies are keyed by a globally unique organization number (the
//! externally issued business identifier). Uniqueness itself is enforced
//! by the directory and the database; this module guarantees the number
//! is never blank once it has been constructed.
//!
//! Column widths follow the `companies` table: organization numbers up to
//! 20 characters, VAT numbers up to 50, fiscal-year bounds up to 10
//! (`MM-DD` or `YYYY-MM-DD`), and free-text address fields up to 255.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::CompanyId;

const MAX_NAME: usize = 255;
const MAX_ORGANIZATION_NUMBER: usize = 20;
const MAX_POSTAL_CODE: usize = 20;
const MAX_VAT_NUMBER: usize = 50;
const MAX_FISCAL_BOUND: usize = 10;

/// Trim a required field and enforce its width.
pub(crate) fn required_text(value: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field, mapping blank to `None`, and enforce its width.
pub(crate) fn optional_text(
    value: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Validated organization number: trimmed, non-blank, at most 20 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganizationNumber(String);

impl OrganizationNumber {
    /// Validate and wrap an organization number.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        required_text(value.as_ref(), "organization_number", MAX_ORGANIZATION_NUMBER).map(Self)
    }

    /// The number as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrganizationNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrganizationNumber> for String {
    fn from(value: OrganizationNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for OrganizationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Swedish accounting framework the company reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountingStandard {
    /// Simplified framework for smaller companies.
    K2,
    /// Full framework.
    K3,
}

impl AccountingStandard {
    /// Return the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::K2 => "K2",
            Self::K3 => "K3",
        }
    }
}

impl FromStr for AccountingStandard {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "K2" => Ok(Self::K2),
            "K3" => Ok(Self::K3),
            other => Err(ValidationError::InvalidAccountingStandard(other.to_string())),
        }
    }
}

/// Address and accounting metadata of a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Street address.
    pub address: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// VAT registration number.
    pub vat_number: Option<String>,
    /// First day of the fiscal year.
    pub fiscal_year_start: Option<String>,
    /// Last day of the fiscal year.
    pub fiscal_year_end: Option<String>,
    /// Reporting framework.
    pub accounting_standard: Option<AccountingStandard>,
}

impl CompanyProfile {
    /// Trim every field, map blanks to `None`, and enforce column widths.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        Ok(Self {
            address: optional_text(self.address.as_deref(), "address", MAX_NAME)?,
            postal_code: optional_text(self.postal_code.as_deref(), "postal_code", MAX_POSTAL_CODE)?,
            city: optional_text(self.city.as_deref(), "city", MAX_NAME)?,
            country: optional_text(self.country.as_deref(), "country", MAX_NAME)?,
            vat_number: optional_text(self.vat_number.as_deref(), "vat_number", MAX_VAT_NUMBER)?,
            fiscal_year_start: optional_text(
                self.fiscal_year_start.as_deref(),
                "fiscal_year_start",
                MAX_FISCAL_BOUND,
            )?,
            fiscal_year_end: optional_text(
                self.fiscal_year_end.as_deref(),
                "fiscal_year_end",
                MAX_FISCAL_BOUND,
            )?,
            accounting_standard: self.accounting_standard,
        })
    }
}

/// A validated request to create a company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    /// Display name.
    pub name: String,
    /// Organization number; mandatory at creation.
    pub organization_number: OrganizationNumber,
    /// Address and accounting metadata.
    pub profile: CompanyProfile,
}

impl NewCompany {
    /// Validate the raw creation inputs.
    ///
    /// Fails with [`ValidationError::Blank`] when the name or the
    /// organization number is blank.
    pub fn new(name: &str, organization_number: &str, profile: CompanyProfile) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text(name, "name", MAX_NAME)?,
            organization_number: OrganizationNumber::new(organization_number)?,
            profile: profile.normalized()?,
        })
    }
}

/// A validated full replacement of a company's mutable fields.
///
/// `organization_number: None` keeps the stored number; a present value
/// replaces it and is subject to the uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyUpdate {
    /// New display name.
    pub name: String,
    /// Replacement organization number, if changing.
    pub organization_number: Option<OrganizationNumber>,
    /// Replacement metadata.
    pub profile: CompanyProfile,
}

impl CompanyUpdate {
    /// Validate the raw update inputs. A supplied but blank organization
    /// number is rejected rather than treated as "unchanged".
    pub fn new(
        name: &str,
        organization_number: Option<&str>,
        profile: CompanyProfile,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text(name, "name", MAX_NAME)?,
            organization_number: organization_number.map(OrganizationNumber::new).transpose()?,
            profile: profile.normalized()?,
        })
    }
}

/// A company as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Directory identifier.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// Organization number. Only rows predating the uniqueness constraint
    /// can lack one.
    pub organization_number: Option<OrganizationNumber>,
    /// Address and accounting metadata.
    #[serde(flatten)]
    pub profile: CompanyProfile,
    /// When the company was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_organization_number_is_rejected() {
        let err = NewCompany::new("Acme", "   ", CompanyProfile::default()).unwrap_err();
        assert_eq!(err, ValidationError::Blank("organization_number"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = NewCompany::new("", "556-001", CompanyProfile::default()).unwrap_err();
        assert_eq!(err, ValidationError::Blank("name"));
    }

    #[test]
    fn organization_number_is_trimmed() {
        let company = NewCompany::new(" Acme ", " 556-001 ", CompanyProfile::default()).unwrap();
        assert_eq!(company.name, "Acme");
        assert_eq!(company.organization_number.as_str(), "556-001");
    }

    #[test]
    fn organization_number_width_is_enforced() {
        let err = OrganizationNumber::new("1".repeat(21)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 20, .. }));
    }

    #[test]
    fn profile_blanks_become_none() {
        let profile = CompanyProfile {
            city: Some("  ".to_string()),
            country: Some(" Sverige ".to_string()),
            ..CompanyProfile::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(profile.city, None);
        assert_eq!(profile.country.as_deref(), Some("Sverige"));
    }

    #[test]
    fn update_with_blank_organization_number_is_rejected() {
        let err = CompanyUpdate::new("Acme", Some(""), CompanyProfile::default()).unwrap_err();
        assert_eq!(err, ValidationError::Blank("organization_number"));
        let keep = CompanyUpdate::new("Acme", None, CompanyProfile::default()).unwrap();
        assert!(keep.organization_number.is_none());
    }

    #[test]
    fn accounting_standard_parses() {
        assert_eq!("K3".parse::<AccountingStandard>().unwrap(), AccountingStandard::K3);
        assert!("K4".parse::<AccountingStandard>().is_err());
    }

    #[test]
    fn organization_number_deserialization_validates() {
        assert!(serde_json::from_str::<OrganizationNumber>("\"\"").is_err());
        let ok: OrganizationNumber = serde_json::from_str("\"556-001\"").unwrap();
        assert_eq!(ok.as_str(), "556-001");
    }
}
