//! # Billing Records
//!
//! Customers and products used for invoicing. Both are owned by the user
//! who created them and may additionally be scoped to a company, in which
//! case every active member of that company shares them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::company::{optional_text, required_text};
use crate::error::ValidationError;
use crate::identity::{CompanyId, CustomerId, ProductId, UserId};

/// Whether a customer is a private person or a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerKind {
    /// A private person.
    Private,
    /// A company; usually carries an organization number.
    Company,
}

impl CustomerKind {
    /// Return the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Company => "company",
        }
    }
}

impl FromStr for CustomerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "company" => Ok(Self::Company),
            other => Err(ValidationError::InvalidCustomerKind(other.to_string())),
        }
    }
}

/// Validated mutable fields of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDraft {
    /// Private or company.
    pub kind: CustomerKind,
    /// Customer name.
    pub name: String,
    /// Organization number (companies only, not enforced).
    pub organization_number: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Street address.
    pub address: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
    /// Country.
    pub country: String,
}

impl CustomerDraft {
    /// Trim and validate every field.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: self.kind,
            name: required_text(&self.name, "name", 255)?,
            organization_number: optional_text(self.organization_number.as_deref(), "organization_number", 20)?,
            email: optional_text(self.email.as_deref(), "email", 255)?,
            phone: optional_text(self.phone.as_deref(), "phone", 50)?,
            address: required_text(&self.address, "address", 255)?,
            postal_code: required_text(&self.postal_code, "postal_code", 20)?,
            city: required_text(&self.city, "city", 255)?,
            country: required_text(&self.country, "country", 255)?,
        })
    }
}

/// A stored customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier.
    pub id: CustomerId,
    /// Creating user.
    pub user_id: UserId,
    /// Company scope, if shared with a company.
    pub company_id: Option<CompanyId>,
    /// Customer fields.
    #[serde(flatten)]
    pub fields: CustomerDraft,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Validated mutable fields of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Product name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Unit price.
    pub price: f64,
    /// Whether `price` already includes VAT.
    pub includes_vat: bool,
    /// VAT rate in percent (25, 12, 6, 0).
    pub vat_rate: f64,
    /// Unit label ("st", "tim", "kg").
    pub unit: Option<String>,
}

impl ProductDraft {
    /// Trim text fields and reject negative or non-finite amounts.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidAmount("price"));
        }
        if !self.vat_rate.is_finite() || self.vat_rate < 0.0 {
            return Err(ValidationError::InvalidAmount("vat_rate"));
        }
        Ok(Self {
            name: required_text(&self.name, "name", 255)?,
            description: optional_text(self.description.as_deref(), "description", 4096)?,
            price: self.price,
            includes_vat: self.includes_vat,
            vat_rate: self.vat_rate,
            unit: optional_text(self.unit.as_deref(), "unit", 20)?,
        })
    }
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Identifier.
    pub id: ProductId,
    /// Creating user.
    pub user_id: UserId,
    /// Company scope, if shared with a company.
    pub company_id: Option<CompanyId>,
    /// Product fields.
    #[serde(flatten)]
    pub fields: ProductDraft,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerDraft {
        CustomerDraft {
            kind: CustomerKind::Company,
            name: " Kund AB ".to_string(),
            organization_number: Some(String::new()),
            email: None,
            phone: None,
            address: "Storgatan 1".to_string(),
            postal_code: "111 22".to_string(),
            city: "Stockholm".to_string(),
            country: "Sverige".to_string(),
        }
    }

    #[test]
    fn customer_fields_are_trimmed() {
        let c = customer().normalized().unwrap();
        assert_eq!(c.name, "Kund AB");
        assert_eq!(c.organization_number, None);
    }

    #[test]
    fn customer_requires_address() {
        let mut c = customer();
        c.address = " ".to_string();
        assert_eq!(c.normalized().unwrap_err(), ValidationError::Blank("address"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let p = ProductDraft {
            name: "Konsulttimme".to_string(),
            description: None,
            price: -1.0,
            includes_vat: false,
            vat_rate: 25.0,
            unit: Some("tim".to_string()),
        };
        assert_eq!(p.normalized().unwrap_err(), ValidationError::InvalidAmount("price"));
    }

    #[test]
    fn customer_kind_codec() {
        assert_eq!("private".parse::<CustomerKind>().unwrap(), CustomerKind::Private);
        assert!("person".parse::<CustomerKind>().is_err());
    }
}
