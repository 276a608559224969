//! Field catalog: the static description of every extractable field.
//!
//! Each entry fixes the field's expected shape (digit lengths for numeric
//! identifiers), how a raw capture is normalized, which predicate a
//! normalized value must pass, and the contextual fallback used when no
//! registered pattern yields a valid value.

mod normalize;
mod validity;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use normalize::Normalization;
pub use validity::Validity;

/// Identifier of an extractable field.
///
/// Declaration order is catalog order; the orchestrator visits fields in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    /// Short company name without legal form (e.g. `ПАРТНЕР`).
    CompanyName,
    /// Full name including the legal form (e.g. `ООО "ПАРТНЕР"`).
    LegalFormName,
    /// Taxpayer id (ИНН), 10 digits for companies, 12 for individuals.
    TaxId,
    /// Registration reason code (КПП), 9 digits.
    ReasonCode,
    /// State registration number (ОГРН 13 digits, ОГРНИП 15 digits).
    RegistrationNumber,
    /// Legal or postal address.
    Address,
    /// Name of the servicing bank.
    BankName,
    /// Settlement account, 20 digits starting with `40`.
    BankAccount,
    /// Bank correspondent account, 19-20 digits starting with `30`.
    CorrespondentAccount,
    /// Bank routing code (БИК), 9 digits starting with `04`.
    RoutingCode,
    /// Contact phone, canonical `+7 (XXX) XXX-XX-XX`.
    Phone,
    /// Contact e-mail.
    Email,
    /// Director or other signing officer.
    Director,
}

impl FieldId {
    /// All fields in catalog order.
    pub const ALL: [FieldId; 13] = [
        FieldId::CompanyName,
        FieldId::LegalFormName,
        FieldId::TaxId,
        FieldId::ReasonCode,
        FieldId::RegistrationNumber,
        FieldId::Address,
        FieldId::BankName,
        FieldId::BankAccount,
        FieldId::CorrespondentAccount,
        FieldId::RoutingCode,
        FieldId::Phone,
        FieldId::Email,
        FieldId::Director,
    ];

    /// Stable snake_case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::CompanyName => "company_name",
            FieldId::LegalFormName => "legal_form_name",
            FieldId::TaxId => "tax_id",
            FieldId::ReasonCode => "reason_code",
            FieldId::RegistrationNumber => "registration_number",
            FieldId::Address => "address",
            FieldId::BankName => "bank_name",
            FieldId::BankAccount => "bank_account",
            FieldId::CorrespondentAccount => "correspondent_account",
            FieldId::RoutingCode => "routing_code",
            FieldId::Phone => "phone",
            FieldId::Email => "email",
            FieldId::Director => "director",
        }
    }

    /// Catalog entry for this field.
    pub fn spec(&self) -> &'static FieldSpec {
        &CATALOG[*self as usize]
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown field: {}", s))
    }
}

/// Which token of an adjacent numeric pair a fallback yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSlot {
    First,
    Second,
}

/// Contextual heuristic tried only after every registered pattern failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Two numeric tokens separated by `/`, `\` or whitespace, such as an
    /// unlabeled `ИНН / КПП` pair.
    AdjacentPair {
        first: &'static [usize],
        second: &'static [usize],
        take: PairSlot,
    },
    /// A standalone numeric token accepted by the field's validity rule.
    IsolatedNumber,
    /// Any phone-shaped token.
    Phone,
    /// Any bare e-mail address.
    Email,
}

/// Static description of one field.
#[derive(Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    /// Allowed digit counts; empty for free-text fields.
    pub lengths: &'static [usize],
    pub normalization: Normalization,
    pub validity: Validity,
    pub fallback: Option<Fallback>,
}

impl FieldSpec {
    /// Normalize a raw capture.
    pub fn normalize(&self, raw: &str) -> String {
        self.normalization.apply(raw)
    }

    /// Check a normalized value against the field's predicate.
    pub fn is_valid(&self, value: &str) -> bool {
        self.validity.check(value, self.lengths)
    }

    /// Whether an extracted value equals a hand-written expectation.
    ///
    /// The expectation goes through the same normalization as captures, and
    /// both sides are case-folded so OCR casing noise does not count.
    pub fn matches_expected(&self, actual: &str, expected: &str) -> bool {
        self.normalize(expected).to_lowercase() == actual.to_lowercase()
    }

    /// Whether the field holds a numeric identifier.
    pub fn is_numeric(&self) -> bool {
        !self.lengths.is_empty()
    }
}

/// The catalog, indexed by `FieldId as usize`.
pub static CATALOG: [FieldSpec; 13] = [
    FieldSpec {
        id: FieldId::CompanyName,
        lengths: &[],
        normalization: Normalization::Name,
        validity: Validity::OrganizationName,
        fallback: None,
    },
    FieldSpec {
        id: FieldId::LegalFormName,
        lengths: &[],
        normalization: Normalization::Text,
        validity: Validity::OrganizationName,
        fallback: None,
    },
    FieldSpec {
        id: FieldId::TaxId,
        lengths: &[10, 12],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &[] },
        fallback: Some(Fallback::AdjacentPair {
            first: &[10, 12],
            second: &[9],
            take: PairSlot::First,
        }),
    },
    FieldSpec {
        id: FieldId::ReasonCode,
        lengths: &[9],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &[] },
        fallback: Some(Fallback::AdjacentPair {
            first: &[10],
            second: &[9],
            take: PairSlot::Second,
        }),
    },
    FieldSpec {
        id: FieldId::RegistrationNumber,
        lengths: &[13, 15],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &[] },
        fallback: None,
    },
    FieldSpec {
        id: FieldId::Address,
        lengths: &[],
        normalization: Normalization::Address,
        validity: Validity::Address,
        fallback: None,
    },
    FieldSpec {
        id: FieldId::BankName,
        lengths: &[],
        normalization: Normalization::BankName,
        validity: Validity::BankName,
        fallback: None,
    },
    FieldSpec {
        id: FieldId::BankAccount,
        lengths: &[20],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &["40"] },
        fallback: Some(Fallback::IsolatedNumber),
    },
    FieldSpec {
        id: FieldId::CorrespondentAccount,
        lengths: &[19, 20],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &["30"] },
        fallback: Some(Fallback::IsolatedNumber),
    },
    FieldSpec {
        id: FieldId::RoutingCode,
        lengths: &[9],
        normalization: Normalization::Digits,
        validity: Validity::Digits { prefixes: &["04"] },
        fallback: Some(Fallback::IsolatedNumber),
    },
    FieldSpec {
        id: FieldId::Phone,
        lengths: &[],
        normalization: Normalization::Phone,
        validity: Validity::Phone,
        fallback: Some(Fallback::Phone),
    },
    FieldSpec {
        id: FieldId::Email,
        lengths: &[],
        normalization: Normalization::Email,
        validity: Validity::Email,
        fallback: Some(Fallback::Email),
    },
    FieldSpec {
        id: FieldId::Director,
        lengths: &[],
        normalization: Normalization::Text,
        validity: Validity::PersonName,
        fallback: None,
    },
];
