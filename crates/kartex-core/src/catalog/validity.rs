//! Validity predicates applied to normalized values.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ADDRESS_MARKERS: Regex = Regex::new(
        r"(?i)\d{6}|город|\bг\.?\s|\bг\.|обл|респ|край|федерац|\bул\.?\s|улиц|проспект|шоссе|переул|\bд\.?\s*\d|\bдом\b"
    ).unwrap();

    static ref DESCRIPTIVE_ADDRESS: Regex = Regex::new(
        r"(?i)соответстви|учредительн|^\s*\([^)]*\)\s*$"
    ).unwrap();

    static ref PERSON_NAME: Regex = Regex::new(
        r"^[А-ЯЁA-Z][а-яёa-z-]+(?:\s+[А-ЯЁA-Z][а-яёa-z-]+){1,2}$"
    ).unwrap();

    static ref PHONE_CANONICAL: Regex = Regex::new(
        r"^\+7 \(\d{3}\) \d{3}-\d{2}-\d{2}$"
    ).unwrap();

    static ref EMAIL_SHAPE: Regex = Regex::new(
        r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$"
    ).unwrap();
}

/// Document headers and labels that OCR tends to hand over as a name.
const NOT_A_NAME: &[&str] = &[
    "карточк",
    "документ",
    "проект",
    "наименование",
    "основная информация",
    "сведения о компании",
    "реквизиты компании",
];

/// Bare legal-form tokens that are not a bank name on their own.
const NOT_A_BANK: &[&str] = &["ао", "пао", "ооо", "банк", "банка"];

/// Predicate a normalized value must satisfy to be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// ASCII digits only, length in the field's set, optional prefix set.
    Digits { prefixes: &'static [&'static str] },
    /// 3-200 characters with a letter, not a document header.
    OrganizationName,
    /// 2-120 characters with a letter, not a bare legal form.
    BankName,
    /// 10-300 characters carrying a geographic marker.
    Address,
    /// Two or three capitalized words.
    PersonName,
    /// Canonical Russian phone number.
    Phone,
    /// Plain e-mail address.
    Email,
}

impl Validity {
    /// Evaluate the predicate. `lengths` comes from the field spec.
    pub fn check(&self, value: &str, lengths: &[usize]) -> bool {
        if value.is_empty() {
            return false;
        }

        match self {
            Validity::Digits { prefixes } => {
                value.chars().all(|c| c.is_ascii_digit())
                    && lengths.contains(&value.len())
                    && (prefixes.is_empty() || prefixes.iter().any(|p| value.starts_with(p)))
            }
            Validity::OrganizationName => {
                let len = value.chars().count();
                let lower = value.to_lowercase();
                (3..=200).contains(&len)
                    && value.chars().any(char::is_alphabetic)
                    && !NOT_A_NAME.iter().any(|h| lower.contains(h))
            }
            Validity::BankName => {
                let len = value.chars().count();
                let lower = value.to_lowercase();
                (2..=120).contains(&len)
                    && value.chars().any(char::is_alphabetic)
                    && !NOT_A_BANK.contains(&lower.as_str())
            }
            Validity::Address => {
                let len = value.chars().count();
                (10..=300).contains(&len)
                    && ADDRESS_MARKERS.is_match(value)
                    && !DESCRIPTIVE_ADDRESS.is_match(value)
            }
            Validity::PersonName => value.chars().count() >= 5 && PERSON_NAME.is_match(value),
            Validity::Phone => PHONE_CANONICAL.is_match(value),
            Validity::Email => EMAIL_SHAPE.is_match(value),
        }
    }
}
