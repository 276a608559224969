//! Normalization of raw captures into canonical field values.

/// Quote characters OCR leaves around organization names.
const QUOTES: &[char] = &['"', '\'', '«', '»', '“', '”', '„'];

/// How a raw capture is turned into a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Strip whitespace, hyphens, underscores and periods. Other characters
    /// are kept so the validity check can reject OCR letter artefacts.
    Digits,
    /// Collapse whitespace, trim surrounding quotes.
    Name,
    /// Like `Name`, and drop a leading `в ` ("at") left over from phrases
    /// such as `в ПАО Сбербанк`.
    BankName,
    /// Collapse whitespace, including line breaks.
    Text,
    /// Join wrapped lines and trim trailing separators.
    Address,
    /// Canonical `+7 (XXX) XXX-XX-XX`, with a trunk `8` replaced by `7`.
    Phone,
    /// Trim and lowercase.
    Email,
}

impl Normalization {
    /// Apply the rule to a raw capture.
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Normalization::Digits => raw
                .chars()
                .filter(|&c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
                .collect(),
            Normalization::Name => trim_quotes(&collapse_whitespace(raw)),
            Normalization::BankName => {
                let name = trim_quotes(&collapse_whitespace(raw));
                match name.strip_prefix("в ") {
                    Some(rest) => trim_quotes(rest),
                    None => name,
                }
            }
            Normalization::Text => collapse_whitespace(raw),
            Normalization::Address => collapse_whitespace(raw)
                .trim_end_matches([',', ';', ' '])
                .to_string(),
            Normalization::Phone => format_phone(raw),
            Normalization::Email => raw.trim().to_lowercase(),
        }
    }
}

/// Replace every whitespace run with a single space and trim.
pub(crate) fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_quotes(value: &str) -> String {
    value.trim_matches(QUOTES).trim().to_string()
}

fn format_phone(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 10 {
        digits.insert(0, '7');
    } else if digits.len() == 11 && digits.starts_with('8') {
        digits.replace_range(0..1, "7");
    }

    if digits.len() != 11 || !digits.starts_with('7') {
        return digits;
    }

    format!(
        "+7 ({}) {}-{}-{}",
        &digits[1..4],
        &digits[4..7],
        &digits[7..9],
        &digits[9..11]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_digits_strips_separators_only() {
        assert_eq!(Normalization::Digits.apply(" 770-123_45.67 "), "7701234567");
        assert_eq!(Normalization::Digits.apply("77O1234567"), "77O1234567");
    }

    #[test]
    fn test_name_trims_quotes() {
        assert_eq!(Normalization::Name.apply("«Трубный  Поток»"), "Трубный Поток");
        assert_eq!(Normalization::Name.apply("\"ПАРТНЕР\"\n"), "ПАРТНЕР");
    }

    #[test]
    fn test_bank_name_drops_leading_preposition() {
        assert_eq!(Normalization::BankName.apply("в ПАО Сбербанк"), "ПАО Сбербанк");
        assert_eq!(
            Normalization::BankName.apply("АО Банк Русский Стандарт»"),
            "АО Банк Русский Стандарт"
        );
    }

    #[test]
    fn test_address_joins_wrapped_lines() {
        let raw = "625041, г Тюмень, ул Бакинских\nКомиссаров, д. 1, помещ. 6,";
        assert_eq!(
            Normalization::Address.apply(raw),
            "625041, г Тюмень, ул Бакинских Комиссаров, д. 1, помещ. 6"
        );
    }

    #[test]
    fn test_phone_canonical_form() {
        assert_eq!(Normalization::Phone.apply("89524003627"), "+7 (952) 400-36-27");
        assert_eq!(Normalization::Phone.apply("+7 (495) 123-45-67"), "+7 (495) 123-45-67");
        assert_eq!(Normalization::Phone.apply("+7 (8442) 12-34-56"), "+7 (844) 212-34-56");
        assert_eq!(Normalization::Phone.apply("9524003627"), "+7 (952) 400-36-27");
        assert_eq!(Normalization::Phone.apply("12-34"), "1234");
    }

    #[test]
    fn test_email_lowercases() {
        assert_eq!(Normalization::Email.apply(" Info@Partner.RU "), "info@partner.ru");
    }
}
