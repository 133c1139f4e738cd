//! Conversion of vendor field names into human-readable column labels.
//!
//! Vendor statement tables name their fields in concatenated TitleCase,
//! possibly with embedded acronyms (`"EnterpriseValueEBITDARatio"`). The
//! derived metric tables expose space-separated labels instead.

/// Turns a CamelCase identifier into space-separated words.
///
/// Two passes, in order:
///
/// 1. split an acronym from a following capitalized word:
///    `"EBITDARatio"` -> `"EBITDA Ratio"`;
/// 2. split at every lowercase/digit-to-uppercase boundary:
///    `"MarketCap"` -> `"Market Cap"`.
///
/// The function never changes the case of any character and is idempotent on
/// already-spaced input. A lone acronym (`"EBITDA"`) is left untouched.
///
/// # Examples
///
/// ```
/// use stocks_core::humanize;
///
/// assert_eq!(humanize("MarketCap"), "Market Cap");
/// assert_eq!(humanize("EnterpriseValueEBITDARatio"), "Enterprise Value EBITDA Ratio");
/// ```
#[must_use]
pub fn humanize(name: &str) -> String {
    split_digit_boundary(&split_acronym_boundary(name))
}

/// Pass 1: insert a space before the last uppercase letter of an uppercase
/// run that borders a TitleCase word.
fn split_acronym_boundary(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0
            && c.is_ascii_uppercase()
            && chars[i - 1].is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase())
        {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Pass 2: insert a space at every lowercase-or-digit to uppercase boundary.
fn split_digit_boundary(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0
            && c.is_ascii_uppercase()
            && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit())
        {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_title_case() {
        assert_eq!(humanize("MarketCap"), "Market Cap");
        assert_eq!(humanize("TotalRevenue"), "Total Revenue");
        assert_eq!(humanize("FreeCashFlowMargin"), "Free Cash Flow Margin");
    }

    #[test]
    fn test_embedded_acronym() {
        assert_eq!(humanize("EBITDARatio"), "EBITDA Ratio");
        assert_eq!(
            humanize("EnterpriseValueEBITDARatio"),
            "Enterprise Value EBITDA Ratio"
        );
    }

    #[test]
    fn test_leading_lone_acronym() {
        assert_eq!(humanize("EBITDA"), "EBITDA");
    }

    #[test]
    fn test_idempotent_on_spaced_input() {
        assert_eq!(humanize("EBITDA Ratio"), "EBITDA Ratio");
        assert_eq!(humanize("Market Cap"), "Market Cap");
        let once = humanize("EnterpriseValueEBITDARatio");
        assert_eq!(humanize(&once), once);
    }

    #[test]
    fn test_digit_boundary() {
        assert_eq!(humanize("Week52High"), "Week52 High");
    }

    #[test]
    fn test_case_preserved() {
        assert_eq!(humanize("lowercase"), "lowercase");
        assert_eq!(humanize("Date"), "Date");
    }
}
