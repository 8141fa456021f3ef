use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ParsedAddress;

/// Location used when nothing could be extracted
pub const UNKNOWN_LOCATION: &str = "Unbekannt";

static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\D)(\d{5})(?:\D|$)").unwrap());
static LEADING_POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{5}\s*").unwrap());
static COUNTRY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(([A-Za-z]{2})\)\s*$").unwrap());

/// First 5-digit token, or empty
pub fn extract_postal_code(address: &str) -> String {
    POSTAL_CODE
        .captures(address)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// City/locality from the last comma segment, or `Unbekannt`
pub fn extract_location(address: &str) -> String {
    parse_address(address).location
}

/// Best-effort split of a "street, postal-code city" address.
/// Addresses in other orders produce partial or wrong fields.
pub fn parse_address(address: &str) -> ParsedAddress {
    let raw = address.trim().to_string();

    let country = COUNTRY_SUFFIX
        .captures(&raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase());
    let body = COUNTRY_SUFFIX.replace(&raw, "").trim().to_string();

    let segments: Vec<&str> = body.split(',').map(str::trim).collect();
    let last = segments.last().copied().unwrap_or("");

    let (street, location) = if LEADING_POSTAL_CODE.is_match(last) {
        let location = LEADING_POSTAL_CODE.replace(last, "").trim().to_string();
        (segments[..segments.len() - 1].join(", "), location)
    } else if let Some(m) = POSTAL_CODE.captures(last).and_then(|c| c.get(1)) {
        let before = last[..m.start()].trim();
        let after = last[m.end()..].trim();
        let mut street_parts: Vec<&str> = segments[..segments.len() - 1].to_vec();
        if !after.is_empty() {
            // "Street 5 12345 City" without a comma
            if !before.is_empty() {
                street_parts.push(before);
            }
            (street_parts.join(", "), after.to_string())
        } else if !street_parts.is_empty() && !before.is_empty() {
            // "Street 5, City 12345"
            (street_parts.join(", "), before.to_string())
        } else {
            (street_parts.join(", "), String::new())
        }
    } else if segments.len() > 1 {
        (segments[..segments.len() - 1].join(", "), last.to_string())
    } else {
        (String::new(), last.to_string())
    };

    let location = if location.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        location
    };

    ParsedAddress {
        postal_code: extract_postal_code(&body),
        street: street.trim().to_string(),
        location,
        country,
        raw,
    }
}
