use bigdecimal::{BigDecimal, One, Zero};
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use super::address::parse_address;
use crate::models::{
    NormalizedLineItem, NormalizedRow, RawCell, RawImportRow, RawLineItem, RowRejection,
};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());
static DMY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{4}|\d{2})$").unwrap());
static SERIAL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());
static NUMBER_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{4})/").unwrap());
static PLAIN_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").unwrap());

const MAX_SERIAL: f64 = 2_958_465.0; // 9999-12-31
const MAX_AMOUNT_LEN: usize = 32;

/// Trimmed text of a cell, None when missing or blank
pub fn cell_text(cell: Option<&RawCell>) -> Option<String> {
    cell.map(RawCell::as_text).filter(|s| !s.is_empty())
}

/// Round half-up to cents
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.round(2).with_scale(2)
}

/// Parse a German- or English-formatted amount; anything unparseable is 0.
pub fn parse_amount_str(raw: &str) -> BigDecimal {
    let cleaned: String = raw
        .replace("EUR", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '$')
        .collect();

    let canonical = if cleaned.contains('.') && cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    // plain decimal notation only: exponents and huge scales make rounding crawl
    if canonical.len() > MAX_AMOUNT_LEN || !PLAIN_AMOUNT.is_match(&canonical) {
        return BigDecimal::zero();
    }
    BigDecimal::from_str(&canonical).unwrap_or_else(|_| BigDecimal::zero())
}

pub fn parse_amount(cell: Option<&RawCell>) -> BigDecimal {
    match cell {
        Some(RawCell::Number(n)) if n.is_finite() => parse_amount_str(&n.to_string()),
        Some(RawCell::Number(_)) | None => BigDecimal::zero(),
        Some(RawCell::Text(s)) => parse_amount_str(s),
    }
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return None;
    }
    // epoch 1899-12-30 absorbs the spreadsheet 1900 leap-year bug
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DMY_DATE.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if caps[3].len() == 2 {
            year += 2000;
        }
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if SERIAL_DATE.is_match(text) {
        return text.parse::<f64>().ok().and_then(serial_to_date);
    }

    None
}

/// Parse a date cell. Never falls back to today.
pub fn parse_date(cell: Option<&RawCell>) -> Option<NaiveDate> {
    match cell? {
        RawCell::Number(n) => serial_to_date(*n),
        RawCell::Text(s) => parse_date_str(s),
    }
}

/// `MM/YYYY/...` invoice numbers date to the 15th of that month
pub fn date_from_invoice_number(invoice_number: &str) -> Option<NaiveDate> {
    let caps = NUMBER_MONTH_YEAR.captures(invoice_number.trim())?;
    let month: u32 = caps[1].parse().ok()?;
    let year: i32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 15)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Force the year, keeping month/day; no date at all becomes mid-year.
pub fn apply_target_year(date: Option<NaiveDate>, year: i32) -> Option<NaiveDate> {
    match date {
        Some(d) => d.with_year(year).or_else(|| {
            last_day_of_month(year, d.month())
        }),
        None => NaiveDate::from_ymd_opt(year, 6, 15),
    }
}

/// Parsed date, else derived from the invoice number, then the year override.
pub fn resolve_invoice_date(
    cell: Option<&RawCell>,
    invoice_number: &str,
    target_year: Option<i32>,
) -> Option<NaiveDate> {
    let date = parse_date(cell).or_else(|| date_from_invoice_number(invoice_number));
    match target_year {
        Some(year) => apply_target_year(date, year),
        None => date,
    }
}

fn normalize_item(item: &RawLineItem, position: usize) -> Option<NormalizedLineItem> {
    let description = item
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let quantity = match item.quantity.as_ref() {
        Some(cell) => parse_amount(Some(cell)),
        None => BigDecimal::one(),
    };
    let unit_price = parse_amount(item.unit_price.as_ref());
    let total = match item.total.as_ref() {
        Some(cell) => parse_amount(Some(cell)),
        None => &quantity * &unit_price,
    };

    if description.is_none() && total.is_zero() {
        return None;
    }

    Some(NormalizedLineItem {
        description: description.unwrap_or_else(|| format!("Position {}", position)),
        quantity,
        unit_price: round_money(&unit_price),
        total: round_money(&total),
    })
}

/// Strict parse step: a validated row, or the reason it cannot be imported.
pub fn normalize_row(
    raw: &RawImportRow,
    row_number: usize,
    target_year: Option<i32>,
) -> Result<NormalizedRow, RowRejection> {
    let customer_name = cell_text(raw.name.as_ref()).unwrap_or_default();
    let invoice_number = cell_text(raw.invoice_number.as_ref()).unwrap_or_default();

    let missing_field = if customer_name.is_empty() {
        Some("Name")
    } else if invoice_number.is_empty() {
        Some("Rechnungsnummer")
    } else {
        None
    };
    if let Some(missing_field) = missing_field {
        return Err(RowRejection {
            row_number,
            invoice_number,
            customer_name,
            missing_field,
        });
    }

    let items = raw
        .items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| normalize_item(item, idx + 1))
        .collect();

    Ok(NormalizedRow {
        row_number,
        address: cell_text(raw.address.as_ref()).map(|a| parse_address(&a)),
        email: cell_text(raw.email.as_ref()),
        phone: cell_text(raw.phone.as_ref()),
        country: cell_text(raw.country.as_ref()).map(|c| c.to_uppercase()),
        vat_id: cell_text(raw.vat_id.as_ref()).map(|v| v.replace(' ', "").to_uppercase()),
        invoice_date: resolve_invoice_date(raw.invoice_date.as_ref(), &invoice_number, target_year),
        net_amount: round_money(&parse_amount(raw.net_amount.as_ref())),
        gross_amount: round_money(&parse_amount(raw.gross_amount.as_ref())),
        customer_name,
        invoice_number,
        items,
    })
}
