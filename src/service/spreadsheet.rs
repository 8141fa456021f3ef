use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use crate::error::{AppError, Result};
use crate::models::{RawCell, RawImportRow};

const HEADER_SEARCH_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
    Xls,
}

/// Import rows read from one uploaded file
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub format: SheetFormat,
    pub rows: Vec<RawImportRow>,
    pub empty_rows_skipped: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Name,
    Address,
    InvoiceNumber,
    InvoiceDate,
    Net,
    Gross,
    Email,
    Phone,
    Country,
    VatId,
}

struct AliasSpec {
    column: Column,
    label: &'static str,
    aliases: &'static [&'static str],
}

const ALIAS_SPECS: &[AliasSpec] = &[
    AliasSpec {
        column: Column::Name,
        label: "Name",
        aliases: &["Name", "Kunde", "Kundenname"],
    },
    AliasSpec {
        column: Column::Address,
        label: "Adresse",
        aliases: &["Adresse", "Anschrift"],
    },
    AliasSpec {
        column: Column::InvoiceNumber,
        label: "Rechnungsnummer",
        aliases: &[
            "Rechnungsnummer",
            "Rechnungs-Nr.",
            "Rechnungs-Nr",
            "Rechnungsnr",
            "Rechnungsnr.",
            "Nr",
            "Nr.",
        ],
    },
    AliasSpec {
        column: Column::InvoiceDate,
        label: "Rechnungsdatum",
        aliases: &["Rechnungsdatum", "Rechnungs-Datum", "Datum"],
    },
    AliasSpec {
        column: Column::Net,
        label: "Nettosumme",
        aliases: &["Nettosumme", "Netto", "Nettobetrag"],
    },
    AliasSpec {
        column: Column::Gross,
        label: "Bruttosumme",
        aliases: &["Bruttosumme", "Brutto", "Gesamtbetrag", "Gesamtbrutto"],
    },
    AliasSpec {
        column: Column::Email,
        label: "E-Mail",
        aliases: &["E-Mail", "Email", "Mail"],
    },
    AliasSpec {
        column: Column::Phone,
        label: "Telefon",
        aliases: &["Telefon", "Tel", "Tel.", "Telefonnummer"],
    },
    AliasSpec {
        column: Column::Country,
        label: "Land",
        aliases: &["Land", "Country"],
    },
    AliasSpec {
        column: Column::VatId,
        label: "USt-IdNr",
        aliases: &["USt-IdNr", "USt-IdNr.", "UStIdNr", "USt-ID", "VAT"],
    },
];

fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

type Grid = Vec<Vec<Option<RawCell>>>;

pub fn detect_format(data: &[u8], filename: &str) -> SheetFormat {
    let lower = filename.to_lowercase();
    if lower.ends_with(".xlsx") {
        return SheetFormat::Xlsx;
    }
    if lower.ends_with(".xls") {
        return SheetFormat::Xls;
    }
    if lower.ends_with(".csv") || lower.ends_with(".txt") {
        return SheetFormat::Csv;
    }
    if data.starts_with(b"PK") {
        return SheetFormat::Xlsx;
    }
    if data.starts_with(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1") {
        return SheetFormat::Xls;
    }
    SheetFormat::Csv
}

/// Read the first sheet of an xlsx/xls workbook or a CSV file into import rows.
pub fn parse_spreadsheet(data: &[u8], filename: &str) -> Result<ParsedSheet> {
    if data.is_empty() {
        return Err(AppError::InvalidInput("Datei ist leer".to_string()));
    }

    let format = detect_format(data, filename);
    let grid = match format {
        SheetFormat::Csv => read_csv(data)?,
        SheetFormat::Xlsx => {
            let mut workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(data))
                .map_err(|e| AppError::InvalidInput(format!("Excel-Datei nicht lesbar: {}", e)))?;
            grid_from_range(&first_sheet(&mut workbook)?)
        }
        SheetFormat::Xls => {
            let mut workbook = open_workbook_from_rs::<Xls<_>, _>(Cursor::new(data))
                .map_err(|e| AppError::InvalidInput(format!("Excel-Datei nicht lesbar: {}", e)))?;
            grid_from_range(&first_sheet(&mut workbook)?)
        }
    };

    let sheet = map_grid(grid, format)?;
    tracing::info!(
        "Parsed {} ({:?}): {} rows, {} empty rows skipped",
        filename,
        format,
        sheet.rows.len(),
        sheet.empty_rows_skipped
    );
    Ok(sheet)
}

fn first_sheet<RS, R>(workbook: &mut R) -> Result<Range<Data>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_names = workbook.sheet_names().to_owned();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(AppError::InvalidInput("Excel-Datei enthält keine Tabelle".to_string()));
    };
    workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::InvalidInput(format!("Tabelle {} nicht lesbar: {}", sheet_name, e)))
}

fn data_to_cell(cell: &Data) -> Option<RawCell> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(RawCell::Number(*i as f64)),
        Data::Float(f) => Some(RawCell::Number(*f)),
        Data::DateTime(dt) => Some(RawCell::Number(dt.as_f64())),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| RawCell::Text(s.to_string()))
        }
        Data::Bool(b) => Some(RawCell::Text(b.to_string())),
        Data::Error(_) => None,
    }
}

fn grid_from_range(range: &Range<Data>) -> Grid {
    range
        .rows()
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect()
}

fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text.lines().take(HEADER_SEARCH_ROWS).collect();
    [b';', b',', b'\t', b'|']
        .into_iter()
        .max_by_key(|d| {
            sample
                .iter()
                .map(|line| line.matches(*d as char).count())
                .sum::<usize>()
        })
        .unwrap_or(b';')
}

fn read_csv(data: &[u8]) -> Result<Grid> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    let field = field.trim();
                    (!field.is_empty()).then(|| RawCell::Text(field.to_string()))
                })
                .collect(),
        );
    }
    Ok(grid)
}

fn header_mapping(row: &[Option<RawCell>]) -> HashMap<Column, usize> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (idx, cell) in row.iter().enumerate() {
        if let Some(cell) = cell {
            let key = normalize_key(&cell.as_text());
            if !key.is_empty() {
                positions.entry(key).or_insert(idx);
            }
        }
    }

    let mut mapping = HashMap::new();
    for spec in ALIAS_SPECS {
        if let Some(idx) = spec
            .aliases
            .iter()
            .find_map(|alias| positions.get(&normalize_key(alias)))
        {
            mapping.insert(spec.column, *idx);
        }
    }
    mapping
}

fn map_grid(grid: Grid, format: SheetFormat) -> Result<ParsedSheet> {
    let (header_idx, mapping) = grid
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .enumerate()
        .map(|(idx, row)| (idx, header_mapping(row)))
        .find(|(_, m)| m.contains_key(&Column::Name) && m.contains_key(&Column::InvoiceNumber))
        .ok_or_else(|| {
            AppError::InvalidInput(
                "Keine Kopfzeile mit den Spalten Name und Rechnungsnummer gefunden".to_string(),
            )
        })?;

    let mut warnings: Vec<String> = [Column::InvoiceDate, Column::Net, Column::Gross]
        .iter()
        .filter(|c| !mapping.contains_key(c))
        .filter_map(|c| ALIAS_SPECS.iter().find(|s| s.column == *c))
        .map(|s| format!("Spalte {} nicht gefunden", s.label))
        .collect();

    let mut rows = Vec::new();
    let mut empty_rows_skipped = 0;
    for (offset, row) in grid.iter().enumerate().skip(header_idx + 1) {
        if row.iter().all(Option::is_none) {
            empty_rows_skipped += 1;
            continue;
        }
        let cell = |column: Column| -> Option<RawCell> {
            mapping
                .get(&column)
                .and_then(|idx| row.get(*idx))
                .cloned()
                .flatten()
        };
        let raw = RawImportRow {
            name: cell(Column::Name),
            address: cell(Column::Address),
            invoice_number: cell(Column::InvoiceNumber),
            invoice_date: cell(Column::InvoiceDate),
            net_amount: cell(Column::Net),
            gross_amount: cell(Column::Gross),
            email: cell(Column::Email),
            phone: cell(Column::Phone),
            country: cell(Column::Country),
            vat_id: cell(Column::VatId),
            items: Vec::new(),
        };
        if raw.name.is_none() && raw.invoice_number.is_none() {
            warnings.push(format!("Zeile {}: weder Name noch Rechnungsnummer", offset + 1));
        }
        rows.push(raw);
    }

    if rows.is_empty() {
        return Err(AppError::InvalidInput("Datei enthält keine Datenzeilen".to_string()));
    }

    Ok(ParsedSheet {
        format,
        rows,
        empty_rows_skipped,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_extension_then_magic() {
        assert_eq!(detect_format(b"a;b", "rechnungen.CSV"), SheetFormat::Csv);
        assert_eq!(detect_format(b"PK\x03\x04", "upload"), SheetFormat::Xlsx);
        assert_eq!(
            detect_format(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1rest", "upload.bin"),
            SheetFormat::Xls
        );
        assert_eq!(detect_format(b"Name;Nr", "upload"), SheetFormat::Csv);
    }

    #[test]
    fn csv_with_title_row_and_german_headers() {
        let csv = "Rechnungsliste 2020;;;;\n\
                   Name;Adresse;Rechnungs-Nr.;Datum;Netto;Brutto\n\
                   Eisdiele Sommer;Sonnenallee 10, 10999 Berlin;01/2020/001;;850,00;1.011,50\n\
                   ;;;;;\n\
                   Kiosk am See;;02/2020/002;03.02.2020;10;11,90\n";
        let sheet = parse_spreadsheet(csv.as_bytes(), "liste.csv").unwrap();
        assert_eq!(sheet.format, SheetFormat::Csv);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.empty_rows_skipped, 1);
        assert!(sheet.warnings.is_empty());

        let first = &sheet.rows[0];
        assert_eq!(first.name, Some(RawCell::from("Eisdiele Sommer")));
        assert_eq!(first.invoice_number, Some(RawCell::from("01/2020/001")));
        assert_eq!(first.invoice_date, None);
        assert_eq!(first.gross_amount, Some(RawCell::from("1.011,50")));
    }

    #[test]
    fn header_aliases_are_case_and_space_insensitive() {
        let row = vec![
            Some(RawCell::from("  NAME ")),
            Some(RawCell::from("Rechnungs nr")),
            Some(RawCell::from("Gesamtbrutto")),
            Some(RawCell::from("e-mail")),
            None,
            Some(RawCell::from("USt-IdNr.")),
        ];
        let mapping = header_mapping(&row);
        assert_eq!(mapping.get(&Column::Name), Some(&0));
        assert_eq!(mapping.get(&Column::InvoiceNumber), Some(&1));
        assert_eq!(mapping.get(&Column::Gross), Some(&2));
        assert_eq!(mapping.get(&Column::Email), Some(&3));
        assert_eq!(mapping.get(&Column::VatId), Some(&5));
    }

    #[test]
    fn missing_optional_columns_are_reported() {
        let csv = "Name,Rechnungsnummer\nKiosk,RE-1\n";
        let sheet = parse_spreadsheet(csv.as_bytes(), "x.csv").unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.warnings.len(), 3);
    }

    #[test]
    fn file_without_header_is_rejected() {
        let csv = "foo;bar\n1;2\n";
        assert!(matches!(
            parse_spreadsheet(csv.as_bytes(), "x.csv"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn excel_serial_dates_stay_numeric() {
        assert_eq!(data_to_cell(&Data::Float(43845.0)), Some(RawCell::Number(43845.0)));
        assert_eq!(data_to_cell(&Data::String("  ".into())), None);
    }
}
