// 📥 Source Readers - One extractor per input format
//
//   house.sql        → HouseRecord (bedrooms) + HousePriceRecord (area)
//   data_house.csv   → HouseRecord (everything except bedrooms)
//   house_price.xls  → HousePriceRecord (price)
//
// Every reader returns partial records. Nothing is recovered: the first
// malformed value aborts the whole read.

use crate::records::{FurnishingStatus, HousePriceRecord, HouseRecord};
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceKind - which input format a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SqlDump,
    Csv,
    Spreadsheet,
}

impl SourceKind {
    pub fn name(&self) -> &str {
        match self {
            SourceKind::SqlDump => "SQL dump",
            SourceKind::Csv => "CSV",
            SourceKind::Spreadsheet => "spreadsheet",
        }
    }
}

/// SourceReader - extract partial records from one input file
pub trait SourceReader {
    type Output;

    /// Read the whole file; any malformed value is an error
    fn read(&self, path: &Path) -> Result<Self::Output>;

    /// The format this reader understands
    fn source_kind(&self) -> SourceKind;
}

/// Classify an input file by its extension
///
/// ```
/// use housing_etl::{detect_source, SourceKind};
/// use std::path::Path;
///
/// assert_eq!(detect_source(Path::new("input/house.sql")).unwrap(), SourceKind::SqlDump);
/// assert_eq!(detect_source(Path::new("house_price.XLS")).unwrap(), SourceKind::Spreadsheet);
/// ```
pub fn detect_source(path: &Path) -> Result<SourceKind> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "sql" => Ok(SourceKind::SqlDump),
        "csv" => Ok(SourceKind::Csv),
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(SourceKind::Spreadsheet),
        _ => Err(anyhow!(
            "Could not detect source type from file name: {}",
            path.display()
        )),
    }
}

/// Fail unless `path` looks like the format `reader` expects
pub fn ensure_source_kind<S: SourceReader>(reader: &S, path: &Path) -> Result<()> {
    let detected = detect_source(path)?;
    if detected != reader.source_kind() {
        bail!(
            "{} is a {} file, expected a {} file",
            path.display(),
            detected.name(),
            reader.source_kind().name()
        );
    }
    Ok(())
}

// ============================================================================
// SQL DUMP READER
// ============================================================================

/// Inserts produced by the upstream dump, one per house.
///
/// This is a text pattern, not a SQL parser: any formatting change in the
/// dump (column order, quoting, multi-row VALUES) silently yields no match.
const DUMP_INSERT_PATTERN: &str =
    r"INSERT INTO `` \(`house_ID`,`area`,`bedrooms`\)\s+VALUES \((\d+),(\d+),(\d+)\);";

/// Records recovered from the dump, aligned by position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpExtract {
    pub houses: Vec<HouseRecord>,
    pub prices: Vec<HousePriceRecord>,
}

impl DumpExtract {
    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}

pub struct SqlDumpReader;

impl SqlDumpReader {
    pub fn new() -> Self {
        SqlDumpReader
    }
}

impl Default for SqlDumpReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceReader for SqlDumpReader {
    type Output = DumpExtract;

    fn read(&self, path: &Path) -> Result<DumpExtract> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL dump: {}", path.display()))?;

        let extract = extract_from_dump(&text)
            .with_context(|| format!("Failed to extract rows from {}", path.display()))?;

        info!(path = %path.display(), rows = extract.len(), "read SQL dump");
        Ok(extract)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::SqlDump
    }
}

/// Scan dump text for house inserts.
///
/// Dump identifiers are 1-based; they are shifted down by one to line up
/// with the 0-based row ids of the CSV and the spreadsheet. An id of 0 or a
/// repeated id would break that alignment and is rejected.
pub fn extract_from_dump(text: &str) -> Result<DumpExtract> {
    let pattern = Regex::new(DUMP_INSERT_PATTERN).context("Invalid dump insert pattern")?;

    let mut extract = DumpExtract::default();
    let mut seen = BTreeSet::new();

    // matches arrive in order, so lines are counted incrementally
    let mut line = 1;
    let mut scanned = 0;

    for caps in pattern.captures_iter(text) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(scanned);
        line += text[scanned..start].matches('\n').count();
        scanned = start;

        let field = |index: usize, name: &str| -> Result<i64> {
            let raw = caps.get(index).map(|m| m.as_str()).unwrap_or("");
            raw.parse::<i64>()
                .with_context(|| format!("line {}: {} '{}' is not a valid integer", line, name, raw))
        };

        let dump_id = field(1, "house_ID")?;
        let area = field(2, "area")?;
        let bedrooms = field(3, "bedrooms")?;

        if dump_id < 1 {
            bail!("line {}: house_ID {} cannot be shifted to a 0-based id", line, dump_id);
        }
        let house_id = dump_id - 1;
        if !seen.insert(house_id) {
            bail!("line {}: house_ID {} appears more than once", line, dump_id);
        }

        extract.houses.push(HouseRecord::new(house_id).with_bedrooms(bedrooms));
        extract.prices.push(HousePriceRecord::new(house_id).with_area(area));
    }

    Ok(extract)
}

// ============================================================================
// CSV READER
// ============================================================================

/// One row of data_house.csv (columns not listed here are ignored)
#[derive(Debug, Deserialize)]
struct HouseCsvRow {
    id: i64,
    bathrooms: i64,
    stories: i64,
    parking: i64,
    mainroad: String,
    guestroom: String,
    basement: String,
    hotwaterheating: String,
    airconditioning: String,
    prefarea: String,
    furnishingstatus: String,
}

fn is_yes(value: &str) -> bool {
    value == "yes"
}

impl From<HouseCsvRow> for HouseRecord {
    fn from(row: HouseCsvRow) -> Self {
        HouseRecord {
            house_id: row.id,
            n_bedroom: None,
            n_bathroom: Some(row.bathrooms),
            n_stories: Some(row.stories),
            n_parking_slot: Some(row.parking),
            is_mainroad: Some(is_yes(&row.mainroad)),
            has_guestroom: Some(is_yes(&row.guestroom)),
            has_basement: Some(is_yes(&row.basement)),
            has_hot_water: Some(is_yes(&row.hotwaterheating)),
            has_air_conditioning: Some(is_yes(&row.airconditioning)),
            is_pref_area: Some(is_yes(&row.prefarea)),
            furnishing_id: Some(FurnishingStatus::from_label(&row.furnishingstatus).code()),
        }
    }
}

pub struct HouseCsvReader;

impl HouseCsvReader {
    pub fn new() -> Self {
        HouseCsvReader
    }
}

impl Default for HouseCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceReader for HouseCsvReader {
    type Output = Vec<HouseRecord>;

    fn read(&self, path: &Path) -> Result<Vec<HouseRecord>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv");

        let houses = read_house_csv(file, filename)?;
        info!(path = %path.display(), rows = houses.len(), "read house CSV");
        Ok(houses)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Csv
    }
}

/// Parse comma-delimited house rows from any reader
pub fn read_house_csv<R: Read>(input: R, filename: &str) -> Result<Vec<HouseRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .from_reader(input);

    let mut houses = Vec::new();
    for (line_num, result) in reader.deserialize::<HouseCsvRow>().enumerate() {
        // +2 because: 1-indexed + header row
        let row = result.with_context(|| {
            format!("Failed to parse CSV line {} in {}", line_num + 2, filename)
        })?;
        houses.push(HouseRecord::from(row));
    }

    Ok(houses)
}

// ============================================================================
// SPREADSHEET READER
// ============================================================================

const PRICE_COLUMN: &str = "price";

pub struct PriceSpreadsheetReader;

impl PriceSpreadsheetReader {
    pub fn new() -> Self {
        PriceSpreadsheetReader
    }
}

impl Default for PriceSpreadsheetReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceReader for PriceSpreadsheetReader {
    type Output = Vec<HousePriceRecord>;

    fn read(&self, path: &Path) -> Result<Vec<HousePriceRecord>> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| anyhow!("Failed to open spreadsheet {}: {}", path.display(), e))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Spreadsheet has no worksheets: {}", path.display()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| anyhow!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let prices = prices_from_range(&range)
            .with_context(|| format!("Failed to extract prices from {}", path.display()))?;

        info!(path = %path.display(), sheet = %sheet_name, rows = prices.len(), "read price spreadsheet");
        Ok(prices)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Spreadsheet
    }
}

/// Read the `price` column of a worksheet.
///
/// The first row is the header. Data rows get sequential 0-based ids.
pub fn prices_from_range(range: &Range<Data>) -> Result<Vec<HousePriceRecord>> {
    let mut rows = range.rows();
    let header = rows.next().context("Worksheet is empty")?;

    let price_col = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s.trim() == PRICE_COLUMN))
        .with_context(|| format!("No '{}' column in header row", PRICE_COLUMN))?;

    rows.enumerate()
        .map(|(index, row)| -> Result<HousePriceRecord> {
            let cell = row.get(price_col).unwrap_or(&Data::Empty);
            let price = price_from_cell(cell)
                .with_context(|| format!("Bad price in data row {}", index + 1))?;
            Ok(HousePriceRecord {
                house_id: index as i64,
                area: None,
                price,
            })
        })
        .collect()
}

fn price_from_cell(cell: &Data) -> Result<Option<i64>> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(n) => Ok(Some(*n)),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
            if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                Ok(Some(*f as i64))
            } else {
                Err(anyhow!("Price {} does not fit in a 64-bit integer", f))
            }
        }
        Data::String(s) if s.trim().is_empty() => Ok(None),
        Data::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("'{}' is not an integer price", s)),
        other => Err(anyhow!("Unsupported price cell: {:?}", other)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV_HEADER: &str = "id,price,area,bedrooms,bathrooms,stories,mainroad,guestroom,basement,hotwaterheating,airconditioning,parking,prefarea,furnishingstatus";

    #[test]
    fn test_detect_source() {
        assert_eq!(detect_source(Path::new("house.sql")).unwrap(), SourceKind::SqlDump);
        assert_eq!(detect_source(Path::new("data_house.csv")).unwrap(), SourceKind::Csv);
        assert_eq!(
            detect_source(Path::new("house_price.xlsx")).unwrap(),
            SourceKind::Spreadsheet
        );
        assert!(detect_source(Path::new("notes.txt")).is_err());
        assert!(detect_source(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_ensure_source_kind() {
        assert!(ensure_source_kind(&SqlDumpReader::new(), Path::new("input/house.sql")).is_ok());
        let err = ensure_source_kind(&HouseCsvReader::new(), Path::new("house.sql")).unwrap_err();
        assert!(err.to_string().contains("expected a CSV file"));
    }

    #[test]
    fn test_dump_minimal_sample() {
        let text = "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (1,1200,3);";

        let extract = extract_from_dump(text).unwrap();

        assert_eq!(extract.houses, vec![HouseRecord::new(0).with_bedrooms(3)]);
        assert_eq!(extract.prices, vec![HousePriceRecord::new(0).with_area(1200)]);
    }

    #[test]
    fn test_dump_ignores_other_statements() {
        let text = "\
-- dump header
CREATE TABLE `` (`house_ID` int, `area` int, `bedrooms` int);
INSERT INTO `` (`house_ID`,`area`,`bedrooms`)
VALUES (1,7420,4);
INSERT INTO `other` (`house_ID`,`area`,`bedrooms`) VALUES (9,1,1);
INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (2,8960,4);
INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (3,9960,3);
";

        let extract = extract_from_dump(text).unwrap();

        assert_eq!(extract.len(), 3);
        let ids: Vec<i64> = extract.houses.iter().map(|h| h.house_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(extract.prices[1].area, Some(8960));
        assert_eq!(extract.houses[2].n_bedroom, Some(3));
    }

    #[test]
    fn test_dump_without_matches_is_empty() {
        let extract = extract_from_dump("SELECT 1;").unwrap();
        assert!(extract.is_empty());
    }

    #[test]
    fn test_dump_rejects_zero_id() {
        let text = "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (0,1200,3);";
        let err = extract_from_dump(text).unwrap_err();
        assert!(err.to_string().contains("0-based"));
    }

    #[test]
    fn test_dump_rejects_duplicate_id() {
        let text = "\
INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (5,1200,3);
INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (5,1300,2);
";
        let err = extract_from_dump(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_dump_rejects_overflowing_value() {
        let text = "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (1,99999999999999999999,3);";
        assert!(extract_from_dump(text).is_err());
    }

    #[test]
    fn test_dump_reader_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
        writeln!(file, "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (1,1200,3);").unwrap();
        writeln!(file, "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (2,1500,2);").unwrap();

        let extract = SqlDumpReader::new().read(file.path()).unwrap();

        assert_eq!(extract.len(), 2);
        assert_eq!(extract.prices[1], HousePriceRecord::new(1).with_area(1500));
    }

    #[test]
    fn test_csv_parse_rows() {
        let data = format!(
            "{}\n{}\n{}\n",
            CSV_HEADER,
            "0,13300000,7420,4,2,3,yes,no,no,no,yes,2,yes,furnished",
            "1,12250000,8960,4,4,4,yes,no,no,no,yes,3,no,semi-furnished"
        );

        let houses = read_house_csv(data.as_bytes(), "data_house.csv").unwrap();

        assert_eq!(houses.len(), 2);
        assert_eq!(
            houses[0],
            HouseRecord {
                house_id: 0,
                n_bedroom: None,
                n_bathroom: Some(2),
                n_stories: Some(3),
                n_parking_slot: Some(2),
                is_mainroad: Some(true),
                has_guestroom: Some(false),
                has_basement: Some(false),
                has_hot_water: Some(false),
                has_air_conditioning: Some(true),
                is_pref_area: Some(true),
                furnishing_id: Some(0),
            }
        );
        assert_eq!(houses[1].furnishing_id, Some(2));
        assert_eq!(houses[1].is_pref_area, Some(false));
    }

    #[test]
    fn test_csv_non_yes_strings_are_false() {
        let data = format!(
            "{}\n{}\n",
            CSV_HEADER, "4,1,1,1,1,1,YES,y,true,1,no,0,,unfurnished"
        );

        let houses = read_house_csv(data.as_bytes(), "data_house.csv").unwrap();

        assert_eq!(houses[0].is_mainroad, Some(false));
        assert_eq!(houses[0].has_guestroom, Some(false));
        assert_eq!(houses[0].is_pref_area, Some(false));
        assert_eq!(houses[0].furnishing_id, Some(1));
    }

    #[test]
    fn test_csv_malformed_integer_aborts() {
        let data = format!(
            "{}\n{}\n{}\n",
            CSV_HEADER,
            "0,1,1,1,2,3,yes,no,no,no,yes,2,yes,furnished",
            "1,1,1,1,two,3,yes,no,no,no,yes,2,yes,furnished"
        );

        let err = read_house_csv(data.as_bytes(), "data_house.csv").unwrap_err();

        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_csv_reader_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{}", CSV_HEADER).unwrap();
        writeln!(file, "0,1,1,1,1,2,no,yes,yes,no,no,0,no,furnished").unwrap();

        let houses = HouseCsvReader::new().read(file.path()).unwrap();

        assert_eq!(houses.len(), 1);
        assert_eq!(houses[0].has_basement, Some(true));
        assert_eq!(houses[0].n_stories, Some(2));
    }

    fn price_sheet(cells: &[Data]) -> Range<Data> {
        let mut range = Range::new((0, 0), (cells.len() as u32, 1));
        range.set_value((0, 0), Data::String("area".to_string()));
        range.set_value((0, 1), Data::String("price".to_string()));
        for (i, cell) in cells.iter().enumerate() {
            range.set_value((i as u32 + 1, 0), Data::Int(1000));
            range.set_value((i as u32 + 1, 1), cell.clone());
        }
        range
    }

    #[test]
    fn test_prices_from_range() {
        let range = price_sheet(&[
            Data::Int(13_300_000),
            Data::Float(12_250_000.0),
            Data::String(" 9240000 ".to_string()),
            Data::Empty,
        ]);

        let prices = prices_from_range(&range).unwrap();

        assert_eq!(
            prices,
            vec![
                HousePriceRecord::new(0).with_price(13_300_000),
                HousePriceRecord::new(1).with_price(12_250_000),
                HousePriceRecord::new(2).with_price(9_240_000),
                HousePriceRecord::new(3),
            ]
        );
    }

    #[test]
    fn test_prices_from_range_rejects_text() {
        let range = price_sheet(&[Data::Int(1), Data::String("n/a".to_string())]);
        let err = prices_from_range(&range).unwrap_err();
        assert!(format!("{:#}", err).contains("data row 2"));
    }

    #[test]
    fn test_prices_from_range_rejects_fractional() {
        let range = price_sheet(&[Data::Float(1.5)]);
        assert!(prices_from_range(&range).is_err());
    }

    #[test]
    fn test_prices_from_range_rejects_out_of_range_float() {
        let range = price_sheet(&[Data::Float(1e20)]);

        let err = prices_from_range(&range).unwrap_err();

        assert!(format!("{:#}", err).contains("does not fit"));
        assert!(prices_from_range(&price_sheet(&[Data::Float(-1e19)])).is_err());
    }

    fn write_workbook(path: &Path, header: &str, prices: &[f64]) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "area").unwrap();
        sheet.write_string(0, 1, header).unwrap();
        for (i, price) in prices.iter().enumerate() {
            sheet.write_number(i as u32 + 1, 0, 5000.0).unwrap();
            sheet.write_number(i as u32 + 1, 1, *price).unwrap();
        }
        // a second sheet must not be read
        let other = workbook.add_worksheet();
        other.write_string(0, 0, "price").unwrap();
        other.write_number(1, 0, 1.0).unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_spreadsheet_reader_reads_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house_price.xlsx");
        write_workbook(&path, "price", &[13_300_000.0, 12_250_000.0, 12_250_000.0]);

        let prices = PriceSpreadsheetReader::new().read(&path).unwrap();

        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0], HousePriceRecord::new(0).with_price(13_300_000));
        assert_eq!(prices[2], HousePriceRecord::new(2).with_price(12_250_000));
    }

    #[test]
    fn test_spreadsheet_reader_missing_price_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house_price.xlsx");
        write_workbook(&path, "cost", &[1.0]);

        let err = PriceSpreadsheetReader::new().read(&path).unwrap_err();

        assert!(format!("{:#}", err).contains("No 'price' column"));
    }

    #[test]
    fn test_spreadsheet_reader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house_price.xlsx");

        let err = PriceSpreadsheetReader::new().read(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to open spreadsheet"));
    }

    #[test]
    fn test_spreadsheet_reader_rejects_non_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house_price.xlsx");
        std::fs::write(&path, "price\n1\n").unwrap();

        assert!(PriceSpreadsheetReader::new().read(&path).is_err());
    }

    #[test]
    fn test_dump_line_numbers_across_many_inserts() {
        let mut text = String::from("-- header\n\n");
        for id in 1..=50 {
            text.push_str(&format!(
                "INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES ({},1000,2);\n",
                id
            ));
        }
        // repeat of id 7 on line 53
        text.push_str("INSERT INTO `` (`house_ID`,`area`,`bedrooms`) VALUES (7,1000,2);\n");

        let err = extract_from_dump(&text).unwrap_err();

        assert!(err.to_string().starts_with("line 53:"));
    }

    #[test]
    fn test_prices_from_range_requires_price_column() {
        let mut range = Range::new((0, 0), (1, 0));
        range.set_value((0, 0), Data::String("cost".to_string()));
        range.set_value((1, 0), Data::Int(5));

        let err = prices_from_range(&range).unwrap_err();
        assert!(err.to_string().contains("'price'"));
    }
}
