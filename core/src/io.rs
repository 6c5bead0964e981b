//! CSV boundary.
//!
//! RULE: Only io.rs touches CSV. The engine and stages work on parsed
//! records — they never see a raw cell.
//!
//! Reading is fail-soft for cells (malformed values become fallbacks) and
//! fail-fast only for the resource itself: an unreadable or headerless file
//! is the one caller-visible failure the pass has.

use crate::error::{FeatureError, FeatureResult};
use crate::features::{FeatureVector, FEATURE_COLUMNS};
use crate::record::{
    non_empty, parse_amount, parse_timestamp, Schema, TransactionRecord, COL_ACCOUNT, COL_AMOUNT,
    COL_CHANNEL, COL_COUNTERPARTY, COL_COUNTRY, COL_CUSTOMER, COL_TIMESTAMP, COL_TRANSFER_TYPE,
};
use std::fs::File;
use std::io::{Read, Write};

/// The parsed input plus everything needed to pass the original columns
/// through to the output unchanged.
#[derive(Debug)]
pub struct InputTable {
    pub schema: Schema,
    pub headers: Vec<String>,
    /// Raw cells per row, for pass-through.
    pub raw: Vec<Vec<String>>,
    /// Parsed rows, same order and length as `raw`.
    pub records: Vec<TransactionRecord>,
}

/// Read the cleaned transaction log from `path`.
pub fn read_records(path: &str) -> FeatureResult<InputTable> {
    let file = File::open(path)?;
    read_records_from(file)
}

/// Read from any source. Used directly by tests.
pub fn read_records_from<R: Read>(reader: R) -> FeatureResult<InputTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(FeatureError::MissingHeader);
    }
    let schema = Schema::from_headers(&headers);

    let col = |name: &str| headers.iter().position(|h| h == name);
    let timestamp_col = col(COL_TIMESTAMP);
    let amount_col = col(COL_AMOUNT);
    let transfer_type_col = col(COL_TRANSFER_TYPE);
    let channel_col = col(COL_CHANNEL);
    let customer_col = col(COL_CUSTOMER);
    let account_col = col(COL_ACCOUNT);
    let counterparty_col = col(COL_COUNTERPARTY);
    let country_col = col(COL_COUNTRY);

    let mut raw = Vec::new();
    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

        records.push(TransactionRecord {
            customer_id: non_empty(cell(customer_col)),
            account_id: non_empty(cell(account_col)),
            amount: parse_amount(cell(amount_col)),
            transfer_type: non_empty(cell(transfer_type_col)),
            channel_id: non_empty(cell(channel_col)),
            timestamp: parse_timestamp(cell(timestamp_col)),
            counterparty: non_empty(cell(counterparty_col)),
            bank_country: non_empty(cell(country_col)),
        });
        raw.push(row.iter().map(str::to_string).collect());
    }

    log::info!("read {} row(s), {} column(s)", records.len(), headers.len());
    Ok(InputTable {
        schema,
        headers,
        raw,
        records,
    })
}

/// Write the feature table to `path`: every input column, then the 45
/// feature columns, one row per input row in input order.
pub fn write_features(
    path: &str,
    table: &InputTable,
    features: &[FeatureVector],
) -> FeatureResult<()> {
    let file = File::create(path)?;
    write_features_to(file, table, features)
}

pub fn write_features_to<W: Write>(
    writer: W,
    table: &InputTable,
    features: &[FeatureVector],
) -> FeatureResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    header.extend(FEATURE_COLUMNS);
    csv_writer.write_record(&header)?;

    let width = table.headers.len();
    for (row, vector) in features.iter().enumerate() {
        let mut cells: Vec<String> = table.raw.get(row).cloned().unwrap_or_default();
        // Ragged input rows pad out to the header width.
        cells.resize(width, String::new());
        cells.extend(vector.cells());
        csv_writer.write_record(&cells)?;
    }

    csv_writer.flush()?;
    log::info!("wrote {} feature row(s)", features.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
CreateDate,AmountInAed,TransferType,CustomerId,FromAccountNo
2024-01-01 10:00:00,100.50,S,c1,a1
bad-date,not-a-number,D,c1,a1
,250,,c2,a2
";

    #[test]
    fn reads_schema_and_coerces_cells() {
        let table = read_records_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.records.len(), 3);
        assert!(table.schema.has_timestamp);
        assert!(table.schema.grouped());
        assert!(!table.schema.has_channel);

        assert_eq!(table.records[0].amount, 100.50);
        assert!(table.records[0].timestamp.is_some());
        // Malformed cells become fallbacks, never errors.
        assert_eq!(table.records[1].amount, 0.0);
        assert!(table.records[1].timestamp.is_none());
        assert!(table.records[2].transfer_type.is_none());
    }

    #[test]
    fn writes_input_columns_then_feature_columns() {
        let table = read_records_from(SAMPLE.as_bytes()).unwrap();
        let features = vec![FeatureVector::default(); table.records.len()];

        let mut buffer = Vec::new();
        write_features_to(&mut buffer, &table, &features).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let header = output.lines().next().unwrap();

        assert!(header.starts_with("CreateDate,AmountInAed"));
        assert!(header.ends_with("rolling_std,transaction_velocity"));
        assert_eq!(output.lines().count(), 1 + table.records.len());
    }
}
