use crate::record::{merge_date_and_time, LogRecord};
use flate2::read::GzDecoder;
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info, warn};

const VERSION_PREFIX: &str = "#Version: ";
const FIELDS_PREFIX: &str = "#Fields: ";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("log file has no #Fields line")]
    MissingFields,
    #[error("malformed #Fields line: {0:?}")]
    MalformedFields(String),
    #[error("field {0:?} is declared twice")]
    DuplicateField(String),
    #[error("field counts don't match on line {line}: expected {expected}, found {found}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Result of inflating a gzip object.
///
/// Decompression failures do not abort processing: whatever was inflated
/// before the failure (often nothing) is handed to the parser, and the failure
/// is kept here so callers and tests can see it happened.
#[derive(Debug)]
pub struct Inflated {
    pub data: Vec<u8>,
    pub failure: Option<std::io::Error>,
}

impl Inflated {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

pub fn inflate(compressed: &[u8]) -> Inflated {
    debug!("trying to unzip stream (length: {})", compressed.len());
    let mut decoder = GzDecoder::new(compressed);
    let mut data = Vec::new();
    let failure = match decoder.read_to_end(&mut data) {
        Ok(_) => None,
        Err(e) => {
            warn!("failed to unzip stream with message {}", e);
            Some(e)
        }
    };
    info!("unzipped stream length: {}", data.len());
    Inflated { data, failure }
}

/// Parses the CloudFront standard log layout: a `#Version:` line, a
/// `#Fields:` line naming the columns, then one tab-separated row per request.
///
/// A row whose cell count differs from the header is fatal for the whole file.
pub fn parse_log_text(text: &str) -> Result<Vec<LogRecord>, ParseError> {
    debug!("start parsing log text");
    let mut lines = text.lines();

    let version = lines
        .next()
        .map(|line| line.strip_prefix(VERSION_PREFIX).unwrap_or(line));
    info!("log file version is {:?}", version);

    let fields_line = lines.next().ok_or(ParseError::MissingFields)?;
    let fields: Vec<&str> = fields_line
        .strip_prefix(FIELDS_PREFIX)
        .ok_or_else(|| ParseError::MalformedFields(fields_line.to_string()))?
        .split(' ')
        .collect();
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].contains(field) {
            return Err(ParseError::DuplicateField(field.to_string()));
        }
    }

    let mut records = Vec::new();
    // data rows start on the third line of the file
    for (line_number, line) in lines.enumerate().map(|(i, l)| (i + 3, l)) {
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != fields.len() {
            debug!("mismatched line {}: {:?}", line_number, line);
            return Err(ParseError::FieldCountMismatch {
                line: line_number,
                expected: fields.len(),
                found: cells.len(),
            });
        }
        records.push(fields.iter().copied().zip(cells).collect::<LogRecord>());
    }

    info!("log file contains {} lines", records.len());
    Ok(records)
}

/// Inflates, parses and normalizes one gzip-compressed access-log object.
pub fn decode(compressed: &[u8]) -> Result<Vec<LogRecord>, ParseError> {
    let inflated = inflate(compressed);
    let text = String::from_utf8_lossy(&inflated.data);
    let mut records = parse_log_text(&text)?;
    merge_date_and_time(&mut records);
    Ok(records)
}
