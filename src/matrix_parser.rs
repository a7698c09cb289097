//! Reader and writer for the line-oriented distance record stream produced by
//! distance engines: one `<row>x<col>_<value>_<trailer>` record per line.
//!
//! Rows are collected in the order their row key is first seen. A record whose
//! row key differs from the previous record's key starts a new row, so the
//! stream must already be grouped by row for row positions to match entity ids.
use crate::validation::MatrixValidator;
use crate::HgcError;
use num_traits::Float;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    ReadRow,
    ReadCol,
    ReadValue,
    SkipToEol,
}

impl LexState {
    fn missing_separator(&self) -> &'static str {
        match self {
            LexState::ReadRow => "missing 'x' separator after the row index",
            LexState::ReadCol => "missing '_' separator after the column index",
            LexState::ReadValue => "missing '_' separator after the value",
            LexState::SkipToEol => "missing end of line",
        }
    }
}

/// Parses distance record streams into a square matrix. Holds no state between calls, so
/// one parser can be reused for any number of streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct DistanceMatrixParser;

impl DistanceMatrixParser {
    pub fn new() -> Self {
        DistanceMatrixParser
    }

    /// Parses a complete record stream.
    ///
    /// # Parameters
    /// * `input` - the records, each terminated by a newline.
    ///
    /// # Returns
    /// * The matrix with rows in first-seen order. Fails with `MalformedRecord` if a record
    ///   is missing a separator or has an empty or non-integer row or value field, and with
    ///   `ShapeError` if the collected rows do not form a square matrix.
    pub fn parse_str(&self, input: &str) -> Result<Vec<Vec<u64>>, HgcError> {
        let mut rows: Vec<Vec<u64>> = Vec::new();
        let mut current_row: Option<u64> = None;
        let mut state = LexState::ReadRow;
        let mut line = 1;
        let mut field = String::new();

        for c in input.chars() {
            match (state, c) {
                (LexState::SkipToEol, '\n') => {
                    line += 1;
                    state = LexState::ReadRow;
                }
                (LexState::SkipToEol, _) => {}
                (_, '\n') => return Err(malformed(line, state.missing_separator())),
                (LexState::ReadRow, 'x') => {
                    let row = parse_field(&field, line, "row")?;
                    if current_row != Some(row) {
                        rows.push(Vec::new());
                        current_row = Some(row);
                    }
                    field.clear();
                    state = LexState::ReadCol;
                }
                // The column only delimits the record; its value is implied by position.
                (LexState::ReadCol, '_') => state = LexState::ReadValue,
                (LexState::ReadCol, _) => {}
                (LexState::ReadValue, '_') => {
                    let value = parse_field(&field, line, "value")?;
                    if let Some(row) = rows.last_mut() {
                        row.push(value);
                    }
                    field.clear();
                    state = LexState::SkipToEol;
                }
                (LexState::ReadRow | LexState::ReadValue, _) => field.push(c),
            }
        }

        if state != LexState::ReadRow || !field.is_empty() {
            return Err(malformed(line, state.missing_separator()));
        }

        MatrixValidator::new(&rows).validate_square()?;
        Ok(rows)
    }

    /// Reads a record stream from any reader. See [`DistanceMatrixParser::parse_str`].
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<Vec<Vec<u64>>, HgcError> {
        let mut input = String::new();
        reader
            .read_to_string(&mut input)
            .map_err(|e| HgcError::unreadable("<stream>", e))?;
        self.parse_str(&input)
    }

    /// Reads and parses a record file, converting the integer distances to floating point.
    ///
    /// # Parameters
    /// * `path` - the record file, conventionally with a `.csv` extension.
    ///
    /// # Returns
    /// * The distance matrix, or `UnreadableSource` if the file can't be read.
    pub fn read_path<T: Float>(&self, path: impl AsRef<Path>) -> Result<Vec<Vec<T>>, HgcError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| HgcError::unreadable(path, e))?;
        let raw = self.parse_str(&input)?;
        to_distances(raw)
    }
}

/// Converts parsed records to floating point.
fn to_distances<T: Float>(raw: Vec<Vec<u64>>) -> Result<Vec<Vec<T>>, HgcError> {
    let width = raw.len();
    raw.into_iter()
        .enumerate()
        .map(|(row, values)| {
            values
                .into_iter()
                .enumerate()
                .map(|(col, value)| {
                    T::from(value).ok_or_else(|| {
                        malformed(
                            record_line(row, col, width),
                            "value can't be represented as a distance",
                        )
                    })
                })
                .collect()
        })
        .collect()
}

/// Line of the record at `row`, `col` in a square stream of `width` records per row.
fn record_line(row: usize, col: usize, width: usize) -> usize {
    row * width + col + 1
}

/// Serialises a matrix into the record grammar read by [`DistanceMatrixParser`], with an
/// empty trailer on every record.
pub fn write_distance_matrix(matrix: &[Vec<u64>]) -> String {
    let mut out = String::new();
    for (row, values) in matrix.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            out.push_str(&format!("{row}x{col}_{value}_\n"));
        }
    }
    out
}

fn parse_field(field: &str, line: usize, name: &str) -> Result<u64, HgcError> {
    if field.is_empty() {
        return Err(malformed(line, &format!("empty {name} field")));
    }
    field
        .parse::<u64>()
        .map_err(|_| malformed(line, &format!("{name} field \"{field}\" is not an integer")))
}

fn malformed(line: usize, reason: &str) -> HgcError {
    HgcError::MalformedRecord {
        line,
        reason: reason.to_string(),
    }
}
