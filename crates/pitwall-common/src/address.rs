//! Sheet-scoped cell and range addresses for the calculator workbook.
//!
//! Addresses are 1-based (row 1, column 1 is `A1`) and can be built in `const`
//! context from A1 text, so the static schema tables fail to compile when a
//! literal is malformed instead of failing at request time.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Excel limits: 1,048,576 rows × 16,384 columns.
pub const MAX_ROW: u32 = 1_048_576;
pub const MAX_COL: u32 = 16_384;

/// Worksheets the calculator workbook is expected to expose.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Sheet {
    /// Driver, car, weather and setup inputs/outputs.
    #[serde(rename = "Setup&WS")]
    Setup,
    /// Tyre, fuel, stint and boost strategy.
    #[serde(rename = "Tyre&Fuel")]
    TyreFuel,
    /// Track catalogue.
    #[serde(rename = "Tracks")]
    Tracks,
}

impl Sheet {
    pub const ALL: [Sheet; 3] = [Sheet::Setup, Sheet::TyreFuel, Sheet::Tracks];

    /// Worksheet tab name as it appears in the workbook.
    pub const fn name(self) -> &'static str {
        match self {
            Sheet::Setup => "Setup&WS",
            Sheet::TyreFuel => "Tyre&Fuel",
            Sheet::Tracks => "Tracks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sheet| sheet.name() == name)
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while parsing A1 references.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressError {
    Empty,
    MissingColumn,
    MissingRow,
    InvalidChar(u8),
    ZeroRow,
    RowOverflow,
    ColOverflow,
    RangeOrder,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "empty cell reference"),
            AddressError::MissingColumn => write!(f, "cell reference has no column letters"),
            AddressError::MissingRow => write!(f, "cell reference has no row number"),
            AddressError::InvalidChar(ch) => {
                write!(f, "unexpected character `{}` in cell reference", *ch as char)
            }
            AddressError::ZeroRow => write!(f, "row numbers are 1-based"),
            AddressError::RowOverflow => write!(f, "row exceeds {MAX_ROW}"),
            AddressError::ColOverflow => write!(f, "column exceeds {MAX_COL}"),
            AddressError::RangeOrder => {
                write!(f, "range must be ordered so the start is above/left of the end")
            }
        }
    }
}

impl Error for AddressError {}

/// Parse `E6`/`AC11` into a 1-based `(row, col)` pair. Letters may be lowercase.
pub const fn parse_a1(reference: &str) -> Result<(u32, u32), AddressError> {
    let bytes = reference.as_bytes();
    if bytes.is_empty() {
        return Err(AddressError::Empty);
    }

    let mut idx = 0;
    let mut col: u32 = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        let letter = bytes[idx].to_ascii_uppercase();
        col = col * 26 + (letter - b'A') as u32 + 1;
        if col > MAX_COL {
            return Err(AddressError::ColOverflow);
        }
        idx += 1;
    }
    if idx == 0 {
        if bytes[0].is_ascii_digit() {
            return Err(AddressError::MissingColumn);
        }
        return Err(AddressError::InvalidChar(bytes[0]));
    }
    if idx == bytes.len() {
        return Err(AddressError::MissingRow);
    }

    let mut row: u32 = 0;
    while idx < bytes.len() {
        let digit = bytes[idx];
        if !digit.is_ascii_digit() {
            return Err(AddressError::InvalidChar(digit));
        }
        row = row * 10 + (digit - b'0') as u32;
        if row > MAX_ROW {
            return Err(AddressError::RowOverflow);
        }
        idx += 1;
    }
    if row == 0 {
        return Err(AddressError::ZeroRow);
    }
    Ok((row, col))
}

/// Render a 1-based column index as letters (`1 -> A`, `28 -> AB`).
pub fn col_to_a1(col: u32) -> String {
    let mut buf = Vec::new();
    let mut remaining = col;
    while remaining > 0 {
        let rem = ((remaining - 1) % 26) as u8;
        buf.push(b'A' + rem);
        remaining = (remaining - 1) / 26;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// One scalar storage location inside the workbook.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CellAddress {
    pub sheet: Sheet,
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// Build from 1-based coordinates.
    pub const fn new(sheet: Sheet, row: u32, col: u32) -> Self {
        CellAddress { sheet, row, col }
    }

    /// Build from an A1 literal; panics (at compile time in `const` items) when malformed.
    pub const fn a1(sheet: Sheet, reference: &str) -> Self {
        match parse_a1(reference) {
            Ok((row, col)) => CellAddress { sheet, row, col },
            Err(_) => panic!("malformed A1 cell reference"),
        }
    }

    /// Fallible counterpart of [`CellAddress::a1`].
    pub fn try_a1(sheet: Sheet, reference: &str) -> Result<Self, AddressError> {
        let (row, col) = parse_a1(reference)?;
        Ok(CellAddress { sheet, row, col })
    }

    /// Same sheet and column, different row.
    pub const fn with_row(self, row: u32) -> Self {
        CellAddress { row, ..self }
    }

    /// Same sheet and row, different column.
    pub const fn with_col(self, col: u32) -> Self {
        CellAddress { col, ..self }
    }

    /// Sheet-less reference, e.g. `E6`.
    pub fn reference(&self) -> String {
        format!("{}{}", col_to_a1(self.col), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'!{}{}", self.sheet, col_to_a1(self.col), self.row)
    }
}

/// Inclusive rectangular block of cells on one sheet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeAddress {
    pub sheet: Sheet,
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl RangeAddress {
    /// Build from an `A4:A67` literal; panics when malformed or unordered.
    pub const fn a1(sheet: Sheet, start: &str, end: &str) -> Self {
        let start = match parse_a1(start) {
            Ok(coord) => coord,
            Err(_) => panic!("malformed range start"),
        };
        let end = match parse_a1(end) {
            Ok(coord) => coord,
            Err(_) => panic!("malformed range end"),
        };
        if start.0 > end.0 || start.1 > end.1 {
            panic!("range must be ordered");
        }
        RangeAddress { sheet, start, end }
    }

    pub fn width(&self) -> u32 {
        self.end.1 - self.start.1 + 1
    }

    pub fn height(&self) -> u32 {
        self.end.0 - self.start.0 + 1
    }

    /// Row-major iterator over every cell in the block.
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.0..=self.end.0).flat_map(move |row| {
            (self.start.1..=self.end.1).map(move |col| CellAddress::new(self.sheet, row, col))
        })
    }

    /// Sheet-less reference, e.g. `A4:A67`.
    pub fn reference(&self) -> String {
        format!(
            "{}{}:{}{}",
            col_to_a1(self.start.1),
            self.start.0,
            col_to_a1(self.end.1),
            self.end.0
        )
    }
}

impl FromStr for RangeAddress {
    type Err = AddressError;

    /// Parses `Sheet!A1:B2` where the sheet is one of [`Sheet::ALL`] (optionally quoted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, refs) = s.rsplit_once('!').ok_or(AddressError::Empty)?;
        let sheet = Sheet::from_name(sheet.trim_matches('\''))
            .ok_or(AddressError::InvalidChar(b'!'))?;
        let (start, end) = refs.split_once(':').unwrap_or((refs, refs));
        let start = parse_a1(start)?;
        let end = parse_a1(end)?;
        if start.0 > end.0 || start.1 > end.1 {
            return Err(AddressError::RangeOrder);
        }
        Ok(RangeAddress { sheet, start, end })
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'!{}", self.sheet, self.reference())
    }
}
