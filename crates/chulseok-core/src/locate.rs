//! Cell location inside the attendance sheet.
//!
//! The sheet is read as one rectangular range:
//!
//! ```text
//!      A        B       C       D
//! 1    이름     1주차   2주차   3주차
//! 2    김상현   O
//! 3    이영희           O
//! ```
//!
//! The range's first row holds the week headers, its first column the
//! participant identities. A (participant, week) pair resolves to an
//! A1-style address only when both the header and the row are found.
//! Addresses are absolute: a range starting at `C5` shifts every address
//! by its origin.

use crate::model::WeekNumber;
use crate::normalize::week_label;

/// A full read of the attendance range. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    rows: Vec<Vec<String>>,
    /// 0-based `(row, col)` of the range's top-left cell.
    origin: (usize, usize),
}

impl SheetSnapshot {
    /// Snapshot of a range that starts at `A1`.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self::with_origin(rows, (0, 0))
    }

    /// Snapshot of a range whose top-left cell is at 0-based `(row, col)`.
    pub fn with_origin(rows: Vec<Vec<String>>, origin: (usize, usize)) -> Self {
        Self { rows, origin }
    }

    /// Absolute A1 address of the cell at `(row, col)` within the range.
    pub fn address(&self, row: usize, col: usize) -> String {
        cell_address(self.origin.0 + row, self.origin.1 + col)
    }

    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// 0-based column within the range of the header cell for `week`.
///
/// Whitespace inside the header is ignored, so "3 주차" matches week 3.
pub fn week_column(week: WeekNumber, sheet: &SheetSnapshot) -> Option<usize> {
    let label = week_label(week);
    sheet.header().iter().position(|cell| {
        let cell = cell.trim();
        cell == label || compact(cell) == label
    })
}

/// 0-based row within the range whose first cell equals `identity`,
/// skipping the header.
pub fn participant_row(identity: &str, sheet: &SheetSnapshot) -> Option<usize> {
    sheet
        .rows()
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| row.first().is_some_and(|first| first == identity))
        .map(|(idx, _)| idx)
}

/// A1-style address for `(identity, week)`, or `None` if either lookup fails.
pub fn locate(identity: &str, week: WeekNumber, sheet: &SheetSnapshot) -> Option<String> {
    let col = week_column(week, sheet)?;
    let row = participant_row(identity, sheet)?;
    Some(sheet.address(row, col))
}

/// 0-based `(row, col)` of the top-left cell of an A1 range.
///
/// `'출석부'!B3:Z20` → `(2, 1)`, `B:D` → `(0, 1)`, `3:10` → `(2, 0)`.
/// A sheet name followed by `!` and nothing else covers the whole sheet.
/// Anything else, such as a named range, gives `None`.
pub fn range_origin(range: &str) -> Option<(usize, usize)> {
    let cells = match range.rsplit_once('!') {
        Some((_, cells)) => cells,
        None => range,
    };
    let start = cells.split(':').next().unwrap_or_default().replace('$', "");
    if start.is_empty() {
        return range.contains('!').then_some((0, 0));
    }

    let split = start
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(start.len());
    let (letters, digits) = start.split_at(split);
    // Columns stop at ZZZ. Column-only and row-only starts need a span ("B:D", "3:10").
    if letters.len() > 3 || ((letters.is_empty() || digits.is_empty()) && !cells.contains(':')) {
        return None;
    }
    let col = if letters.is_empty() {
        0
    } else {
        column_index(letters)? - 1
    };
    let row = if digits.is_empty() {
        0
    } else {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<usize>().ok()?.checked_sub(1)?
    };
    Some((row, col))
}

/// Inverse of [`column_letters`]: "A" → 1, "AA" → 27. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A') as usize + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A1 address from 0-based indices: `(1, 1)` → `"B2"`.
pub fn cell_address(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col + 1), row + 1)
}

/// Bijective base-26 column name from a 1-based index.
///
/// 1 → "A", 26 → "Z", 27 → "AA", 702 → "ZZ", 703 → "AAA". Zero has no
/// column name and yields an empty string.
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
