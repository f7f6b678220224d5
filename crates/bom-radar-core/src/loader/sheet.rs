use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx, XlsxError};
use std::io::{Read, Seek};

/// First worksheet of a workbook, or `None` when it has no sheets.
pub(crate) fn first_worksheet<RS: Read + Seek>(reader: RS) -> Result<Option<Range<Data>>, XlsxError> {
    let mut workbook: Xlsx<RS> = open_workbook_from_rs(reader)?;
    workbook.worksheet_range_at(0).transpose()
}

/// Render a cell the way a string-typed read would. Empty and error cells are `None`.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Header row of a worksheet as text; blank header cells become empty strings.
pub(crate) fn header_row(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .next()
        .map(|row| row.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default()
}

pub(crate) fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}
