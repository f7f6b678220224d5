use calamine::{open_workbook, Reader, Xlsx};
use std::path::Path;
use tracing::info;

use super::sheet;
use crate::error::Error;
use crate::model::CriticalSet;

/// Read the critical component list from the first worksheet of an xlsx file.
pub fn load_critical_items(path: &Path, column: &str) -> Result<CriticalSet, Error> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| Error::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(source)) => {
            return Err(Error::Workbook {
                path: path.to_path_buf(),
                source,
            })
        }
        None => {
            return Err(Error::InvalidInput(format!(
                "critical items list {} has no worksheet",
                path.display()
            )))
        }
    };

    let headers = sheet::header_row(&range);
    let idx = sheet::column_index(&headers, column).ok_or_else(|| {
        Error::InvalidInput(format!(
            "critical items list {} has no '{}' column",
            path.display(),
            column
        ))
    })?;

    let items = range
        .rows()
        .skip(1)
        .filter_map(|row| row.get(idx).and_then(sheet::cell_text));
    let critical = CriticalSet::new(items);

    info!("Loaded {} critical items", critical.len());
    Ok(critical)
}
