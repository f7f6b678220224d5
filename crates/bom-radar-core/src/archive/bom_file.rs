use rust_xlsxwriter::{Format, Workbook};

use crate::config::ColumnConfig;
use crate::error::Error;
use crate::model::Record;

/// Render records as a BOM workbook with the configured headers, one row per
/// record in the order given.
///
/// The description column is written only when every record has one, since the
/// loader drops rows whose description cell is blank.
pub fn write_bom_workbook(records: &[&Record], columns: &ColumnConfig) -> Result<Vec<u8>, Error> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    let with_description = records.iter().all(|r| !r.description.is_empty());

    sheet.write_string_with_format(0, 0, &columns.component, &header)?;
    sheet.write_string_with_format(0, 1, &columns.material, &header)?;
    if with_description {
        sheet.write_string_with_format(0, 2, &columns.description, &header)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, &record.component)?;
        sheet.write_string(row, 1, &record.material)?;
        if with_description {
            sheet.write_string(row, 2, &record.description)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
