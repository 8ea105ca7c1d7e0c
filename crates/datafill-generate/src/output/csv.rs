use datafill_core::Table;

use crate::model::Row;

/// Render a table as CSV with a header row and declared column order.
/// NULL is written as an empty field.
pub fn table_to_csv(table: &Table, rows: &[Row]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    let mut columns = table.columns.clone();
    columns.sort_by_key(|col| col.ordinal_position);

    let header: Vec<&str> = columns.iter().map(|col| col.name.as_str()).collect();
    writer.write_record(&header)?;

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|col| {
                row.get(&col.name)
                    .map(|value| value.render(col))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|err| err.into_error().into())
}
