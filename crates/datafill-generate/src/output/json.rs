use serde_json::{Map, Value};

use datafill_core::Table;

use crate::model::Row;

/// Render a table as a pretty JSON array of row objects. Keys follow the
/// declared column order.
pub fn table_to_json(table: &Table, rows: &[Row]) -> Result<Vec<u8>, serde_json::Error> {
    let mut columns: Vec<_> = table.columns.iter().collect();
    columns.sort_by_key(|col| col.ordinal_position);

    let objects: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for col in &columns {
                let value = row
                    .get(&col.name)
                    .map(|value| value.to_json(col))
                    .unwrap_or(Value::Null);
                object.insert(col.name.clone(), value);
            }
            Value::Object(object)
        })
        .collect();

    let mut bytes = serde_json::to_vec_pretty(&objects)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratedValue;
    use chrono::NaiveDate;
    use datafill_core::{Column, DataType};
    use serde_json::json;

    #[test]
    fn rows_become_ordered_objects() {
        let mut table = Table::new("loans");
        table.columns.push(Column::new(1, "loan_id", DataType::integer()));
        table.columns.push(Column::new(2, "loan_date", DataType::Date));
        table.columns.push(Column::new(
            3,
            "fee",
            DataType::Decimal {
                precision: Some(5),
                scale: Some(2),
            },
        ));
        table.columns.push(Column::new(4, "return_date", DataType::Date));

        let mut row = Row::new();
        row.set("loan_id", GeneratedValue::Int(1));
        row.set(
            "loan_date",
            GeneratedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
        );
        row.set("fee", GeneratedValue::Float(1.005_1));
        row.set("return_date", GeneratedValue::Null);

        let bytes = table_to_json(&table, &[row]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!([{ "loan_id": 1, "loan_date": "2024-03-05", "fee": 1.01, "return_date": null }])
        );
        let keys: Vec<_> = parsed[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["loan_id", "loan_date", "fee", "return_date"]);
    }
}
