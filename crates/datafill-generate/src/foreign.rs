use std::collections::BTreeMap;

use rand::Rng;
use rand::RngCore;
use rand::seq::SliceRandom;

use datafill_core::{ForeignKey, GenerationOrder, Table};

use crate::errors::GenerationError;
use crate::generators::GeneratedValue;
use crate::model::Row;

/// Rows of completed tables, keyed by lowercased table name.
#[derive(Debug, Default)]
pub struct ParentRows {
    tables: BTreeMap<String, Vec<Row>>,
}

impl ParentRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, table: &str, rows: Vec<Row>) {
        self.tables.insert(table.to_lowercase(), rows);
    }

    /// Rows of a generated table; `None` until the table is ingested.
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(&table.to_lowercase()).map(Vec::as_slice)
    }

    pub fn take(&mut self, table: &str) -> Option<Vec<Row>> {
        self.tables.remove(&table.to_lowercase())
    }
}

enum Source<'a> {
    /// Left null: deferred to break a cycle, or an optional FK whose parent
    /// has no rows.
    Null,
    /// Row `i` references row `i - offset` of the same table.
    SelfReference { offset: Option<u64> },
    Sample { parents: &'a [Row] },
    /// Parent rows dealt without replacement.
    Deal {
        parents: &'a [Row],
        deck: Vec<usize>,
        cursor: usize,
    },
}

struct ForeignKeyPlan<'a> {
    fk: &'a ForeignKey,
    source: Source<'a>,
}

/// Fills the foreign-key columns of one child table.
pub struct ForeignKeyFiller<'a> {
    plans: Vec<ForeignKeyPlan<'a>>,
}

impl<'a> ForeignKeyFiller<'a> {
    /// Decide how every FK of `table` is filled for `rows` rows.
    ///
    /// Fails before the first row when a NOT NULL FK has no parent rows, or
    /// when a dealt FK has fewer parent rows than requested rows.
    pub fn new(
        table: &'a Table,
        order: &GenerationOrder,
        parents: &'a ParentRows,
        self_reference_offset: Option<u64>,
        rows: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Self, GenerationError> {
        let mut plans = Vec::new();
        for fk in table.foreign_keys() {
            let required = is_required(table, fk);
            let source = if fk.references(&table.name) {
                Source::SelfReference {
                    offset: self_reference_offset,
                }
            } else if order.is_deferred(&table.name, &fk.label()) {
                Source::Null
            } else {
                let parent_rows = parents.rows(&fk.referenced_table).unwrap_or(&[]);
                if parent_rows.is_empty() {
                    if required && rows > 0 {
                        return Err(GenerationError::MissingParentRows {
                            table: table.name.clone(),
                            foreign_key: fk.label(),
                            parent: fk.referenced_table.clone(),
                        });
                    }
                    Source::Null
                } else if table.is_unique_tuple(&fk.columns) {
                    if required && rows > parent_rows.len() as u64 {
                        return Err(GenerationError::InsufficientPool {
                            table: table.name.clone(),
                            column: fk.columns.join(", "),
                            pool_size: parent_rows.len(),
                            required: rows,
                        });
                    }
                    let mut deck: Vec<usize> = (0..parent_rows.len()).collect();
                    deck.shuffle(&mut *rng);
                    Source::Deal {
                        parents: parent_rows,
                        deck,
                        cursor: 0,
                    }
                } else {
                    Source::Sample {
                        parents: parent_rows,
                    }
                }
            };
            plans.push(ForeignKeyPlan { fk, source });
        }
        Ok(Self { plans })
    }

    /// Labels of FKs that are always null for this table.
    pub fn null_foreign_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.plans.iter().filter_map(|plan| match plan.source {
            Source::Null | Source::SelfReference { offset: None } => Some(plan.fk.label()),
            _ => None,
        })
    }

    /// Set FK columns of `row`. Columns already set by an earlier FK are
    /// left alone.
    pub fn fill(
        &self,
        row: &mut Row,
        row_index: u64,
        committed: &[Row],
        rng: &mut dyn RngCore,
    ) {
        for plan in &self.plans {
            let parent = match &plan.source {
                Source::Null => None,
                Source::SelfReference { offset } => offset
                    .and_then(|offset| row_index.checked_sub(offset))
                    .and_then(|index| committed.get(index as usize)),
                Source::Sample { parents } => parents.get(rng.random_range(0..parents.len())),
                Source::Deal {
                    parents,
                    deck,
                    cursor,
                } => deck.get(*cursor).and_then(|index| parents.get(*index)),
            };
            copy_key(plan.fk, parent, row);
        }
    }

    /// Advance dealt FKs after a row is committed.
    pub fn commit(&mut self) {
        for plan in &mut self.plans {
            if let Source::Deal { cursor, .. } = &mut plan.source {
                *cursor += 1;
            }
        }
    }
}

fn copy_key(fk: &ForeignKey, parent: Option<&Row>, row: &mut Row) {
    for (child, referenced) in fk.columns.iter().zip(&fk.referenced_columns) {
        if row.contains(child) {
            continue;
        }
        let value = parent
            .and_then(|parent| parent.get(referenced))
            .cloned()
            .unwrap_or(GeneratedValue::Null);
        row.set(child, value);
    }
}

/// An FK is required when any of its columns is NOT NULL.
pub fn is_required(table: &Table, fk: &ForeignKey) -> bool {
    fk.columns.iter().any(|name| {
        table
            .column(name)
            .map(|column| !column.is_nullable)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafill_core::{Column, Constraint, DataType, PrimaryKey, UniqueConstraint};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn parent_rows(count: i64) -> Vec<Row> {
        (1..=count)
            .map(|id| {
                let mut row = Row::new();
                row.set("id", GeneratedValue::Int(id));
                row
            })
            .collect()
    }

    fn child(unique: bool, nullable: bool) -> Table {
        let mut table = Table::new("child");
        table.columns.push(Column::new(1, "id", DataType::integer()));
        let mut parent_id = Column::new(2, "parent_id", DataType::integer());
        parent_id.is_nullable = nullable;
        table.columns.push(parent_id);
        table.constraints.push(Constraint::PrimaryKey(PrimaryKey {
            name: None,
            columns: vec!["id".to_string()],
        }));
        if unique {
            table.constraints.push(Constraint::Unique(UniqueConstraint {
                name: None,
                columns: vec!["parent_id".to_string()],
            }));
        }
        table.constraints.push(Constraint::ForeignKey(ForeignKey {
            name: Some("fk_child_parent".to_string()),
            columns: vec!["parent_id".to_string()],
            referenced_table: "parent".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_update: Default::default(),
            on_delete: Default::default(),
        }));
        table
    }

    fn order() -> GenerationOrder {
        GenerationOrder {
            tables: vec!["parent".to_string(), "child".to_string()],
            deferred: Vec::new(),
        }
    }

    #[test]
    fn sampled_values_come_from_parent_rows() {
        let table = child(false, false);
        let mut parents = ParentRows::new();
        parents.ingest("Parent", parent_rows(3));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let filler = ForeignKeyFiller::new(&table, &order(), &parents, None, 50, &mut rng).unwrap();
        for index in 0..50 {
            let mut row = Row::new();
            filler.fill(&mut row, index, &[], &mut rng);
            let value = row.get("parent_id").and_then(GeneratedValue::as_i64).unwrap();
            assert!((1..=3).contains(&value));
        }
    }

    #[test]
    fn unique_foreign_keys_are_dealt_once() {
        let table = child(true, false);
        let mut parents = ParentRows::new();
        parents.ingest("parent", parent_rows(4));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut filler =
            ForeignKeyFiller::new(&table, &order(), &parents, None, 4, &mut rng).unwrap();
        let mut seen = Vec::new();
        for index in 0..4 {
            let mut row = Row::new();
            filler.fill(&mut row, index, &[], &mut rng);
            seen.push(row.get("parent_id").and_then(GeneratedValue::as_i64).unwrap());
            filler.commit();
        }
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4]);

        let err = ForeignKeyFiller::new(&table, &order(), &parents, None, 5, &mut rng)
            .err()
            .unwrap();
        assert!(matches!(err, GenerationError::InsufficientPool { pool_size: 4, required: 5, .. }));
    }

    #[test]
    fn empty_parent_is_an_error_only_for_required_keys() {
        let mut parents = ParentRows::new();
        parents.ingest("parent", Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let required = child(false, false);
        let err = ForeignKeyFiller::new(&required, &order(), &parents, None, 1, &mut rng)
            .err()
            .unwrap();
        assert!(matches!(err, GenerationError::MissingParentRows { parent, .. } if parent == "parent"));

        let optional = child(false, true);
        let filler = ForeignKeyFiller::new(&optional, &order(), &parents, None, 1, &mut rng).unwrap();
        let mut row = Row::new();
        filler.fill(&mut row, 0, &[], &mut rng);
        assert_eq!(row.get("parent_id"), Some(&GeneratedValue::Null));
        assert_eq!(filler.null_foreign_keys().collect::<Vec<_>>(), vec!["fk_child_parent"]);
    }
}
