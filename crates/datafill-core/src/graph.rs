use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{Schema, Table};

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub self_references: usize,
}

/// Report for FK dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    pub topo_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<DeferredEdge>,
    pub cycle: Option<Vec<String>>,
}

/// A nullable foreign key that had to be ignored to break a cycle.
///
/// Rows of `table` are generated before `referenced_table`, so the FK
/// columns are left null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEdge {
    pub table: String,
    pub foreign_key: String,
    pub referenced_table: String,
}

/// Dependency-respecting order in which tables are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOrder {
    pub tables: Vec<String>,
    pub deferred: Vec<DeferredEdge>,
}

impl GenerationOrder {
    /// Whether the FK `label` of `table` was deferred.
    pub fn is_deferred(&self, table: &str, label: &str) -> bool {
        self.deferred
            .iter()
            .any(|edge| edge.table.eq_ignore_ascii_case(table) && edge.foreign_key == label)
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|name| name.eq_ignore_ascii_case(table))
    }
}

#[derive(Debug, Clone)]
struct Edge {
    child: usize,
    parent: usize,
    required: bool,
    label: String,
}

/// Compute the generation order for a schema.
///
/// Every table is placed after the tables its NOT-NULL foreign keys
/// reference; ties are broken by declaration order.
pub fn order(schema: &Schema) -> Result<Vec<String>> {
    plan_order(schema).map(|order| order.tables)
}

/// Compute the generation order along with the nullable edges that had to
/// be deferred to break cycles.
pub fn plan_order(schema: &Schema) -> Result<GenerationOrder> {
    let (edges, self_refs) = collect_edges(schema);

    if let Some(table) = self_refs
        .iter()
        .find(|(_, required)| *required)
        .map(|(index, _)| &schema.tables[*index])
    {
        return Err(Error::CyclicDependency {
            cycle: vec![table.name.clone(), table.name.clone()],
        });
    }

    toposort(schema, &edges)
}

/// Build a deterministic FK dependency report for a schema.
pub fn build_fk_graph_report(schema: &Schema) -> FkGraphReport {
    let (edges, self_refs) = collect_edges(schema);
    let summary = FkGraphSummary {
        nodes: schema.tables.len(),
        edges: edges.len(),
        self_references: self_refs.len(),
    };

    match plan_order(schema) {
        Ok(order) => FkGraphReport {
            summary,
            topo_order: Some(order.tables),
            deferred: order.deferred,
            cycle: None,
        },
        Err(Error::CyclicDependency { cycle }) => FkGraphReport {
            summary,
            topo_order: None,
            deferred: Vec::new(),
            cycle: Some(cycle),
        },
        Err(_) => FkGraphReport {
            summary,
            topo_order: None,
            deferred: Vec::new(),
            cycle: None,
        },
    }
}

/// Whether any local column of a foreign key is NOT NULL.
fn is_required(table: &Table, columns: &[String]) -> bool {
    columns.iter().any(|name| {
        table
            .column(name)
            .map(|column| !column.is_nullable)
            .unwrap_or(true)
    })
}

fn collect_edges(schema: &Schema) -> (Vec<Edge>, Vec<(usize, bool)>) {
    let mut edges = Vec::new();
    let mut self_refs = Vec::new();

    for (child, table) in schema.tables.iter().enumerate() {
        for fk in table.foreign_keys() {
            let Some(parent) = schema.table_index(&fk.referenced_table) else {
                continue;
            };
            let required = is_required(table, &fk.columns);
            if parent == child {
                self_refs.push((child, required));
                continue;
            }
            edges.push(Edge {
                child,
                parent,
                required,
                label: fk.label(),
            });
        }
    }

    edges.sort_by_key(|edge| (edge.child, edge.parent));
    (edges, self_refs)
}

fn toposort(schema: &Schema, edges: &[Edge]) -> Result<GenerationOrder> {
    let nodes = schema.tables.len();
    let mut satisfied = vec![false; edges.len()];
    let mut remaining = vec![0usize; nodes];
    for edge in edges {
        remaining[edge.child] += 1;
    }

    let mut placed = vec![false; nodes];
    let mut ready: BTreeSet<usize> = (0..nodes).filter(|idx| remaining[*idx] == 0).collect();
    let mut order = Vec::with_capacity(nodes);
    let mut deferred = Vec::new();

    loop {
        while let Some(node) = ready.pop_first() {
            placed[node] = true;
            order.push(schema.tables[node].name.clone());

            for (idx, edge) in edges.iter().enumerate() {
                if edge.parent != node || satisfied[idx] {
                    continue;
                }
                satisfied[idx] = true;
                remaining[edge.child] -= 1;
                if remaining[edge.child] == 0 && !placed[edge.child] {
                    ready.insert(edge.child);
                }
            }
        }

        if order.len() == nodes {
            break;
        }

        let breakable = (0..nodes).find(|node| {
            !placed[*node]
                && edges
                    .iter()
                    .enumerate()
                    .filter(|(idx, edge)| edge.child == *node && !satisfied[*idx])
                    .all(|(_, edge)| !edge.required)
        });

        let Some(node) = breakable else {
            return Err(Error::CyclicDependency {
                cycle: find_cycle(schema, edges, &satisfied, &placed),
            });
        };

        for (idx, edge) in edges.iter().enumerate() {
            if edge.child == node && !satisfied[idx] {
                satisfied[idx] = true;
                deferred.push(DeferredEdge {
                    table: schema.tables[edge.child].name.clone(),
                    foreign_key: edge.label.clone(),
                    referenced_table: schema.tables[edge.parent].name.clone(),
                });
            }
        }
        remaining[node] = 0;
        ready.insert(node);
    }

    Ok(GenerationOrder {
        tables: order,
        deferred,
    })
}

/// Walk unsatisfied required edges from the earliest unplaced table until a
/// table repeats, and return that closed path.
fn find_cycle(schema: &Schema, edges: &[Edge], satisfied: &[bool], placed: &[bool]) -> Vec<String> {
    let Some(start) = placed.iter().position(|done| !done) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = edges
            .iter()
            .enumerate()
            .find(|(idx, edge)| {
                edge.child == current && edge.required && !satisfied[*idx] && !placed[edge.parent]
            })
            .map(|(_, edge)| edge.parent);

        let Some(next) = next else {
            break;
        };
        if let Some(pos) = path.iter().position(|node| *node == next) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|idx| schema.tables[*idx].name.clone())
                .collect();
            cycle.push(schema.tables[next].name.clone());
            return cycle;
        }
        path.push(next);
        current = next;
    }

    path.iter()
        .map(|idx| schema.tables[*idx].name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraint, FkAction, ForeignKey, PrimaryKey};
    use crate::dialect::Dialect;
    use crate::schema::{Column, Table};
    use crate::types::DataType;

    fn table(name: &str, fks: &[(&str, &str, bool)]) -> Table {
        let mut table = Table::new(name);
        let mut id = Column::new(1, "id", DataType::integer());
        id.is_nullable = false;
        id.is_primary_key = true;
        table.columns.push(id);
        table.constraints.push(Constraint::PrimaryKey(PrimaryKey {
            name: None,
            columns: vec!["id".to_string()],
        }));
        for (idx, (column, target, nullable)) in fks.iter().enumerate() {
            let mut col = Column::new(idx as u16 + 2, *column, DataType::integer());
            col.is_nullable = *nullable;
            table.columns.push(col);
            table.constraints.push(Constraint::ForeignKey(ForeignKey {
                name: Some(format!("fk_{name}_{column}")),
                columns: vec![column.to_string()],
                referenced_table: target.to_string(),
                referenced_columns: vec!["id".to_string()],
                on_update: FkAction::NoAction,
                on_delete: FkAction::NoAction,
            }));
        }
        table
    }

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new(Dialect::Postgres);
        schema.tables = tables;
        schema
    }

    #[test]
    fn toposort_orders_dependencies() {
        let schema = schema(vec![
            table("Books", &[("author_id", "Authors", false)]),
            table("Authors", &[]),
        ]);
        assert_eq!(order(&schema).unwrap(), vec!["Authors", "Books"]);
    }

    #[test]
    fn independent_tables_keep_declaration_order() {
        let schema = schema(vec![
            table("zeta", &[]),
            table("alpha", &[]),
            table("loans", &[("book_id", "books", false), ("member_id", "members", false)]),
            table("members", &[]),
            table("books", &[("category_id", "alpha", false)]),
        ]);
        assert_eq!(
            order(&schema).unwrap(),
            vec!["zeta", "alpha", "members", "books", "loans"]
        );
    }

    #[test]
    fn self_reference_not_null_is_a_cycle() {
        let schema = schema(vec![table("employees", &[("manager_id", "employees", false)])]);
        match order(&schema) {
            Err(Error::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["employees", "employees"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn nullable_self_reference_is_tolerated() {
        let schema = schema(vec![table("employees", &[("manager_id", "employees", true)])]);
        let plan = plan_order(&schema).unwrap();
        assert_eq!(plan.tables, vec!["employees"]);
        assert!(plan.deferred.is_empty());
    }

    #[test]
    fn required_cycle_names_its_tables() {
        let schema = schema(vec![
            table("a", &[("b_id", "b", false)]),
            table("b", &[("a_id", "a", false)]),
            table("c", &[]),
        ]);
        let err = order(&schema).unwrap_err();
        match err {
            Error::CyclicDependency { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nullable_edge_is_deferred_to_break_cycle() {
        let schema = schema(vec![
            table("a", &[("b_id", "b", false)]),
            table("b", &[("a_id", "a", true)]),
        ]);
        let plan = plan_order(&schema).unwrap();
        assert_eq!(plan.tables, vec!["b", "a"]);
        assert_eq!(plan.deferred.len(), 1);
        assert!(plan.is_deferred("b", "fk_b_a_id"));
    }

    #[test]
    fn nullable_edge_is_respected_without_cycle() {
        let schema = schema(vec![
            table("loans", &[("member_id", "members", true)]),
            table("members", &[]),
        ]);
        let plan = plan_order(&schema).unwrap();
        assert_eq!(plan.tables, vec!["members", "loans"]);
        assert!(plan.deferred.is_empty());
    }

    #[test]
    fn report_exposes_cycle() {
        let schema = schema(vec![table("users", &[("owner_id", "users", false)])]);
        let report = build_fk_graph_report(&schema);
        assert!(report.topo_order.is_none());
        assert_eq!(report.summary.self_references, 1);
        assert!(report.cycle.unwrap().contains(&"users".to_string()));
    }
}
