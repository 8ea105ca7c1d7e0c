use serde::{Deserialize, Serialize};

use datafill_core::{Constraint, Dialect, Schema, build_fk_graph_report};

/// Top-level metrics report for a parsed schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMetrics {
    pub schema_version: String,
    pub dialect: Dialect,
    pub counts: SchemaCounts,
    pub coverage: CoverageMetrics,
    pub fk_graph: FkGraphMetrics,
    pub warnings: Vec<String>,
}

/// Count summary for schema objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCounts {
    pub tables: usize,
    pub columns: usize,
    pub constraints: ConstraintCounts,
}

/// Count summary for constraint types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintCounts {
    pub primary_keys: usize,
    pub foreign_keys: usize,
    pub unique: usize,
    pub checks: usize,
}

/// Coverage metrics for the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub tables_with_pk_pct: f64,
    pub tables_with_fk_pct: f64,
    pub columns_not_null_pct: f64,
}

/// FK graph metrics for the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphMetrics {
    pub edges: usize,
    pub self_references: usize,
    pub has_cycle: bool,
    pub cycle: Option<Vec<String>>,
    pub topo_order: Option<Vec<String>>,
    /// Nullable FKs left null to break a cycle, as `table.fk`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<String>,
}

/// Collect metrics for a parsed schema.
pub fn collect_schema_metrics(schema: &Schema) -> SchemaMetrics {
    let mut counts = SchemaCounts::default();
    let mut tables_with_pk = 0usize;
    let mut tables_with_fk = 0usize;
    let mut not_null_columns = 0usize;
    let mut warnings = Vec::new();

    for table in &schema.tables {
        counts.tables += 1;
        counts.columns += table.columns.len();
        not_null_columns += table.columns.iter().filter(|col| !col.is_nullable).count();

        let mut has_pk = false;
        let mut has_fk = false;
        for constraint in &table.constraints {
            match constraint {
                Constraint::PrimaryKey(_) => {
                    counts.constraints.primary_keys += 1;
                    has_pk = true;
                }
                Constraint::ForeignKey(_) => {
                    counts.constraints.foreign_keys += 1;
                    has_fk = true;
                }
                Constraint::Unique(_) => counts.constraints.unique += 1,
                Constraint::Check(_) => counts.constraints.checks += 1,
            }
        }

        if has_pk {
            tables_with_pk += 1;
        } else {
            warnings.push(format!("table '{}' has no primary key", table.name));
        }
        if has_fk {
            tables_with_fk += 1;
        }
    }

    let coverage = CoverageMetrics {
        tables_with_pk_pct: ratio(tables_with_pk, counts.tables),
        tables_with_fk_pct: ratio(tables_with_fk, counts.tables),
        columns_not_null_pct: ratio(not_null_columns, counts.columns),
    };

    let graph_report = build_fk_graph_report(schema);
    let fk_graph = FkGraphMetrics {
        edges: graph_report.summary.edges,
        self_references: graph_report.summary.self_references,
        has_cycle: graph_report.cycle.is_some(),
        cycle: graph_report.cycle,
        topo_order: graph_report.topo_order,
        deferred: graph_report
            .deferred
            .iter()
            .map(|edge| format!("{}.{}", edge.table, edge.foreign_key))
            .collect(),
    };

    SchemaMetrics {
        schema_version: schema.schema_version.clone(),
        dialect: schema.dialect,
        counts,
        coverage,
        fk_graph,
        warnings,
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64
    } else {
        0.0
    }
}
