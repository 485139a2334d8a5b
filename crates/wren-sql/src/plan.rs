//! Evaluation plans: table scan, selection, and projection.
//!
//! A plan is a small tree evaluated bottom-up. [`EvalPlan::pipeline`]
//! produces the (table, handle list) pair feeding the root projection and
//! pushes an equality conjunction into the table's filtered scan when the
//! selection sits directly over it; stacked selections re-filter the
//! previous handle list instead. Only a projection may sit at the root.

use wren_common::error::{DbError, DbResult};
use wren_common::types::{Handle, Row};
use wren_storage::heap::HeapTable;

/// A query evaluation plan.
#[derive(Debug)]
pub enum EvalPlan {
    /// Scan every live row of a table.
    TableScan(HeapTable),
    /// Keep rows matching an equality conjunction.
    Select {
        /// Column-to-value equality pairs, all of which must match.
        conjunction: Row,
        /// Plan producing the candidate rows.
        source: Box<EvalPlan>,
    },
    /// Project the named columns.
    Project {
        /// Columns to keep, in output order.
        column_names: Vec<String>,
        /// Plan producing the rows.
        source: Box<EvalPlan>,
    },
    /// Project all columns.
    ProjectAll {
        /// Plan producing the rows.
        source: Box<EvalPlan>,
    },
}

impl EvalPlan {
    /// Rewrites the plan into a cheaper equivalent.
    ///
    /// Identity for now; the conjunction pushdown happens structurally in
    /// [`EvalPlan::pipeline`].
    #[must_use]
    pub fn optimize(self) -> EvalPlan {
        self
    }

    /// Evaluates the plan to a list of rows.
    ///
    /// Fails with [`DbError::InvalidPlan`] unless the root is a projection.
    pub fn evaluate(&mut self) -> DbResult<Vec<Row>> {
        match self {
            EvalPlan::Project {
                column_names,
                source,
            } => {
                let (table, handles) = source.pipeline()?;
                handles
                    .iter()
                    .map(|&handle| table.project_columns(handle, column_names))
                    .collect()
            }
            EvalPlan::ProjectAll { source } => {
                let (table, handles) = source.pipeline()?;
                handles
                    .iter()
                    .map(|&handle| table.project(handle))
                    .collect()
            }
            _ => Err(DbError::InvalidPlan(
                "evaluation plan does not end with a projection",
            )),
        }
    }

    /// Produces the (table, handles) pair a projection consumes.
    ///
    /// A selection directly over a table scan becomes the table's filtered
    /// select; a selection over anything else narrows the handle list the
    /// inner pipeline produced.
    pub fn pipeline(&mut self) -> DbResult<(&mut HeapTable, Vec<Handle>)> {
        match self {
            EvalPlan::TableScan(table) => {
                let handles = table.select()?;
                Ok((table, handles))
            }
            EvalPlan::Select {
                conjunction,
                source,
            } => match source.as_mut() {
                EvalPlan::TableScan(table) => {
                    let handles = table.select_where(conjunction)?;
                    Ok((table, handles))
                }
                nested => {
                    let (table, handles) = nested.pipeline()?;
                    let narrowed = table.select_from(&handles, conjunction)?;
                    Ok((table, narrowed))
                }
            },
            _ => Err(DbError::InvalidPlan(
                "only selections and table scans can feed a pipeline",
            )),
        }
    }
}
