//! Local keyword heuristics used when the hosted model is unavailable.
//!
//! Best-effort: scan the query for `mean`/`average`, `sum`/`total`, or
//! `column`, and answer directly from numeric columns whose name appears in
//! the query (or from the single numeric column when there is only one).

use crate::dataset::{tools::Agg, Dataset};

pub fn answer(query: &str, dataset: &Dataset, failure_detail: &str) -> String {
    let q = query.to_lowercase();
    let numeric: Vec<&str> = dataset.numeric_column_names();

    if q.contains("mean") || q.contains("average") {
        let lines = matching_lines(dataset, &numeric, &q, Agg::Mean, "Mean", false);
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }

    if q.contains("sum") || q.contains("total") {
        // The sales/revenue nudge mirrors the common case of money columns
        // being asked about by synonym rather than by exact name.
        let broad = q.contains("sales") || q.contains("revenue");
        let lines = matching_lines(dataset, &numeric, &q, Agg::Sum, "Sum", broad);
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }

    if q.contains("column") {
        return format!(
            "The dataset has {} columns: {}",
            dataset.columns.len(),
            dataset.column_list()
        );
    }

    format!(
        "I encountered an error processing your query: {failure_detail}. Please try \
         rephrasing your question or check if the data contains the columns you're \
         asking about."
    )
}

fn matching_lines(
    dataset: &Dataset,
    numeric: &[&str],
    query_lower: &str,
    agg: Agg,
    label: &str,
    include_all: bool,
) -> Vec<String> {
    numeric
        .iter()
        .filter(|name| {
            include_all || query_lower.contains(&name.to_lowercase()) || numeric.len() == 1
        })
        .filter_map(|name| {
            let idx = dataset.find_column(name)?;
            let values = dataset.numeric_values(idx)?;
            if values.is_empty() {
                return None;
            }
            let value = agg.apply(&values);
            Some(format!("{label} of {name}: {value:.2}"))
        })
        .collect()
}
