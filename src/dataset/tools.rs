//! The callable analysis tools exposed to the hosted model.
//!
//! Every tool returns a uniform JSON envelope
//! `{status: "success"|"error", result?, message?, error_message?}` instead
//! of a Rust error, so a single failing tool call never aborts the
//! surrounding conversation turn.

use serde_json::{json, Value};

use super::{ColumnValues, Dataset};

/// Cap for inline diagnostic detail on tool errors.
const MAX_DEBUG_CHARS: usize = 500;

/// Aggregation kinds accepted by the filter/group tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum,
    Mean,
    Count,
    Max,
    Min,
}

impl Agg {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "sum" => Some(Agg::Sum),
            "mean" => Some(Agg::Mean),
            "count" => Some(Agg::Count),
            "max" => Some(Agg::Max),
            "min" => Some(Agg::Min),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Agg::Sum => "sum",
            Agg::Mean => "mean",
            Agg::Count => "count",
            Agg::Max => "max",
            Agg::Min => "min",
        }
    }

    fn capitalized(self) -> &'static str {
        match self {
            Agg::Sum => "Sum",
            Agg::Mean => "Mean",
            Agg::Count => "Count",
            Agg::Max => "Max",
            Agg::Min => "Min",
        }
    }

    pub(crate) fn apply(self, values: &[f64]) -> f64 {
        match self {
            Agg::Sum => values.iter().sum(),
            Agg::Mean => {
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Agg::Count => values.len() as f64,
            Agg::Max => values.iter().copied().fold(f64::NAN, f64::max),
            Agg::Min => values.iter().copied().fold(f64::NAN, f64::min),
        }
    }
}

/// Tool dispatcher bound to one dataset.
pub struct DataTools<'a> {
    ds: &'a Dataset,
}

impl<'a> DataTools<'a> {
    pub fn new(ds: &'a Dataset) -> Self {
        Self { ds }
    }

    /// Names of the tools this dispatcher understands, in declaration order.
    pub const TOOL_NAMES: [&'static str; 8] = [
        "calculate_mean",
        "calculate_median",
        "sum_column",
        "filter_by_date_range",
        "get_dataframe_info",
        "filter_and_aggregate",
        "group_by_and_aggregate",
        "get_available_capabilities",
    ];

    /// Route a named tool invocation.  Unknown tools and missing parameters
    /// come back as error envelopes, never as Rust errors.
    pub fn dispatch(&self, name: &str, args: &Value) -> Value {
        let str_arg = |key: &str| args.get(key).and_then(Value::as_str);
        let required = |key: &str| {
            str_arg(key).ok_or_else(|| {
                error(format!("Missing required parameter '{key}' for tool '{name}'"))
            })
        };

        let run = || -> Result<Value, Value> {
            match name {
                "calculate_mean" => Ok(self.calculate_mean(required("column")?)),
                "calculate_median" => Ok(self.calculate_median(required("column")?)),
                "sum_column" => Ok(self.sum_column(
                    required("column")?,
                    str_arg("filter_column"),
                    str_arg("filter_value"),
                )),
                "filter_by_date_range" => Ok(self.filter_by_date_range(
                    required("date_column")?,
                    required("start_date")?,
                    required("end_date")?,
                )),
                "get_dataframe_info" => Ok(self.get_dataframe_info()),
                "filter_and_aggregate" => Ok(self.filter_and_aggregate(
                    required("filter_column")?,
                    required("filter_value")?,
                    required("aggregate_column")?,
                    required("aggregation")?,
                )),
                "group_by_and_aggregate" => Ok(self.group_by_and_aggregate(
                    required("group_column")?,
                    required("aggregate_column")?,
                    str_arg("aggregation").unwrap_or("sum"),
                )),
                "get_available_capabilities" => Ok(self.get_available_capabilities()),
                other => Ok(error(format!("Unknown tool '{other}'"))),
            }
        };
        run().unwrap_or_else(|e| e)
    }

    pub fn calculate_mean(&self, column: &str) -> Value {
        match self.numeric_column(column) {
            Ok(values) => {
                if values.is_empty() {
                    return error(format!(
                        "Error calculating mean: column '{column}' has no numeric values"
                    ));
                }
                let mean = Agg::Mean.apply(&values);
                success(json!(mean), format!("Mean of {column}: {mean:.2}"))
            }
            Err(detail) => error(format!("Error calculating mean: {detail}")),
        }
    }

    pub fn calculate_median(&self, column: &str) -> Value {
        match self.numeric_column(column) {
            Ok(mut values) => {
                if values.is_empty() {
                    return error(format!(
                        "Error calculating median: column '{column}' has no numeric values"
                    ));
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let n = values.len();
                let median = if n % 2 == 1 {
                    values[n / 2]
                } else {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                };
                success(json!(median), format!("Median of {column}: {median:.2}"))
            }
            Err(detail) => error(format!("Error calculating median: {detail}")),
        }
    }

    pub fn sum_column(
        &self,
        column: &str,
        filter_column: Option<&str>,
        filter_value: Option<&str>,
    ) -> Value {
        let result = || -> Result<Value, String> {
            if let (Some(fc), Some(fv)) = (filter_column, filter_value) {
                let fidx = self.column_index(fc)?;
                let cidx = self.column_index(column)?;
                let mask = self.ds.eq_mask(fidx, fv);
                let values = self
                    .ds
                    .numeric_values_masked(cidx, &mask)
                    .ok_or_else(|| not_numeric(column, self.ds))?;
                let sum: f64 = values.iter().sum();
                Ok(success(
                    json!(sum),
                    format!("Sum of {column} where {fc} = {fv}: {sum:.2}"),
                ))
            } else {
                let cidx = self.column_index(column)?;
                let values = self
                    .ds
                    .numeric_values(cidx)
                    .ok_or_else(|| not_numeric(column, self.ds))?;
                let sum: f64 = values.iter().sum();
                Ok(success(json!(sum), format!("Sum of {column}: {sum:.2}")))
            }
        };
        result().unwrap_or_else(|detail| error(format!("Error calculating sum: {detail}")))
    }

    /// Inclusive range filter over a date-like column.  Dates are compared
    /// lexicographically, which is correct for ISO `YYYY-MM-DD` strings.
    pub fn filter_by_date_range(&self, date_column: &str, start: &str, end: &str) -> Value {
        let idx = match self.column_index(date_column) {
            Ok(i) => i,
            Err(detail) => {
                return error(format!("Error filtering by date range: {detail}"));
            }
        };
        let matching: Vec<usize> = (0..self.ds.rows())
            .filter(|&r| {
                let cell = self.ds.cell_display(idx, r);
                !cell.is_empty() && cell.as_str() >= start && cell.as_str() <= end
            })
            .collect();
        let count = matching.len();
        let records = self.ds.records(matching);
        json!({
            "status": "success",
            "result": count,
            "filtered_records": records,
            "message": format!(
                "Found {count} records in the date range from {start} to {end}"
            ),
        })
    }

    pub fn get_dataframe_info(&self) -> Value {
        let rows = self.ds.rows();
        let cols = self.ds.columns.len();
        success(
            json!({
                "columns": self.ds.column_names(),
                "rows": rows,
                "dtypes": self.ds.dtypes(),
                "sample_data": self.ds.preview(5),
            }),
            format!(
                "Dataframe has {rows} rows and {cols} columns: {}",
                self.ds.column_list()
            ),
        )
    }

    pub fn filter_and_aggregate(
        &self,
        filter_column: &str,
        filter_value: &str,
        aggregate_column: &str,
        aggregation: &str,
    ) -> Value {
        let result = || -> Result<Value, Value> {
            let fidx = self
                .column_index(filter_column)
                .map_err(|d| error(format!("Error in filter and aggregate: {d}")))?;
            let mask = self.ds.eq_mask(fidx, filter_value);
            if !mask.iter().any(|&m| m) {
                return Err(error(format!(
                    "No records found where {filter_column} = {filter_value}"
                )));
            }
            let agg = Agg::parse(aggregation).ok_or_else(invalid_aggregation)?;
            let aidx = self
                .column_index(aggregate_column)
                .map_err(|d| error(format!("Error in filter and aggregate: {d}")))?;
            let value = self
                .aggregate_masked(aidx, &mask, agg)
                .map_err(|d| error(format!("Error in filter and aggregate: {d}")))?;
            Ok(success(
                json!(value),
                format!(
                    "{} of {aggregate_column} where {filter_column} = {filter_value}: {value:.2}",
                    agg.capitalized()
                ),
            ))
        };
        result().unwrap_or_else(|e| e)
    }

    pub fn group_by_and_aggregate(
        &self,
        group_column: &str,
        aggregate_column: &str,
        aggregation: &str,
    ) -> Value {
        let group_idx = match self.ds.resolve_column(group_column) {
            Some(i) => i,
            None => return error(column_not_found(group_column, self.ds)),
        };
        let agg_idx = match self.ds.resolve_column(aggregate_column) {
            Some(i) => i,
            None => return error(column_not_found(aggregate_column, self.ds)),
        };
        let agg = match Agg::parse(aggregation) {
            Some(a) => a,
            None => return invalid_aggregation(),
        };

        // Rows with a missing group key are dropped, matching pandas groupby.
        let mut groups: std::collections::BTreeMap<String, Vec<bool>> = Default::default();
        for r in 0..self.ds.rows() {
            let key = self.ds.cell_display(group_idx, r);
            if key.is_empty() {
                continue;
            }
            let mask = groups
                .entry(key)
                .or_insert_with(|| vec![false; self.ds.rows()]);
            mask[r] = true;
        }

        let group_name = self.ds.columns[group_idx].name.clone();
        let agg_name = self.ds.columns[agg_idx].name.clone();
        let mut raw = serde_json::Map::new();
        let mut grouped_data = Vec::new();
        for (key, mask) in &groups {
            let value = match self.aggregate_masked(agg_idx, mask, agg) {
                Ok(v) => v,
                Err(detail) => {
                    return error_with_debug(
                        format!("Error in group by and aggregate: {detail}"),
                        &detail,
                    );
                }
            };
            // Non-finite aggregates normalize to zero.
            let value = if value.is_finite() { value } else { 0.0 };
            raw.insert(key.clone(), json!(value));
            let mut record = serde_json::Map::new();
            record.insert(group_name.clone(), json!(key));
            record.insert(format!("{}_{agg_name}", agg.label()), json!(value));
            grouped_data.push(Value::Object(record));
        }

        json!({
            "status": "success",
            "result": raw,
            "message": format!(
                "{} of {agg_name} grouped by {group_name}",
                agg.capitalized()
            ),
            "grouped_data": grouped_data,
            "summary": format!("Found {} groups", groups.len()),
        })
    }

    pub fn get_available_capabilities(&self) -> Value {
        json!({
            "status": "success",
            "agent_type": "CSV Data Analysis Agent",
            "capabilities": [
                "Calculate statistical measures (mean, median, sum) for numeric columns",
                "Filter data by date ranges or specific conditions",
                "Aggregate data (sum, mean, count, max, min) with filters",
                "Group data by time periods (month, year) or categories and aggregate",
                "Provide information about the dataset structure and columns",
                "Answer questions about the uploaded CSV data",
            ],
            "available_tools": [
                "calculate_mean - Calculate average of numeric columns",
                "calculate_median - Calculate median of numeric columns",
                "sum_column - Calculate sum of numeric columns (with optional filters)",
                "filter_by_date_range - Filter data by date ranges",
                "filter_and_aggregate - Filter and aggregate data in one operation",
                "group_by_and_aggregate - Group by month/category and aggregate (e.g., sales by month)",
                "get_dataframe_info - Get dataset structure and sample data",
            ],
            "dataset_info": {
                "total_rows": self.ds.rows(),
                "total_columns": self.ds.columns.len(),
                "numeric_columns": self.ds.numeric_column_names(),
                "all_columns": self.ds.column_names(),
            },
            "message": "I am a specialized CSV Data Analysis Agent. I can help you analyze \
                        your uploaded CSV data using various statistical and filtering tools.",
        })
    }

    // ── helpers ──────────────────────────────────────────────────────────────

    fn column_index(&self, name: &str) -> Result<usize, String> {
        self.ds
            .find_column(name)
            .or_else(|| {
                let wanted = name.to_lowercase();
                self.ds
                    .columns
                    .iter()
                    .position(|c| c.name.to_lowercase() == wanted)
            })
            .ok_or_else(|| column_not_found(name, self.ds))
    }

    fn numeric_column(&self, name: &str) -> Result<Vec<f64>, String> {
        let idx = self.column_index(name)?;
        self.ds
            .numeric_values(idx)
            .ok_or_else(|| not_numeric(name, self.ds))
    }

    /// Apply `agg` to the rows of column `idx` selected by `mask`.  `count`
    /// counts non-null cells of any dtype; the other kinds need numbers.
    fn aggregate_masked(&self, idx: usize, mask: &[bool], agg: Agg) -> Result<f64, String> {
        if agg == Agg::Count {
            let count = match &self.ds.columns[idx].values {
                ColumnValues::Int(v) => v.iter().zip(mask).filter(|(x, &m)| m && x.is_some()).count(),
                ColumnValues::Float(v) => v.iter().zip(mask).filter(|(x, &m)| m && x.is_some()).count(),
                ColumnValues::Str(v) => v.iter().zip(mask).filter(|(x, &m)| m && x.is_some()).count(),
            };
            return Ok(count as f64);
        }
        let values = self
            .ds
            .numeric_values_masked(idx, mask)
            .ok_or_else(|| not_numeric(&self.ds.columns[idx].name, self.ds))?;
        Ok(agg.apply(&values))
    }
}

fn success(result: Value, message: String) -> Value {
    json!({ "status": "success", "result": result, "message": message })
}

fn error(message: String) -> Value {
    json!({ "status": "error", "error_message": message })
}

fn error_with_debug(message: String, debug: &str) -> Value {
    let debug: String = debug.chars().take(MAX_DEBUG_CHARS).collect();
    json!({ "status": "error", "error_message": message, "debug": debug })
}

fn invalid_aggregation() -> Value {
    error("Invalid aggregation type. Must be one of: sum, mean, count, max, min".into())
}

fn column_not_found(name: &str, ds: &Dataset) -> String {
    format!(
        "Column '{name}' not found. Available columns: {}",
        ds.column_list()
    )
}

fn not_numeric(name: &str, ds: &Dataset) -> String {
    let dtype = ds
        .find_column(name)
        .map(|i| ds.columns[i].values.dtype_label())
        .unwrap_or("object");
    format!("column '{name}' is not numeric (dtype {dtype})")
}
