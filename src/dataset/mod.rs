//! In-memory tabular dataset parsed from an uploaded CSV.
//!
//! Columns are typed at parse time the way pandas infers them: a column is
//! `int64` when every non-empty cell parses as an integer and no cell is
//! empty, `float64` when every non-empty cell parses as a number, and
//! `object` otherwise.  Empty cells are nulls and are skipped by aggregates.

pub mod blob;
pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Invalid CSV file: {0}")]
    Parse(String),

    #[error("CSV file contains no data")]
    Empty,
}

/// Per-column storage.  The serde tag doubles as the pandas dtype label so
/// the serialized form is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values")]
pub enum ColumnValues {
    #[serde(rename = "int64")]
    Int(Vec<Option<i64>>),
    #[serde(rename = "float64")]
    Float(Vec<Option<f64>>),
    #[serde(rename = "object")]
    Str(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype_label(&self) -> &'static str {
        match self {
            ColumnValues::Int(_) => "int64",
            ColumnValues::Float(_) => "float64",
            ColumnValues::Str(_) => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// The uploaded CSV's in-memory tabular representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
}

impl Dataset {
    /// Parse comma-delimited CSV text with a required header row.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(bytes);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| DatasetError::Parse(e.to_string()))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        if headers.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record.map_err(|e| DatasetError::Parse(e.to_string()))?;
            if record.len() != headers.len() {
                return Err(DatasetError::Parse(format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                )));
            }
            for (i, cell) in record.iter().enumerate() {
                raw[i].push(cell.to_string());
            }
        }

        if raw[0].is_empty() {
            return Err(DatasetError::Empty);
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column {
                values: infer_column(&cells),
                name,
            })
            .collect();
        Ok(Dataset { columns })
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column names joined for error messages, e.g. `"id, name, sales"`.
    pub fn column_list(&self) -> String {
        self.column_names().join(", ")
    }

    /// `{column: dtype_label}` map in column order.
    pub fn dtypes(&self) -> Value {
        let mut map = serde_json::Map::new();
        for c in &self.columns {
            map.insert(c.name.clone(), json!(c.values.dtype_label()));
        }
        Value::Object(map)
    }

    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !matches!(c.values, ColumnValues::Str(_)))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Exact-name lookup.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Case-insensitive fuzzy lookup: exact, then lowercase, then with
    /// spaces/underscores stripped, then best jaro-winkler match ≥ 0.85.
    pub fn resolve_column(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.find_column(name) {
            return Some(i);
        }
        let wanted = name.to_lowercase();
        if let Some(i) = self
            .columns
            .iter()
            .position(|c| c.name.to_lowercase() == wanted)
        {
            return Some(i);
        }
        let wanted_norm = normalize(name);
        if let Some(i) = self
            .columns
            .iter()
            .position(|c| normalize(&c.name) == wanted_norm)
        {
            return Some(i);
        }
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.columns.iter().enumerate() {
            let score = strsim::jaro_winkler(&wanted, &c.name.to_lowercase());
            if score >= 0.85 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Non-null values of a numeric column as f64, or `None` for `object`
    /// columns.
    pub fn numeric_values(&self, idx: usize) -> Option<Vec<f64>> {
        match &self.columns[idx].values {
            ColumnValues::Int(v) => Some(v.iter().flatten().map(|&x| x as f64).collect()),
            ColumnValues::Float(v) => Some(v.iter().flatten().copied().collect()),
            ColumnValues::Str(_) => None,
        }
    }

    /// Like [`numeric_values`](Self::numeric_values) but restricted to rows
    /// where `mask` is true.
    pub fn numeric_values_masked(&self, idx: usize, mask: &[bool]) -> Option<Vec<f64>> {
        match &self.columns[idx].values {
            ColumnValues::Int(v) => Some(
                v.iter()
                    .zip(mask)
                    .filter(|(_, &m)| m)
                    .filter_map(|(x, _)| x.map(|i| i as f64))
                    .collect(),
            ),
            ColumnValues::Float(v) => Some(
                v.iter()
                    .zip(mask)
                    .filter(|(_, &m)| m)
                    .filter_map(|(x, _)| *x)
                    .collect(),
            ),
            ColumnValues::Str(_) => None,
        }
    }

    /// Single cell as JSON (`null` for missing values).
    pub fn cell_json(&self, idx: usize, row: usize) -> Value {
        match &self.columns[idx].values {
            ColumnValues::Int(v) => v[row].map(|x| json!(x)).unwrap_or(Value::Null),
            ColumnValues::Float(v) => v[row].map(|x| json!(x)).unwrap_or(Value::Null),
            ColumnValues::Str(v) => v[row]
                .as_ref()
                .map(|x| json!(x))
                .unwrap_or(Value::Null),
        }
    }

    /// Single cell rendered as a display string (empty for missing values).
    pub fn cell_display(&self, idx: usize, row: usize) -> String {
        match &self.columns[idx].values {
            ColumnValues::Int(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnValues::Float(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnValues::Str(v) => v[row].clone().unwrap_or_default(),
        }
    }

    /// One JSON object per row index in `rows`.
    pub fn records(&self, rows: impl IntoIterator<Item = usize>) -> Vec<Value> {
        rows.into_iter()
            .map(|r| {
                let mut obj = serde_json::Map::new();
                for (i, c) in self.columns.iter().enumerate() {
                    obj.insert(c.name.clone(), self.cell_json(i, r));
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// First `n` rows as JSON records.
    pub fn preview(&self, n: usize) -> Vec<Value> {
        self.records(0..self.rows().min(n))
    }

    /// Row mask for `column == value`.  Numeric columns compare numerically
    /// when `value` parses as a number; everything else compares textually.
    pub fn eq_mask(&self, idx: usize, value: &str) -> Vec<bool> {
        match &self.columns[idx].values {
            ColumnValues::Int(v) => {
                let wanted = value.trim().parse::<i64>().ok();
                v.iter().map(|x| wanted.is_some() && *x == wanted).collect()
            }
            ColumnValues::Float(v) => {
                let wanted = value.trim().parse::<f64>().ok();
                v.iter()
                    .map(|x| matches!((x, wanted), (Some(a), Some(b)) if *a == b))
                    .collect()
            }
            ColumnValues::Str(v) => v
                .iter()
                .map(|x| x.as_deref() == Some(value))
                .collect(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn infer_column(cells: &[String]) -> ColumnValues {
    let has_null = cells.iter().any(|c| c.trim().is_empty());
    let all_int = !has_null
        && cells
            .iter()
            .all(|c| c.trim().parse::<i64>().is_ok());
    if all_int {
        return ColumnValues::Int(
            cells
                .iter()
                .map(|c| c.trim().parse::<i64>().ok())
                .collect(),
        );
    }
    let all_float = cells
        .iter()
        .all(|c| c.trim().is_empty() || c.trim().parse::<f64>().is_ok());
    if all_float && cells.iter().any(|c| !c.trim().is_empty()) {
        return ColumnValues::Float(
            cells
                .iter()
                .map(|c| {
                    let t = c.trim();
                    if t.is_empty() {
                        None
                    } else {
                        t.parse::<f64>().ok()
                    }
                })
                .collect(),
        );
    }
    ColumnValues::Str(
        cells
            .iter()
            .map(|c| {
                if c.trim().is_empty() {
                    None
                } else {
                    Some(c.clone())
                }
            })
            .collect(),
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Dataset;

    /// The five-row sales table used across the test suite.
    pub fn sales() -> Dataset {
        let csv = "id,name,sales,month\n\
                   1,Product A,100,Jan\n\
                   2,Product B,200,Feb\n\
                   3,Product A,150,Mar\n\
                   4,Product B,250,Apr\n\
                   5,Product A,180,May\n";
        Dataset::from_csv_bytes(csv.as_bytes()).expect("fixture parses")
    }
}
