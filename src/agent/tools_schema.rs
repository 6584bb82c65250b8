//! Tool declarations handed to the hosted model: name, description, and a
//! JSON-schema parameter block per tool.  The names must match what
//! [`crate::dataset::tools::DataTools::dispatch`] understands.

use genai::chat::Tool;
use serde_json::json;

pub fn declarations() -> Vec<Tool> {
    vec![
        Tool::new("calculate_mean")
            .with_description("Calculate the mean/average of a numeric column in the dataframe.")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "column": { "type": "string", "description": "The name of the column to calculate mean for." }
                },
                "required": ["column"]
            })),
        Tool::new("calculate_median")
            .with_description("Calculate the median of a numeric column.")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "column": { "type": "string", "description": "The name of the column to calculate median for." }
                },
                "required": ["column"]
            })),
        Tool::new("sum_column")
            .with_description("Calculate the sum of a numeric column, optionally filtered by conditions.")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "column": { "type": "string", "description": "The name of the column to sum." },
                    "filter_column": { "type": "string", "description": "Optional column to filter by." },
                    "filter_value": { "type": "string", "description": "Optional value to filter for." }
                },
                "required": ["column"]
            })),
        Tool::new("filter_by_date_range")
            .with_description(
                "Filter the dataframe by a date range (inclusive). Dates are compared as \
                 YYYY-MM-DD strings.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "date_column": { "type": "string", "description": "The name of the date column." },
                    "start_date": { "type": "string", "description": "Start date in YYYY-MM-DD format." },
                    "end_date": { "type": "string", "description": "End date in YYYY-MM-DD format." }
                },
                "required": ["date_column", "start_date", "end_date"]
            })),
        Tool::new("get_dataframe_info")
            .with_description(
                "Get basic information about the dataframe including columns, shape, data \
                 types and a first-rows sample.",
            )
            .with_schema(json!({ "type": "object", "properties": {} })),
        Tool::new("filter_and_aggregate")
            .with_description(
                "Filter the dataframe by an equality condition, then aggregate (sum, mean, \
                 count, max, min) another column.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "filter_column": { "type": "string", "description": "Column to filter by." },
                    "filter_value": { "type": "string", "description": "Value to filter for." },
                    "aggregate_column": { "type": "string", "description": "Column to aggregate." },
                    "aggregation": { "type": "string", "description": "One of: sum, mean, count, max, min." }
                },
                "required": ["filter_column", "filter_value", "aggregate_column", "aggregation"]
            })),
        Tool::new("group_by_and_aggregate")
            .with_description(
                "Group data by a column (e.g. month, category) and aggregate another column. \
                 Use this for queries like 'sales by month'. Column matching is \
                 case-insensitive.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "group_column": { "type": "string", "description": "Column to group by." },
                    "aggregate_column": { "type": "string", "description": "Column to aggregate." },
                    "aggregation": { "type": "string", "description": "One of: sum, mean, count, max, min. Default is sum." }
                },
                "required": ["group_column", "aggregate_column"]
            })),
        Tool::new("get_available_capabilities")
            .with_description(
                "Describe what this agent can help with and which tools are available. Use \
                 this for general questions like 'what can you do'.",
            )
            .with_schema(json!({ "type": "object", "properties": {} })),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dataset::tools::DataTools;

    #[test]
    fn declaration_names_match_the_dispatcher() {
        let names: Vec<String> = declarations().into_iter().map(|t| t.name).collect();
        assert_eq!(names, DataTools::TOOL_NAMES);
    }
}
