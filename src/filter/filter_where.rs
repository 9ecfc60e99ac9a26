use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::types::{ColumnSpec, FilterOp, FilterWhereOptions};

const MAX_DEPTH: usize = 8;

/// Translates a JSON where-document into a parameterized SQL predicate.
pub struct FilterWhere<'a> {
    columns: &'a [ColumnSpec],
    params: Vec<Value>,
}

impl<'a> FilterWhere<'a> {
    pub fn generate(
        where_data: Option<&Value>,
        columns: &'a [ColumnSpec],
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self { columns, params: vec![] };

        let mut conditions = vec![];
        if !options.include_deleted {
            conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        if let Some(data) = where_data.filter(|v| !v.is_null()) {
            let sql = filter_where.build(data, 0)?;
            if !sql.is_empty() {
                conditions.push(sql);
            }
        }

        let clause = if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") };
        Ok((clause, filter_where.params))
    }

    fn build(&mut self, where_data: &Value, depth: usize) -> Result<String, FilterError> {
        if depth > MAX_DEPTH {
            return Err(FilterError::TooDeep(MAX_DEPTH));
        }
        let obj = where_data
            .as_object()
            .ok_or_else(|| FilterError::InvalidWhereClause("WHERE must be an object".to_string()))?;

        let mut parts = vec![];
        for (key, value) in obj {
            let sql = if key.starts_with('$') {
                self.logical(key, value, depth)?
            } else {
                self.field(key, value)?
            };
            parts.push(sql);
        }
        Ok(parts.join(" AND "))
    }

    fn logical(&mut self, op: &str, value: &Value, depth: usize) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    let sql = self.build(v, depth + 1)?;
                    sql_parts.push(format!("({})", if sql.is_empty() { "1=1".to_string() } else { sql }));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => {
                let sql = self.build(value, depth + 1)?;
                Ok(format!("NOT ({})", if sql.is_empty() { "1=1".to_string() } else { sql }))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(&mut self, field: &str, value: &Value) -> Result<String, FilterError> {
        let column = *self
            .columns
            .iter()
            .find(|c| c.name == field)
            .ok_or_else(|| FilterError::InvalidColumn(field.to_string()))?;

        match value {
            Value::Object(ops) => {
                let mut parts = vec![];
                for (op_key, op_val) in ops {
                    let operator =
                        FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    parts.push(self.condition(column, operator, op_val)?);
                }
                Ok(parts.join(" AND "))
            }
            // Implicit equality: { field: value }
            _ => self.condition(column, FilterOp::Eq, value),
        }
    }

    fn condition(&mut self, column: ColumnSpec, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted = format!("\"{}\"", column.name);
        match operator {
            FilterOp::Eq if data.is_null() => Ok(format!("{} IS NULL", quoted)),
            FilterOp::Ne if data.is_null() => Ok(format!("{} IS NOT NULL", quoted)),
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))?;
                if values.is_empty() {
                    return Ok(if operator == FilterOp::In { "1=0" } else { "1=1" }.to_string());
                }
                let params = values.iter().map(|v| self.param(v, column)).collect::<Result<Vec<_>, _>>()?;
                let keyword = if operator == FilterOp::In { "IN" } else { "NOT IN" };
                Ok(format!("{} {} ({})", quoted, keyword, params.join(", ")))
            }
            FilterOp::Between => match data.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    let low = self.param(low, column)?;
                    let high = self.param(high, column)?;
                    Ok(format!("{} BETWEEN {} AND {}", quoted, low, high))
                }
                _ => Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            scalar => {
                if data.is_array() || data.is_object() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} expects a scalar value",
                        column.name
                    )));
                }
                // comparison_sql is Some for every operator not matched above
                let sql_op = scalar
                    .comparison_sql()
                    .ok_or_else(|| FilterError::UnsupportedOperator(format!("{:?}", scalar)))?;
                if matches!(scalar, FilterOp::Like | FilterOp::ILike) && column.sql_type != "text" {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} is not a text column and cannot be pattern matched",
                        column.name
                    )));
                }
                let placeholder = self.param(data, column)?;
                Ok(format!("{} {} {}", quoted, sql_op, placeholder))
            }
        }
    }

    fn param(&mut self, value: &Value, column: ColumnSpec) -> Result<String, FilterError> {
        check_value(value, column)?;
        self.params.push(value.clone());
        Ok(format!("${}::{}", self.params.len(), column.sql_type))
    }
}

/// Reject values Postgres would fail to cast to the column's type.
fn check_value(value: &Value, column: ColumnSpec) -> Result<(), FilterError> {
    let valid = match (column.sql_type, value) {
        (_, Value::Null) => true,
        ("text", Value::String(_) | Value::Number(_) | Value::Bool(_)) => true,
        ("uuid", Value::String(s)) => Uuid::parse_str(s).is_ok(),
        ("date", Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        ("timestamptz", Value::String(s)) => {
            DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        ("integer" | "bigint", Value::Number(n)) => n.is_i64(),
        ("integer" | "bigint", Value::String(s)) => s.parse::<i64>().is_ok(),
        ("numeric", Value::Number(_)) => true,
        ("numeric", Value::String(s)) => s.parse::<f64>().is_ok(),
        ("boolean", Value::Bool(_)) => true,
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidValue { column: column.name.to_string(), expected: column.sql_type.to_string() })
    }
}
