use serde_json::Value;

use super::error::FilterError;
use super::types::{ColumnSpec, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value, columns: &[ColumnSpec]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        match order {
            Value::String(s) => Self::parse_order_string(s, columns, &mut out)?,
            // ["last_name asc", "first_name"]
            Value::Array(arr) => {
                for v in arr {
                    let s = v
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidOperatorData("order entries must be strings".to_string()))?;
                    Self::parse_order_string(s, columns, &mut out)?;
                }
            }
            // { "last_name": "asc", "joined_on": "desc" }
            Value::Object(obj) => {
                for (k, v) in obj {
                    let dir = v.as_str().unwrap_or("asc");
                    out.push(FilterOrderInfo { column: Self::column(k, columns)?, sort: Self::direction(dir) });
                }
            }
            Value::Null => {}
            _ => return Err(FilterError::InvalidOperatorData("order must be a string, array or object".to_string())),
        }
        Ok(out)
    }

    fn parse_order_string(s: &str, columns: &[ColumnSpec], out: &mut Vec<FilterOrderInfo>) -> Result<(), FilterError> {
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                out.push(FilterOrderInfo { column: Self::column(col, columns)?, sort: Self::direction(dir) });
            }
        }
        Ok(())
    }

    fn column(name: &str, columns: &[ColumnSpec]) -> Result<&'static str, FilterError> {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.name)
            .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))
    }

    fn direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos.iter().map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql())).collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("last_name", "text"), ColumnSpec::new("joined_on", "date")];

    #[test]
    fn parses_comma_separated_string() {
        let infos = FilterOrder::validate_and_parse(&json!("joined_on desc, last_name"), COLUMNS).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"joined_on\" DESC, \"last_name\" ASC");
    }

    #[test]
    fn rejects_unknown_column() {
        assert!(FilterOrder::validate_and_parse(&json!({ "1; DROP": "asc" }), COLUMNS).is_err());
    }
}
