use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ColumnSpec, FilterData, FilterOrderInfo, FilterWhereOptions, SqlResult};

/// A find query over one table, restricted to a fixed set of columns
pub struct Filter {
    table_name: &'static str,
    columns: &'static [ColumnSpec],
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: i64,
    offset: i64,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: &'static str, columns: &'static [ColumnSpec]) -> Self {
        Self {
            table_name,
            columns,
            where_data: None,
            order_data: vec![],
            limit: crate::config::config().page_size(None),
            offset: 0,
            options: FilterWhereOptions::default(),
        }
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        self.limit(data.limit, data.offset)?;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        match conditions {
            Value::Null => self.where_data = None,
            Value::Object(_) => self.where_data = Some(conditions),
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec, self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if matches!(limit, Some(l) if l < 0) {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if matches!(offset, Some(o) if o < 0) {
            return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
        }

        let applied = crate::config::config().page_size(limit);
        if let Some(requested) = limit {
            if requested > applied {
                tracing::debug!("Limit {} exceeds max {}, capping", requested, applied);
            }
        }

        self.limit = applied;
        self.offset = offset.unwrap_or(0);
        Ok(self)
    }

    pub fn page(&self) -> (i64, i64) {
        (self.limit, self.offset)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(self.where_data.as_ref(), self.columns, &self.options)?;
        let order_clause = FilterOrder::generate(&self.order_data);

        let query = [
            format!("SELECT * FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            format!("LIMIT {} OFFSET {}", self.limit, self.offset),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(self.where_data.as_ref(), self.columns, &self.options)?;
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("status", "text"), ColumnSpec::new("last_name", "text")];

    #[test]
    fn builds_select_with_order_and_page() {
        let mut filter = Filter::new("members", COLUMNS);
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "status": "visitor" })),
                order: Some(json!("last_name")),
                limit: Some(10),
                offset: Some(20),
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"members\" WHERE \"deleted_at\" IS NULL AND \"status\" = $1::text \
             ORDER BY \"last_name\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!("visitor")]);
    }

    #[test]
    fn count_ignores_paging() {
        let mut filter = Filter::new("members", COLUMNS);
        filter.limit(Some(5), Some(5)).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"members\" WHERE \"deleted_at\" IS NULL");
    }

    #[test]
    fn negative_paging_is_rejected() {
        let mut filter = Filter::new("members", COLUMNS);
        assert!(filter.limit(Some(-1), None).is_err());
        assert!(filter.limit(None, Some(-1)).is_err());
    }
}
