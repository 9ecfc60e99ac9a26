pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};

/// Bind JSON filter parameters; placeholders carry explicit casts so text binds are safe.
pub fn bind_params<'q, O>(
    mut q: QueryAs<'q, Postgres, O, PgArguments>,
    params: &'q [Value],
) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    for v in params {
        q = match v {
            Value::Null => q.bind(Option::<String>::None),
            Value::Bool(b) => q.bind(b.to_string()),
            Value::Number(n) => q.bind(n.to_string()),
            Value::String(s) => q.bind(s.as_str()),
            // Filter only emits scalars as parameters
            other => q.bind(other.to_string()),
        };
    }
    q
}
