//! The segment `sql` block for relational database calls.

use crate::constants::attributes::{
    DB_CONNECTION_STRING, DB_NAME, DB_STATEMENT, DB_SYSTEM, DB_USER,
};
use crate::segment::{non_empty, SqlData};
use crate::value::{AttributeMap, AttributeValue};

/// `db.system` values that denote a SQL database.
const SQL_SYSTEMS: &[&str] = &[
    "db2",
    "derby",
    "hive",
    "mariadb",
    "mssql",
    "mysql",
    "oracle",
    "postgresql",
    "sqlite",
    "teradata",
    "other_sql",
];

/// Builds the `sql` block for SQL database spans, removing the `db.*`
/// attributes it consumed. Spans for other databases pass through untouched.
pub fn make_sql(attributes: AttributeMap) -> (AttributeMap, Option<SqlData>) {
    let is_sql = attributes
        .get(DB_SYSTEM)
        .and_then(AttributeValue::as_str)
        .is_some_and(|system| SQL_SYSTEMS.contains(&system));
    if !is_sql {
        return (attributes, None);
    }

    let mut url = String::new();
    let mut system = String::new();
    let mut instance = String::new();
    let mut statement = String::new();
    let mut user = String::new();

    let mut filtered = AttributeMap::with_capacity(attributes.len());
    for (key, value) in attributes {
        let target = match key.as_str() {
            DB_CONNECTION_STRING => &mut url,
            DB_SYSTEM => &mut system,
            DB_NAME => &mut instance,
            DB_STATEMENT => &mut statement,
            DB_USER => &mut user,
            _ => {
                filtered.insert(key, value);
                continue;
            }
        };
        if let Some(text) = value.as_str() {
            *target = text.to_string();
        }
    }

    if url.is_empty() {
        url.push_str("localhost");
    }
    url.push('/');
    url.push_str(&instance);

    let sql = SqlData {
        url: Some(url),
        database_type: non_empty(system),
        user: non_empty(user),
        sanitized_query: non_empty(statement),
        ..Default::default()
    };
    (filtered, Some(sql))
}
