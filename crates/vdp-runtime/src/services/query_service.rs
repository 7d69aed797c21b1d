//! # Query Service
//!
//! Answers a tiny subset of SQL over in-memory tables. Every statement
//! completes later on a tokio task, never on the dispatch worker.
//!
//! Supported statements (keywords case-insensitive):
//!
//! ```text
//! SELECT * FROM <table>
//! SELECT COUNT(*) FROM <table>
//! ```

use shared_types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use vdp_dispatcher::{Deferred, OperationTable, ParamType, RemoteService, ServiceFault};

/// Registered service id.
pub const QUERY_SERVICE: &str = "QueryService";

/// Fault category for references to unknown tables. Not a processing
/// category unless configured as one.
pub const QUERY_VALIDATION: &str = "query-validation";

type Rows = Vec<Vec<Value>>;

/// In-memory query engine.
#[derive(Debug, Clone, Default)]
pub struct QueryService {
    tables: Arc<BTreeMap<String, Rows>>,
    latency: Duration,
}

#[derive(Debug, PartialEq)]
enum Statement {
    SelectAll(String),
    Count(String),
}

impl QueryService {
    /// Create an engine over `tables`.
    pub fn new(tables: BTreeMap<String, Rows>) -> Self {
        Self {
            tables: Arc::new(tables),
            latency: Duration::ZERO,
        }
    }

    /// Engine with a small `customers` table.
    pub fn with_sample_tables() -> Self {
        let customers = vec![
            vec![Value::Int(1), Value::from("Ada")],
            vec![Value::Int(2), Value::from("Grace")],
            vec![Value::Int(3), Value::from("Edsger")],
        ];
        Self::new(BTreeMap::from([("customers".to_string(), customers)]))
            .with_latency(Duration::from_millis(5))
    }

    /// Delay every completion by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Table names.
    pub fn tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Run `sql` to completion.
    pub async fn execute(&self, sql: &str) -> Result<Value, ServiceFault> {
        let statement = parse(sql)?;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match statement {
            Statement::SelectAll(table) => {
                let rows = self.rows(&table)?;
                Ok(Value::List(rows.iter().cloned().map(Value::List).collect()))
            }
            Statement::Count(table) => Ok(Value::Long(self.rows(&table)?.len() as i64)),
        }
    }

    fn rows(&self, table: &str) -> Result<&Rows, ServiceFault> {
        self.tables.get(table).ok_or_else(|| {
            ServiceFault::new(QUERY_VALIDATION, format!("table '{table}' does not exist"))
        })
    }
}

fn parse(sql: &str) -> Result<Statement, ServiceFault> {
    let tokens: Vec<&str> = sql.trim().trim_end_matches(';').split_whitespace().collect();
    let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
    let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

    match upper.as_slice() {
        ["SELECT", "*", "FROM", _] => Ok(Statement::SelectAll(tokens[3].to_string())),
        ["SELECT", "COUNT(*)", "FROM", _] => Ok(Statement::Count(tokens[3].to_string())),
        [] => Err(ServiceFault::processing("empty statement")),
        _ => Err(ServiceFault::processing(format!("unsupported statement: {}", sql.trim()))),
    }
}

impl RemoteService for QueryService {
    fn operations(table: &mut OperationTable<Self>) {
        table
            .deferred("execute", &[ParamType::String], |svc, _, args| {
                let sql = args.str(0)?.to_string();
                let engine = svc.clone();
                Ok(Some(Deferred::spawn(async move { engine.execute(&sql).await })))
            })
            .sync("tables", &[], |svc, _, _| {
                Ok(Value::List(svc.tables().into_iter().map(Value::String).collect()))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            parse("select * from customers;").unwrap(),
            Statement::SelectAll("customers".into())
        );
        assert_eq!(
            parse("  SELECT COUNT(*) FROM Orders ").unwrap(),
            Statement::Count("Orders".into())
        );
        assert_eq!(parse("").unwrap_err().category(), Some("processing"));
        assert!(parse("DROP TABLE customers")
            .unwrap_err()
            .message()
            .starts_with("unsupported statement"));
    }

    #[tokio::test]
    async fn test_select_all() {
        let engine = QueryService::with_sample_tables();
        let Value::List(rows) = engine.execute("SELECT * FROM customers").await.unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], Value::List(vec![Value::Int(1), Value::from("Ada")]));
    }

    #[tokio::test]
    async fn test_count() {
        let engine = QueryService::with_sample_tables();
        assert_eq!(
            engine.execute("select count(*) from customers").await.unwrap(),
            Value::Long(3)
        );
    }

    #[tokio::test]
    async fn test_unknown_table_is_validation_fault() {
        let engine = QueryService::with_sample_tables();
        let fault = engine.execute("SELECT * FROM ghosts").await.unwrap_err();
        assert_eq!(fault.category(), Some(QUERY_VALIDATION));
    }
}
