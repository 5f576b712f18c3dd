//! Canonical DDL for a tenant's analytical storage.
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so a partially failed
//! provisioning run can simply be retried. Object names are backtick-quoted
//! with the quote character stripped defensively; string literals are
//! single-quoted with embedded quotes escaped.

/// Tables materialized in every tenant database.
pub const CANONICAL_TABLES: [&str; 6] = [
    "otel_logs",
    "otel_traces",
    "hyperdx_sessions",
    "otel_metrics_gauge",
    "otel_metrics_sum",
    "otel_metrics_histogram",
];

/// Retention applied to every canonical table.
const TTL_DAYS: u32 = 30;

/// Wraps an object name in backticks, stripping any embedded backtick.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', ""))
}

/// Escapes a string value for embedding in a single-quoted SQL literal.
pub fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", quote_ident(database))
}

pub fn create_user(username: &str, password: &str) -> String {
    format!(
        "CREATE USER IF NOT EXISTS {} IDENTIFIED BY '{}'",
        quote_ident(username),
        escape_str(password)
    )
}

pub fn grant_tenant_rights(database: &str, username: &str) -> String {
    format!(
        "GRANT SELECT, INSERT, ALTER, CREATE, DROP, TRUNCATE ON {}.* TO {}",
        quote_ident(database),
        quote_ident(username)
    )
}

/// Shared column block of the logs-shaped tables.
fn log_columns() -> &'static str {
    "Timestamp DateTime64(9) CODEC(Delta, ZSTD(1)),\n\
     TimestampTime DateTime DEFAULT toDateTime(Timestamp),\n\
     TraceId String CODEC(ZSTD(1)),\n\
     SpanId String CODEC(ZSTD(1)),\n\
     TraceFlags UInt32 CODEC(ZSTD(1)),\n\
     SeverityText LowCardinality(String) CODEC(ZSTD(1)),\n\
     SeverityNumber Int32 CODEC(ZSTD(1)),\n\
     ServiceName LowCardinality(String) CODEC(ZSTD(1)),\n\
     Body String CODEC(ZSTD(1)),\n\
     ResourceSchemaUrl String CODEC(ZSTD(1)),\n\
     ResourceAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
     ScopeSchemaUrl String CODEC(ZSTD(1)),\n\
     ScopeName String CODEC(ZSTD(1)),\n\
     ScopeVersion String CODEC(ZSTD(1)),\n\
     ScopeAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
     LogAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1))"
}

/// Index block shared by the logs-shaped tables: bloom filters over the
/// attribute map keys/values plus a tokenized index on the body.
fn log_indexes() -> &'static str {
    "INDEX idx_trace_id TraceId TYPE bloom_filter(0.001) GRANULARITY 1,\n\
     INDEX idx_res_attr_key mapKeys(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_res_attr_value mapValues(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_scope_attr_key mapKeys(ScopeAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_scope_attr_value mapValues(ScopeAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_log_attr_key mapKeys(LogAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_log_attr_value mapValues(LogAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_body Body TYPE tokenbf_v1(32768, 3, 0) GRANULARITY 1"
}

pub fn create_logs_table(database: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n{},\n{}\n) ENGINE = MergeTree()\n\
         PARTITION BY toDate(TimestampTime)\n\
         ORDER BY (ServiceName, TimestampTime)\n\
         TTL TimestampTime + toIntervalDay({TTL_DAYS})\n\
         SETTINGS index_granularity = 8192, ttl_only_drop_parts = 1",
        quote_ident(database),
        quote_ident("otel_logs"),
        log_columns(),
        log_indexes(),
    )
}

pub fn create_traces_table(database: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n\
         Timestamp DateTime64(9) CODEC(Delta, ZSTD(1)),\n\
         TraceId String CODEC(ZSTD(1)),\n\
         SpanId String CODEC(ZSTD(1)),\n\
         ParentSpanId String CODEC(ZSTD(1)),\n\
         TraceState String CODEC(ZSTD(1)),\n\
         SpanName LowCardinality(String) CODEC(ZSTD(1)),\n\
         SpanKind LowCardinality(String) CODEC(ZSTD(1)),\n\
         ServiceName LowCardinality(String) CODEC(ZSTD(1)),\n\
         ResourceAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
         ScopeName String CODEC(ZSTD(1)),\n\
         ScopeVersion String CODEC(ZSTD(1)),\n\
         SpanAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
         Duration Int64 CODEC(ZSTD(1)),\n\
         StatusCode LowCardinality(String) CODEC(ZSTD(1)),\n\
         StatusMessage String CODEC(ZSTD(1)),\n\
         Events Nested (\n\
         Timestamp DateTime64(9),\n\
         Name LowCardinality(String),\n\
         Attributes Map(LowCardinality(String), String)\n\
         ) CODEC(ZSTD(1)),\n\
         Links Nested (\n\
         TraceId String,\n\
         SpanId String,\n\
         TraceState String,\n\
         Attributes Map(LowCardinality(String), String)\n\
         ) CODEC(ZSTD(1)),\n\
         INDEX idx_trace_id TraceId TYPE bloom_filter(0.001) GRANULARITY 1,\n\
         INDEX idx_res_attr_key mapKeys(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
         INDEX idx_res_attr_value mapValues(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
         INDEX idx_span_attr_key mapKeys(SpanAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
         INDEX idx_span_attr_value mapValues(SpanAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
         INDEX idx_duration Duration TYPE minmax GRANULARITY 1\n\
         ) ENGINE = MergeTree()\n\
         PARTITION BY toDate(Timestamp)\n\
         ORDER BY (ServiceName, SpanName, toUnixTimestamp(Timestamp), TraceId)\n\
         TTL toDateTime(Timestamp) + toIntervalDay({TTL_DAYS})\n\
         SETTINGS index_granularity = 8192, ttl_only_drop_parts = 1",
        quote_ident(database),
        quote_ident("otel_traces"),
    )
}

/// Session replay events share the logs shape plus a materialized session id
/// extracted from the RUM attributes.
pub fn create_sessions_table(database: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n{},\n\
         SessionId String MATERIALIZED LogAttributes['rum.sessionId'] CODEC(ZSTD(1)),\n{}\n\
         ) ENGINE = MergeTree()\n\
         PARTITION BY toDate(TimestampTime)\n\
         ORDER BY (ServiceName, TimestampTime)\n\
         TTL TimestampTime + toIntervalDay({TTL_DAYS})\n\
         SETTINGS index_granularity = 8192, ttl_only_drop_parts = 1",
        quote_ident(database),
        quote_ident("hyperdx_sessions"),
        log_columns(),
        log_indexes(),
    )
}

/// Shared column block of the metric tables.
fn metric_columns() -> &'static str {
    "ResourceAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
     ResourceSchemaUrl String CODEC(ZSTD(1)),\n\
     ScopeName String CODEC(ZSTD(1)),\n\
     ScopeVersion String CODEC(ZSTD(1)),\n\
     ScopeAttributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
     ScopeDroppedAttrCount UInt32 CODEC(ZSTD(1)),\n\
     ScopeSchemaUrl String CODEC(ZSTD(1)),\n\
     ServiceName LowCardinality(String) CODEC(ZSTD(1)),\n\
     MetricName String CODEC(ZSTD(1)),\n\
     MetricDescription String CODEC(ZSTD(1)),\n\
     MetricUnit String CODEC(ZSTD(1)),\n\
     Attributes Map(LowCardinality(String), String) CODEC(ZSTD(1)),\n\
     StartTimeUnix DateTime64(9) CODEC(Delta, ZSTD(1)),\n\
     TimeUnix DateTime64(9) CODEC(Delta, ZSTD(1))"
}

fn metric_indexes() -> &'static str {
    "INDEX idx_res_attr_key mapKeys(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_res_attr_value mapValues(ResourceAttributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_attr_key mapKeys(Attributes) TYPE bloom_filter(0.01) GRANULARITY 1,\n\
     INDEX idx_attr_value mapValues(Attributes) TYPE bloom_filter(0.01) GRANULARITY 1"
}

fn create_metric_table(database: &str, table: &str, value_columns: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n{},\n{},\n{}\n\
         ) ENGINE = MergeTree()\n\
         PARTITION BY toDate(TimeUnix)\n\
         ORDER BY (ServiceName, MetricName, Attributes, toUnixTimestamp64Nano(TimeUnix))\n\
         TTL toDateTime(TimeUnix) + toIntervalDay({TTL_DAYS})\n\
         SETTINGS index_granularity = 8192, ttl_only_drop_parts = 1",
        quote_ident(database),
        quote_ident(table),
        metric_columns(),
        value_columns,
        metric_indexes(),
    )
}

pub fn create_metrics_gauge_table(database: &str) -> String {
    create_metric_table(
        database,
        "otel_metrics_gauge",
        "Value Float64 CODEC(ZSTD(1)),\n\
         Flags UInt32 CODEC(ZSTD(1))",
    )
}

pub fn create_metrics_sum_table(database: &str) -> String {
    create_metric_table(
        database,
        "otel_metrics_sum",
        "Value Float64 CODEC(ZSTD(1)),\n\
         Flags UInt32 CODEC(ZSTD(1)),\n\
         AggregationTemporality Int32 CODEC(ZSTD(1)),\n\
         IsMonotonic Boolean CODEC(Delta, ZSTD(1))",
    )
}

pub fn create_metrics_histogram_table(database: &str) -> String {
    create_metric_table(
        database,
        "otel_metrics_histogram",
        "Count UInt64 CODEC(Delta, ZSTD(1)),\n\
         Sum Float64 CODEC(ZSTD(1)),\n\
         BucketCounts Array(UInt64) CODEC(ZSTD(1)),\n\
         ExplicitBounds Array(Float64) CODEC(ZSTD(1)),\n\
         Min Float64 CODEC(ZSTD(1)),\n\
         Max Float64 CODEC(ZSTD(1)),\n\
         Flags UInt32 CODEC(ZSTD(1)),\n\
         AggregationTemporality Int32 CODEC(ZSTD(1))",
    )
}

/// The full ordered provisioning sequence for one tenant, as
/// `(step label, statement)` pairs. Labels are safe to log; statements may
/// embed the tenant credential and are not.
pub fn provisioning_statements(
    database: &str,
    username: &str,
    password: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("create database", create_database(database)),
        ("create user", create_user(username, password)),
        ("grant rights", grant_tenant_rights(database, username)),
        ("create logs table", create_logs_table(database)),
        ("create traces table", create_traces_table(database)),
        ("create sessions table", create_sessions_table(database)),
        ("create gauge metrics table", create_metrics_gauge_table(database)),
        ("create sum metrics table", create_metrics_sum_table(database)),
        (
            "create histogram metrics table",
            create_metrics_histogram_table(database),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_wraps_and_strips() {
        assert_eq!(quote_ident("tenant_abc"), "`tenant_abc`");
        assert_eq!(quote_ident("bad`name"), "`badname`");
    }

    #[test]
    fn escape_str_handles_quotes_and_backslashes() {
        assert_eq!(escape_str("plain"), "plain");
        assert_eq!(escape_str("it's"), "it\\'s");
        assert_eq!(escape_str("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn every_statement_is_idempotent() {
        for (label, sql) in provisioning_statements("tenant_t1", "tenant_t1", "secret") {
            if label == "grant rights" {
                // GRANT is idempotent by nature
                continue;
            }
            assert!(
                sql.contains("IF NOT EXISTS"),
                "{label} is not guarded: {sql}"
            );
        }
    }

    #[test]
    fn statements_cover_all_canonical_tables() {
        let all: String = provisioning_statements("tenant_t1", "tenant_t1", "secret")
            .into_iter()
            .map(|(_, sql)| sql)
            .collect::<Vec<_>>()
            .join("\n");
        for table in CANONICAL_TABLES {
            assert!(all.contains(table), "missing canonical table {table}");
        }
    }

    #[test]
    fn logs_table_has_retention_and_indexes() {
        let sql = create_logs_table("tenant_t1");
        assert!(sql.contains("PARTITION BY toDate(TimestampTime)"));
        assert!(sql.contains("TTL TimestampTime + toIntervalDay(30)"));
        assert!(sql.contains("bloom_filter"));
        assert!(sql.contains("tokenbf_v1"));
    }

    #[test]
    fn traces_table_indexes_duration() {
        let sql = create_traces_table("tenant_t1");
        assert!(sql.contains("INDEX idx_duration Duration TYPE minmax"));
        assert!(sql.contains("Events Nested"));
    }

    #[test]
    fn sessions_table_materializes_session_id() {
        let sql = create_sessions_table("tenant_t1");
        assert!(sql.contains("SessionId String MATERIALIZED"));
    }

    #[test]
    fn user_statement_escapes_the_password() {
        let sql = create_user("tenant_t1", "pa'ss");
        assert!(sql.contains("IDENTIFIED BY 'pa\\'ss'"));
    }

    #[test]
    fn identifiers_cannot_break_out_of_quoting() {
        let sql = create_database("evil`; DROP DATABASE other; --");
        assert!(!sql.contains('`') || sql.matches('`').count() == 2);
        assert!(sql.starts_with("CREATE DATABASE IF NOT EXISTS `evil"));
    }
}
