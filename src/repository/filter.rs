//! Predicate filters over the `subscriptions` table.
//!
//! A [`SubscriptionFilter`] is a conjunction of comparisons. Each comparison
//! is either `column <op> value`, `column <op> column`, or a null check. The
//! SQL is rendered once when the filter is built so that a lazy row stream
//! can borrow it for as long as it is polled.

use std::fmt::Write;

use chrono::DateTime;
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionColumn {
    Id,
    StreamerLogin,
    StreamerId,
    ChannelId,
    LastStreamStart,
    LastGameName,
    LastThumbnailUrl,
    LastNotifiedAt,
}

impl SubscriptionColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::StreamerLogin => "streamer_login",
            Self::StreamerId => "streamer_id",
            Self::ChannelId => "channel_id",
            Self::LastStreamStart => "last_stream_start",
            Self::LastGameName => "last_game_name",
            Self::LastThumbnailUrl => "last_thumbnail_url",
            Self::LastNotifiedAt => "last_notified_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A value bound into a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u64> for FilterValue {
    // Snowflakes are stored as i64
    fn from(value: u64) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Value {
        column: SubscriptionColumn,
        op: Comparison,
        value: FilterValue,
    },
    Columns {
        left: SubscriptionColumn,
        op: Comparison,
        right: SubscriptionColumn,
    },
    IsNull(SubscriptionColumn),
    IsNotNull(SubscriptionColumn),
}

/// Builder for [`SubscriptionFilter`].
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilterBuilder {
    predicates: Vec<Predicate>,
}

impl SubscriptionFilterBuilder {
    pub fn compare(
        mut self,
        column: SubscriptionColumn,
        op: Comparison,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.predicates.push(Predicate::Value {
            column,
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: SubscriptionColumn, value: impl Into<FilterValue>) -> Self {
        self.compare(column, Comparison::Eq, value)
    }

    pub fn ne(self, column: SubscriptionColumn, value: impl Into<FilterValue>) -> Self {
        self.compare(column, Comparison::Ne, value)
    }

    pub fn compare_columns(
        mut self,
        left: SubscriptionColumn,
        op: Comparison,
        right: SubscriptionColumn,
    ) -> Self {
        self.predicates
            .push(Predicate::Columns { left, op, right });
        self
    }

    pub fn is_null(mut self, column: SubscriptionColumn) -> Self {
        self.predicates.push(Predicate::IsNull(column));
        self
    }

    pub fn is_not_null(mut self, column: SubscriptionColumn) -> Self {
        self.predicates.push(Predicate::IsNotNull(column));
        self
    }

    pub fn build(self) -> SubscriptionFilter {
        let mut sql = String::from("SELECT * FROM subscriptions");
        let mut values = Vec::new();

        for (i, predicate) in self.predicates.into_iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            // Writing into a String cannot fail
            let _ = match predicate {
                Predicate::Value { column, op, value } => {
                    values.push(value);
                    write!(sql, "{} {} ?", column.as_str(), op.as_sql())
                }
                Predicate::Columns { left, op, right } => {
                    write!(sql, "{} {} {}", left.as_str(), op.as_sql(), right.as_str())
                }
                Predicate::IsNull(column) => write!(sql, "{} IS NULL", column.as_str()),
                Predicate::IsNotNull(column) => write!(sql, "{} IS NOT NULL", column.as_str()),
            };
        }
        sql.push_str(" ORDER BY id");

        SubscriptionFilter { sql, values }
    }
}

/// A rendered filter: SQL text plus the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionFilter {
    sql: String,
    values: Vec<FilterValue>,
}

impl SubscriptionFilter {
    pub fn builder() -> SubscriptionFilterBuilder {
        SubscriptionFilterBuilder::default()
    }

    /// Matches every row.
    pub fn all() -> Self {
        Self::builder().build()
    }

    /// Rows whose last stream start has not been notified yet.
    ///
    /// A null `last_stream_start` makes the comparison null, so never-live
    /// subscriptions are excluded.
    pub fn pending() -> Self {
        Self::builder()
            .compare_columns(
                SubscriptionColumn::LastNotifiedAt,
                Comparison::Lt,
                SubscriptionColumn::LastStreamStart,
            )
            .build()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[FilterValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_no_where_clause() {
        assert_eq!(
            SubscriptionFilter::all().sql(),
            "SELECT * FROM subscriptions ORDER BY id"
        );
    }

    #[test]
    fn test_pending_compares_columns() {
        let filter = SubscriptionFilter::pending();
        assert_eq!(
            filter.sql(),
            "SELECT * FROM subscriptions WHERE last_notified_at < last_stream_start ORDER BY id"
        );
        assert!(filter.values().is_empty());
    }

    #[test]
    fn test_mixed_predicates_keep_bind_order() {
        let filter = SubscriptionFilter::builder()
            .eq(SubscriptionColumn::ChannelId, 99u64)
            .ne(SubscriptionColumn::StreamerLogin, "someone")
            .is_not_null(SubscriptionColumn::LastGameName)
            .build();

        assert_eq!(
            filter.sql(),
            "SELECT * FROM subscriptions WHERE channel_id = ? AND streamer_login != ? \
             AND last_game_name IS NOT NULL ORDER BY id"
        );
        assert_eq!(
            filter.values(),
            &[
                FilterValue::Integer(99),
                FilterValue::Text("someone".to_string())
            ]
        );
    }
}
