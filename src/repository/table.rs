//! Database table operations and implementations.

use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteArguments;

use crate::entity::StreamState;
use crate::entity::SubscriptionEntity;
use crate::repository::error::DatabaseError;
use crate::repository::filter::FilterValue;
use crate::repository::filter::SubscriptionFilter;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with keyed row access.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
}

/// Helper trait to handle binding parameters, especially for casting u64 to i64 for SQLite.
pub trait BindParam<'q> {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>;
}

macro_rules! impl_bind_param {
    ($t:ty) => {
        impl<'q> BindParam<'q> for $t {
            fn bind_param<O>(
                self,
                query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
            ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
                query.bind(self)
            }
        }
    };
}

impl_bind_param!(&'q i32);
impl_bind_param!(&'q i64);
impl_bind_param!(&'q String);
impl_bind_param!(&'q Option<String>);
impl_bind_param!(&'q chrono::DateTime<chrono::Utc>);
impl_bind_param!(&'q Option<chrono::DateTime<chrono::Utc>>);

// Special case for u64 (casting to i64)
impl<'q> BindParam<'q> for &'q u64 {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
        query.bind(*self as i64)
    }
}

impl<'q> BindParam<'q> for &'q FilterValue {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, SqliteArguments<'q>> {
        match self {
            FilterValue::Integer(v) => query.bind(*v),
            FilterValue::Text(v) => query.bind(v.as_str()),
            FilterValue::Timestamp(v) => query.bind(*v),
        }
    }
}

/// The schema itself lives in `migrations/`.
macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:expr,
        $pk:ident,
        $id_type:ty,
        $db_id_type:ty,
        $cols:expr,
        $vals:expr,
        [ $( $field:ident ),+ ]
    ) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table))
                    .fetch_all(&self.base.pool)
                    .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                let query = sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"));
                let query = BindParam::bind_param(id, query);
                Ok(
                    query
                        .fetch_optional(&self.base.pool)
                        .await?,
                )
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as(concat!(
                        "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                    ));

                $(
                    query = BindParam::bind_param(&model.$field, query);
                )+

                let row: ($db_id_type,) = query.fetch_one(&self.base.pool).await?;
                Ok(row.0 as $id_type)
            }
        }
    };
}

// ============================================================================
// SubscriptionTable
// ============================================================================

impl_table!(
    SubscriptionTable,
    SubscriptionEntity,
    "subscriptions",
    id,
    i32,
    i32,
    "streamer_login, streamer_id, channel_id, last_stream_start, last_game_name, last_thumbnail_url, last_notified_at",
    "?, ?, ?, ?, ?, ?, ?",
    [
        streamer_login,
        streamer_id,
        channel_id,
        last_stream_start,
        last_game_name,
        last_thumbnail_url,
        last_notified_at
    ]
);

impl SubscriptionTable {
    /// Creates a subscription for a (streamer, channel) pair.
    ///
    /// Existing pairs are rejected by an explicit lookup first; the UNIQUE
    /// constraint catches the race where two creates pass the lookup together.
    pub async fn create(
        &self,
        streamer_login: &str,
        streamer_id: i64,
        channel_id: u64,
    ) -> Result<SubscriptionEntity, DatabaseError> {
        if self
            .exists_by_streamer_and_channel(streamer_id, channel_id)
            .await?
        {
            return Err(DatabaseError::DuplicateSubscription {
                streamer_id,
                channel_id,
            });
        }

        self.insert_unique(SubscriptionEntity::new(streamer_login, streamer_id, channel_id))
            .await
    }

    /// Inserts `model` without a lookup, reporting a UNIQUE clash on
    /// (streamer_id, channel_id) as [`DatabaseError::DuplicateSubscription`].
    pub async fn insert_unique(
        &self,
        mut model: SubscriptionEntity,
    ) -> Result<SubscriptionEntity, DatabaseError> {
        match self.insert(&model).await {
            Ok(id) => {
                model.id = id;
                Ok(model)
            }
            Err(e) if e.is_unique_violation() => Err(DatabaseError::DuplicateSubscription {
                streamer_id: model.streamer_id,
                channel_id: model.channel_id,
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn exists_by_streamer_and_channel(
        &self,
        streamer_id: i64,
        channel_id: u64,
    ) -> Result<bool, DatabaseError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE streamer_id = ? AND channel_id = ?)",
        )
        .bind(streamer_id)
        .bind(channel_id as i64)
        .fetch_one(&self.base.pool)
        .await?)
    }

    /// Deletes the channel's subscriptions to `streamer_login` and returns how many were removed.
    pub async fn delete_by_channel_and_login(
        &self,
        channel_id: u64,
        streamer_login: &str,
    ) -> Result<u64, DatabaseError> {
        let res = sqlx::query(
            "DELETE FROM subscriptions WHERE channel_id = ? AND streamer_login = ? COLLATE NOCASE",
        )
        .bind(channel_id as i64)
        .bind(streamer_login)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Lazily streams rows matching `filter`.
    pub fn stream<'a>(
        &'a self,
        filter: &'a SubscriptionFilter,
    ) -> BoxStream<'a, Result<SubscriptionEntity, DatabaseError>> {
        let mut query = sqlx::query_as::<_, SubscriptionEntity>(filter.sql());
        for value in filter.values() {
            query = BindParam::bind_param(value, query);
        }
        query
            .fetch(&self.base.pool)
            .map_err(DatabaseError::from)
            .boxed()
    }

    pub async fn select_where(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionEntity>, DatabaseError> {
        self.stream(filter).try_collect().await
    }

    /// Subscriptions whose last stream start has not been notified.
    pub async fn select_pending(&self) -> Result<Vec<SubscriptionEntity>, DatabaseError> {
        self.select_where(&SubscriptionFilter::pending()).await
    }

    pub async fn select_all_by_channel(
        &self,
        channel_id: u64,
    ) -> Result<Vec<SubscriptionEntity>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionEntity>(
            "SELECT * FROM subscriptions WHERE channel_id = ? ORDER BY streamer_login",
        )
        .bind(channel_id as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Distinct streamer ids across all subscriptions.
    pub async fn select_distinct_streamer_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT streamer_id FROM subscriptions ORDER BY streamer_id",
        )
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Writes stream metadata to every subscription of `streamer_id`.
    pub async fn update_stream_state_by_streamer_id(
        &self,
        streamer_id: i64,
        state: &StreamState,
    ) -> Result<u64, DatabaseError> {
        let res = sqlx::query(
            r#"
            UPDATE subscriptions
            SET last_stream_start = ?, last_game_name = ?, last_thumbnail_url = ?
            WHERE streamer_id = ?
            "#,
        )
        .bind(state.started_at)
        .bind(&state.game_name)
        .bind(&state.thumbnail_url)
        .bind(streamer_id)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Records a notification. `last_notified_at` never moves backwards.
    pub async fn mark_notified(
        &self,
        id: i32,
        notified_at: &chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE subscriptions SET last_notified_at = MAX(last_notified_at, ?) WHERE id = ?",
        )
        .bind(notified_at)
        .bind(id)
        .execute(&self.base.pool)
        .await?;
        Ok(())
    }
}
