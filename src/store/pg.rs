//! PostgreSQL-backed native store. One table per list (`collection`), primary key `id`.

use super::ListStore;
use crate::config::ListDescriptor;
use crate::error::AppError;
use crate::filter::FilterSpec;
use crate::item::Item;
use crate::sort::SortSpec;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct PgListStore {
    pool: PgPool,
}

impl PgListStore {
    pub fn new(pool: PgPool) -> Self {
        PgListStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        query
    }

    async fn fetch_many(&self, q: &QueryBuf) -> Result<Vec<Item>, AppError> {
        let rows = Self::bind(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Item>, AppError> {
        let row = Self::bind(q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_item(&r)))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        let done = Self::bind(q).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl ListStore for PgListStore {
    async fn count(&self, list: &ListDescriptor, filters: &FilterSpec) -> Result<u64, AppError> {
        use sqlx::Row;
        let q = sql::count(list, filters);
        let row = Self::bind(&q).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn find_page(
        &self,
        list: &ListDescriptor,
        filters: &FilterSpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Item>, AppError> {
        let q = sql::select_page(list, filters, sort, skip, limit);
        self.fetch_many(&q).await
    }

    async fn find_by_id(&self, list: &ListDescriptor, id: &str) -> Result<Option<Item>, AppError> {
        self.fetch_optional(&sql::select_by_id(list, id)).await
    }

    async fn insert(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<Item, AppError> {
        let q = sql::insert(list, fields);
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, list: &ListDescriptor, id: &str, fields: &Map<String, Value>) -> Result<Option<Item>, AppError> {
        self.fetch_optional(&sql::update(list, id, fields)).await
    }

    async fn delete(&self, list: &ListDescriptor, id: &str) -> Result<bool, AppError> {
        Ok(self.execute(&sql::delete(list, id)).await? > 0)
    }

    async fn update_all(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<u64, AppError> {
        match sql::update_all(list, fields) {
            Some(q) => self.execute(&q).await,
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_item(row: &sqlx::postgres::PgRow) -> Item {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Item::new(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        // float8: whole values as integers.
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return Value::Number((n as i64).into());
        }
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
