//! libSQL implementation of `LocalStore`

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{LocalPostRecord, PostId};
use crate::store::LocalStore;

const SELECT_POSTS: &str = "SELECT id, user_id, title, body, is_liked FROM posts ORDER BY position ASC";

/// libSQL-backed post snapshot
///
/// Rows keep a `position` column so `fetch_all` returns them in the order
/// they were written, which is the order the feed displayed them.
#[derive(Clone)]
pub struct LibSqlPostStore {
    conn: Connection,
}

impl LibSqlPostStore {
    /// Create a new store with the given connection
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn write_snapshot(&self, records: &[LocalPostRecord]) -> Result<()> {
        self.conn.execute("DELETE FROM posts", ()).await?;

        for (position, record) in records.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| Error::Persistence("snapshot too large".into()))?;
            let mut values = record_values(record);
            values.push(Value::Integer(position));
            // Remote pages can repeat an id; the later row wins
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO posts (id, user_id, title, body, is_liked, position)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    values,
                )
                .await?;
        }

        Ok(())
    }

    fn parse_record(row: &Row) -> Result<LocalPostRecord> {
        Ok(LocalPostRecord {
            id: PostId::new(row.get::<i64>(0)?),
            user_id: row.get::<i64>(1)?,
            title: optional_text(row, 2)?,
            body: optional_text(row, 3)?,
            is_liked: row.get::<i64>(4)? != 0,
        })
    }
}

impl LocalStore for LibSqlPostStore {
    async fn replace_all(&self, records: &[LocalPostRecord]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        if let Err(e) = self.write_snapshot(records).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!("Stored snapshot of {} posts", records.len());
        Ok(())
    }

    async fn upsert_one(&self, record: &LocalPostRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO posts (id, user_id, title, body, is_liked, position)
                 VALUES (?, ?, ?, ?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM posts))
                 ON CONFLICT(id) DO UPDATE SET
                     user_id = excluded.user_id,
                     title = excluded.title,
                     body = excluded.body,
                     is_liked = excluded.is_liked",
                record_values(record),
            )
            .await?;
        Ok(())
    }

    async fn set_liked(&self, id: PostId, is_liked: bool) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE posts SET is_liked = ? WHERE id = ?",
                vec![Value::Integer(i64::from(is_liked)), Value::Integer(id.get())],
            )
            .await?;
        Ok(rows > 0)
    }

    async fn fetch_all(&self) -> Result<Vec<LocalPostRecord>> {
        let mut rows = self.conn.query(SELECT_POSTS, ()).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }

        Ok(records)
    }
}

fn record_values(record: &LocalPostRecord) -> Vec<Value> {
    vec![
        Value::Integer(record.id.get()),
        Value::Integer(record.user_id),
        record.title.clone().map_or(Value::Null, Value::Text),
        record.body.clone().map_or(Value::Null, Value::Text),
        Value::Integer(i64::from(record.is_liked)),
    ]
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Text(text) => Ok(Some(text)),
        Value::Null => Ok(None),
        other => Err(Error::Persistence(format!(
            "unexpected value in text column {idx}: {other:?}"
        ))),
    }
}
