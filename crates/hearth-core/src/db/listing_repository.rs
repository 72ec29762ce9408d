//! libSQL-backed listing and profile store

use std::sync::Arc;

use libsql::{params, Connection, Value};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{Listing, ListingData, ListingId, UserId, UserProfile};
use crate::store::{
    ListingFilter, ListingQuery, ListingStore, PageCursor, ProfileStore, QueryPage,
};
use crate::util::unix_timestamp_millis;

use super::{Database, StoreLocation};

/// Listing store over a libSQL database, shareable across paginators and pipelines.
#[derive(Clone)]
pub struct LibSqlListingStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlListingStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open the store at a configured location.
    pub async fn open(location: &StoreLocation) -> Result<Self> {
        Ok(Self::new(Database::open_location(location).await?))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Strictly increasing write timestamp, even when the clock stalls.
    async fn next_timestamp(conn: &Connection) -> Result<i64> {
        let mut rows = conn
            .query("SELECT COALESCE(MAX(created_at), 0) FROM listings", ())
            .await?;
        let latest: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(unix_timestamp_millis().max(latest + 1))
    }

    fn parse_listing(row: &libsql::Row) -> Result<Listing> {
        let id: String = row.get(0)?;
        let created_at: i64 = row.get(1)?;
        let document: String = row.get(2)?;
        Ok(Listing {
            id: ListingId::new(id),
            data: serde_json::from_str(&document)?,
            created_at,
        })
    }
}

/// SQL predicate and bound values for a filter
fn filter_clause(filter: &ListingFilter) -> (&'static str, Vec<Value>) {
    match filter {
        ListingFilter::All => ("1 = 1", Vec::new()),
        ListingFilter::Type(kind) => ("kind = ?", vec![Value::Text(kind.as_str().to_string())]),
        ListingFilter::Offer(offer) => ("offer = ?", vec![Value::Integer(i64::from(*offer))]),
        ListingFilter::Owner(owner) => ("owner_ref = ?", vec![Value::Text(owner.to_string())]),
    }
}

impl ListingStore for LibSqlListingStore {
    async fn query(&self, query: &ListingQuery) -> Result<QueryPage> {
        let (predicate, mut values) = filter_clause(&query.filter);
        let mut sql = format!("SELECT id, created_at, document FROM listings WHERE {predicate}");

        if let Some(cursor) = &query.start_after {
            let (created_at, id) = cursor.position()?;
            sql.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
            values.push(Value::Integer(created_at));
            values.push(Value::Integer(created_at));
            values.push(Value::Text(id));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        tracing::debug!(filter = %query.filter, limit = ?query.limit, "Querying listings");

        let db = self.db.lock().await;
        let mut rows = db.connection().query(&sql, values).await?;
        let mut listings = Vec::new();
        while let Some(row) = rows.next().await? {
            listings.push(Self::parse_listing(&row)?);
        }

        let last_cursor = listings.last().map(PageCursor::at);
        Ok(QueryPage {
            listings,
            last_cursor,
        })
    }

    async fn count(&self, filter: &ListingFilter) -> Result<Option<usize>> {
        let (predicate, values) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM listings WHERE {predicate}");

        let db = self.db.lock().await;
        let mut rows = db.connection().query(&sql, values).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(Some(usize::try_from(count).unwrap_or_default()))
    }

    async fn get(&self, id: &ListingId) -> Result<Option<Listing>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, created_at, document FROM listings WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_listing(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, data: ListingData) -> Result<ListingId> {
        let id = ListingId::generate();
        let document = serde_json::to_string(&data)?;

        let db = self.db.lock().await;
        let conn = db.connection();
        let created_at = Self::next_timestamp(conn).await?;
        conn.execute(
            "INSERT INTO listings (id, kind, offer, owner_ref, created_at, document)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id.as_str(),
                data.kind.as_str(),
                i64::from(data.offer),
                data.owner_ref.as_str(),
                created_at,
                document
            ],
        )
        .await?;

        tracing::info!(listing_id = %id, "Created listing");
        Ok(id)
    }

    async fn update(&self, id: &ListingId, data: ListingData) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut rows = conn
            .query("SELECT owner_ref FROM listings WHERE id = ?", [id.as_str()])
            .await?;
        let Some(row) = rows.next().await? else {
            return Err(Error::NotFound(id.to_string()));
        };
        let owner_ref: String = row.get(0)?;
        drop(rows);

        let data = ListingData {
            owner_ref: UserId::new(owner_ref),
            ..data
        };
        let document = serde_json::to_string(&data)?;
        let created_at = Self::next_timestamp(conn).await?;

        conn.execute(
            "UPDATE listings SET kind = ?, offer = ?, created_at = ?, document = ? WHERE id = ?",
            params![
                data.kind.as_str(),
                i64::from(data.offer),
                created_at,
                document,
                id.as_str()
            ],
        )
        .await?;

        tracing::info!(listing_id = %id, "Updated listing");
        Ok(())
    }

    async fn delete(&self, id: &ListingId) -> Result<()> {
        let db = self.db.lock().await;
        let affected = db
            .connection()
            .execute("DELETE FROM listings WHERE id = ?", [id.as_str()])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        tracing::info!(listing_id = %id, "Deleted listing");
        Ok(())
    }
}

impl ProfileStore for LibSqlListingStore {
    async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT name, email FROM users WHERE id = ?", [user.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(UserProfile {
                name: row.get(0)?,
                email: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, user: &UserId, profile: &UserProfile) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO users (id, name, email) VALUES (?, ?, ?)",
                [user.as_str(), profile.name.as_str(), profile.email.as_str()],
            )
            .await?;
        Ok(())
    }
}
