//! SQLite-backed listing store
//!
//! Each retrieval opens its own read-only connection on a blocking worker, so
//! concurrent requests share nothing but the database file.
//!
//! Text comparisons go through `fold_case` and `tag_key`, scalar functions
//! registered per connection that apply the same Unicode folding as
//! [`MemoryStore`](super::MemoryStore). Stored tags therefore filter the same
//! way whatever their case or padding.

use super::{ListingStore, StoreError};
use crate::geo::{haversine_meters, BoundingBox};
use crate::listing::{
    tag_key, GeoPoint, ListingRecord, ListingSummary, NearbyListing, PropertyType,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id            INTEGER PRIMARY KEY,
    title         TEXT NOT NULL CHECK (length(title) > 0),
    property_type TEXT NOT NULL,
    longitude     REAL,
    latitude      REAL,
    listing_type  TEXT
);
CREATE INDEX IF NOT EXISTS idx_properties_title ON properties (title);
CREATE INDEX IF NOT EXISTS idx_properties_latitude ON properties (latitude);
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the `properties` table, creating the database file if needed
    pub fn create_schema(&self) -> Result<(), StoreError> {
        let conn = open_read_write(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Database schema ready at {}", self.path.display());
        Ok(())
    }

    /// Insert records in one transaction, returning the number written
    pub fn insert(&self, records: &[ListingRecord]) -> Result<usize, StoreError> {
        let mut conn = open_read_write(&self.path)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO properties (title, property_type, longitude, latitude, listing_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.title,
                    record.property_type.as_str(),
                    record.location.map(|p| p.longitude),
                    record.location.map(|p| p.latitude),
                    record.listing_type,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} listings", records.len());
        Ok(records.len())
    }

    /// Run `op` against a fresh read-only connection on the blocking pool
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_read_only(&path)?;
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Blocking query task failed: {}", e)))?
    }
}

fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StoreError::Unavailable(format!("Open {} failed: {}", path.display(), e)))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    register_folding(&conn)?;
    Ok(conn)
}

fn register_folding(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("fold_case", 1, flags, |ctx| {
        Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase()))
    })?;
    conn.create_scalar_function("tag_key", 1, flags, |ctx| {
        Ok(ctx.get::<Option<String>>(0)?.map(|tag| tag_key(&tag)))
    })
}

fn open_read_write(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)
        .map_err(|e| StoreError::Unavailable(format!("Open {} failed: {}", path.display(), e)))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(conn)
}

/// `AND tag_key(property_type) IN (...)` for the given filter, pushing its parameters
fn type_clause(types: Option<&[PropertyType]>, params: &mut Vec<Value>) -> String {
    match types {
        None => String::new(),
        Some([]) => " AND 0".to_string(),
        Some(types) => {
            let placeholders = vec!["?"; types.len()].join(", ");
            params.extend(types.iter().map(|t| Value::Text(t.key())));
            format!(" AND tag_key(property_type) IN ({})", placeholders)
        }
    }
}

/// Pattern for `LIKE ? ESCAPE '\'` matching `fragment` anywhere
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn read_summaries(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> Result<Vec<ListingSummary>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        Ok(ListingSummary {
            title: row.get(0)?,
            property_type: PropertyType::from(row.get::<_, String>(1)?),
        })
    })?;
    let summaries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

fn query_within(
    conn: &Connection,
    center: GeoPoint,
    radius_meters: f64,
    types: Option<&[PropertyType]>,
    limit: usize,
) -> Result<Vec<NearbyListing>, StoreError> {
    let bbox = BoundingBox::around(center, radius_meters);
    let mut sql = String::from(
        "SELECT title, property_type, longitude, latitude FROM properties
         WHERE longitude IS NOT NULL AND latitude IS NOT NULL
           AND latitude BETWEEN ? AND ?",
    );
    let mut params = vec![Value::Real(bbox.min_latitude), Value::Real(bbox.max_latitude)];
    if let Some((min_lon, max_lon)) = bbox.longitude_range {
        sql.push_str(" AND longitude BETWEEN ? AND ?");
        params.push(Value::Real(min_lon));
        params.push(Value::Real(max_lon));
    }
    sql.push_str(&type_clause(types, &mut params));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;

    let mut hits = Vec::new();
    for row in rows {
        let (title, kind, longitude, latitude) = row?;
        let distance_meters = haversine_meters(center, GeoPoint::new(longitude, latitude));
        if distance_meters <= radius_meters {
            hits.push(NearbyListing {
                listing: ListingSummary {
                    title,
                    property_type: PropertyType::from(kind),
                },
                distance_meters,
            });
        }
    }

    hits.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| a.listing.title.cmp(&b.listing.title))
    });
    hits.truncate(limit);
    Ok(hits)
}

impl ListingStore for SqliteStore {
    async fn find_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<NearbyListing>, StoreError> {
        let types = types.map(<[PropertyType]>::to_vec);
        self.run(move |conn| query_within(conn, center, radius_meters, types.as_deref(), limit))
            .await
    }

    async fn find_by_title(
        &self,
        fragment: &str,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<ListingSummary>, StoreError> {
        let mut params = vec![Value::Text(like_pattern(&fragment.to_lowercase()))];
        let filter = type_clause(types, &mut params);
        params.push(Value::Integer(limit as i64));
        let sql = format!(
            "SELECT DISTINCT title, property_type FROM properties
             WHERE fold_case(title) LIKE ? ESCAPE '\\'{}
             ORDER BY title, property_type LIMIT ?",
            filter
        );
        self.run(move |conn| read_summaries(conn, &sql, params)).await
    }

    async fn distinct_titles(&self, limit: usize) -> Result<Vec<ListingSummary>, StoreError> {
        let params = vec![Value::Integer(limit as i64)];
        self.run(move |conn| {
            read_summaries(
                conn,
                "SELECT DISTINCT title, property_type FROM properties
                 ORDER BY title, property_type LIMIT ?",
                params,
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("listings.db"));
        store.create_schema().unwrap();
        store
            .insert(&[
                ListingRecord::new("Surian Residences", PropertyType::Condominium)
                    .at(101.595, 3.151),
                ListingRecord::new("Kota Damansara Apartment", PropertyType::Apartment)
                    .at(101.600, 3.160),
                ListingRecord::new("Buloh Terrace House", PropertyType::House).at(101.578, 3.206),
                ListingRecord::new("100% Freehold Shoplot", PropertyType::from("commercial")),
                ListingRecord::new("1000 Freehold Acres", PropertyType::from("industrial")),
                ListingRecord::new("Unmapped Apartment", PropertyType::Apartment),
            ])
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("100%_x\\"), "%100\\%\\_x\\\\%");
    }

    #[test]
    fn test_type_clause() {
        let mut params = Vec::new();
        assert_eq!(type_clause(None, &mut params), "");
        assert_eq!(type_clause(Some(&[][..]), &mut params), " AND 0");
        let clause = type_clause(
            Some(&[PropertyType::Apartment, PropertyType::House][..]),
            &mut params,
        );
        assert_eq!(clause, " AND tag_key(property_type) IN (?, ?)");
        assert_eq!(params.len(), 2);

        params.clear();
        type_clause(Some(&[PropertyType::from("Office Tower ")][..]), &mut params);
        assert_eq!(params, vec![Value::Text("office tower".to_string())]);
    }

    #[tokio::test]
    async fn test_find_by_title() {
        let (_dir, store) = fixture();
        let hits = store.find_by_title("apartment", None, 50).await.unwrap();
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Kota Damansara Apartment", "Unmapped Apartment"]);

        let hits = store
            .find_by_title("a", Some(&[PropertyType::House][..]), 50)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].property_type, PropertyType::House);
    }

    #[tokio::test]
    async fn test_find_by_title_literal_wildcards() {
        let (_dir, store) = fixture();
        let hits = store.find_by_title("100%", None, 50).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Freehold Shoplot");
        assert_eq!(hits[0].property_type, PropertyType::from("commercial"));
    }

    #[tokio::test]
    async fn test_find_within() {
        let (_dir, store) = fixture();
        let hits = store
            .find_within(GeoPoint::new(101.594, 3.150), 5_000.0, None, 50)
            .await
            .unwrap();
        let titles: Vec<&str> = hits.iter().map(|h| h.listing.title.as_str()).collect();
        assert_eq!(titles, vec!["Surian Residences", "Kota Damansara Apartment"]);
        assert!(hits[0].distance_meters < hits[1].distance_meters);
    }

    #[tokio::test]
    async fn test_distinct_titles_limit() {
        let (_dir, store) = fixture();
        assert_eq!(store.distinct_titles(100).await.unwrap().len(), 6);
        let first = store.distinct_titles(1).await.unwrap();
        assert_eq!(first[0].title, "100% Freehold Shoplot");
    }

    /// Rows written by another tool, tags exactly as given
    fn raw_fixture(rows: &[(&str, &str)]) -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("raw.db"));
        store.create_schema().unwrap();
        let conn = Connection::open(store.path()).unwrap();
        for (title, tag) in rows {
            conn.execute(
                "INSERT INTO properties (title, property_type) VALUES (?1, ?2)",
                params![title, tag],
            )
            .unwrap();
        }
        (dir, store)
    }

    #[tokio::test]
    async fn test_stored_tags_filter_like_memory_store() {
        let rows = [
            ("Mont Kiara Villa", "House"),
            ("Mont Kiara Suites", " Condominium "),
            ("Mont Kiara Tower", "Office Tower"),
            ("\u{d6}lm\u{fc}hle Haus", "house"),
        ];
        let (_dir, sqlite) = raw_fixture(&rows);
        let memory = crate::store::MemoryStore::new(
            rows.iter()
                .map(|(title, tag)| ListingRecord::new(*title, PropertyType::from(*tag)))
                .collect(),
        );

        let houses = [PropertyType::House];
        let condo_or_office = [PropertyType::Condominium, PropertyType::from("office tower")];
        let filters: [Option<&[PropertyType]>; 3] =
            [Some(&houses[..]), Some(&condo_or_office[..]), None];
        for types in filters {
            let from_sqlite = sqlite.find_by_title("mont kiara", types, 50).await.unwrap();
            let from_memory = memory.find_by_title("mont kiara", types, 50).await.unwrap();
            assert_eq!(from_sqlite, from_memory);
            assert!(!from_sqlite.is_empty());
        }

        let villas = sqlite
            .find_by_title("mont kiara", Some(&houses[..]), 50)
            .await
            .unwrap();
        assert_eq!(villas.len(), 1);
        assert_eq!(villas[0].title, "Mont Kiara Villa");
        assert_eq!(villas[0].property_type, PropertyType::House);

        // unknown tags come back as written
        let all = sqlite.find_by_title("tower", None, 50).await.unwrap();
        assert_eq!(all[0].property_type.as_str(), "Office Tower");
    }

    #[tokio::test]
    async fn test_find_by_title_folds_unicode_case() {
        let (_dir, store) = raw_fixture(&[("\u{d6}lm\u{fc}hle Haus", "house")]);
        let hits = store.find_by_title("\u{d6}LM\u{dc}HLE", None, 50).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "\u{d6}lm\u{fc}hle Haus");
    }

    #[tokio::test]
    async fn test_missing_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("absent.db"));
        let err = store.distinct_titles(10).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_missing_table_is_query_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER);")
            .unwrap();

        let store = SqliteStore::new(path);
        let err = store.find_by_title("abc", None, 10).await.unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
