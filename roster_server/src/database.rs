//! Durable champion store
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Every mutation runs in its own transaction; concurrent writers to the same
//! champion are applied in arrival order with no version check.

use crate::error::{Result, ServerError};
use roster_common::{
    decode_optional, validate_name, validate_rank_options, ChampionClass, ChampionPatch,
    ChampionRecord, ImagePayload, RosterError, StarRating,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

/// Result type for database operations
pub type DbResult<T> = Result<T>;

/// Role of the account created by [`ensure_bootstrap_account`]
pub const ADMIN_ROLE: &str = "admin";

/// Password hash that no password can match
pub const LOCKED_PASSWORD_HASH: &str = "!";

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `champions`: roster entries, images as raw BLOBs
/// - `users`: accounts allowed to manage the roster
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS champions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            class TEXT NOT NULL,
            star_rating TEXT NOT NULL,
            -- JSON array of rank option strings
            rank_options TEXT NOT NULL,
            portrait_image BLOB,
            full_image BLOB,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_champions_bucket ON champions(class, star_rating);

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Current time as a sortable RFC 3339 string
fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn champion_exists(tx: &Transaction<'_>, id: &str) -> DbResult<bool> {
    let found: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM champions WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert a new champion
///
/// The id comes from the caller. Images arrive as data URIs and are decoded
/// to raw bytes before they are written.
pub fn insert_champion(conn: &mut Connection, record: &ChampionRecord) -> DbResult<()> {
    if record.id.trim().is_empty() {
        return Err(RosterError::Validation("champion id is required".to_string()).into());
    }
    validate_name(&record.name)?;
    validate_rank_options(record.star_rating, &record.rank_options)?;
    let portrait = decode_optional(record.portrait_image.as_deref())?;
    let full = decode_optional(record.full_image.as_deref())?;
    let rank_options = serde_json::to_string(&record.rank_options)?;

    let tx = conn.transaction()?;
    if champion_exists(&tx, &record.id)? {
        log::error!("Refusing to insert duplicate champion id {}", record.id);
        return Err(RosterError::DuplicateId(record.id.clone()).into());
    }

    let timestamp = now();
    tx.execute(
        "INSERT INTO champions
         (id, name, class, star_rating, rank_options, portrait_image, full_image, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            &record.id,
            record.name.trim(),
            record.class.as_str(),
            record.star_rating.as_str(),
            &rank_options,
            portrait,
            full,
            &timestamp,
        ],
    )?;
    tx.commit()?;

    log::info!(
        "Inserted champion {} ({} {}) [{}]",
        record.name.trim(),
        record.star_rating,
        record.class,
        record.id
    );
    Ok(())
}

/// Apply a partial update to an existing champion
///
/// Fields missing from the patch keep their stored value. Images are
/// replaced only when the patch carries one (`COALESCE`), so an update can
/// never erase an image it was not given.
pub fn update_champion(conn: &mut Connection, id: &str, patch: &ChampionPatch) -> DbResult<()> {
    patch.validate_fields()?;
    let portrait = decode_optional(patch.portrait_image.as_deref())?;
    let full = decode_optional(patch.full_image.as_deref())?;
    let rank_options = patch
        .rank_options
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let tx = conn.transaction()?;
    let stored: Option<(String, String)> = tx
        .query_row(
            "SELECT star_rating, rank_options FROM champions WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((stored_rating, stored_options)) = stored else {
        return Err(RosterError::NotFound(id.to_string()).into());
    };

    // Rating and rank options are checked together on the merged result
    if patch.star_rating.is_some() || patch.rank_options.is_some() {
        let rating = match patch.star_rating {
            Some(rating) => rating,
            None => parse_column(id, &stored_rating)?,
        };
        let options: Vec<String> = match patch.rank_options {
            Some(ref options) => options.clone(),
            None => parse_rank_options(id, &stored_options)?,
        };
        validate_rank_options(rating, &options)?;
    }

    tx.execute(
        "UPDATE champions SET
            name = COALESCE(?1, name),
            class = COALESCE(?2, class),
            star_rating = COALESCE(?3, star_rating),
            rank_options = COALESCE(?4, rank_options),
            portrait_image = COALESCE(?5, portrait_image),
            full_image = COALESCE(?6, full_image),
            updated_at = ?7
         WHERE id = ?8",
        params![
            patch.name.as_deref().map(str::trim),
            patch.class.map(|c| c.as_str()),
            patch.star_rating.map(|r| r.as_str()),
            rank_options,
            portrait,
            full,
            now(),
            id,
        ],
    )?;
    tx.commit()?;

    log::info!("Updated champion {}", id);
    log::debug!(
        "Update for {} touched name={} class={} rating={} ranks={} portrait={} full={}",
        id,
        patch.name.is_some(),
        patch.class.is_some(),
        patch.star_rating.is_some(),
        patch.rank_options.is_some(),
        patch.portrait_image.is_some(),
        patch.full_image.is_some()
    );
    Ok(())
}

/// Raw row before the model types are parsed out of it
struct ChampionRow {
    id: String,
    name: String,
    class: String,
    star_rating: String,
    rank_options: String,
    portrait_image: Option<Vec<u8>>,
    full_image: Option<Vec<u8>>,
}

const CHAMPION_COLUMNS: &str =
    "id, name, class, star_rating, rank_options, portrait_image, full_image";

impl ChampionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            class: row.get(2)?,
            star_rating: row.get(3)?,
            rank_options: row.get(4)?,
            portrait_image: row.get(5)?,
            full_image: row.get(6)?,
        })
    }

    fn into_record(self) -> DbResult<ChampionRecord> {
        let class: ChampionClass = parse_column(&self.id, &self.class)?;
        let star_rating: StarRating = parse_column(&self.id, &self.star_rating)?;
        let rank_options = parse_rank_options(&self.id, &self.rank_options)?;

        Ok(ChampionRecord {
            id: self.id,
            name: self.name,
            class,
            star_rating,
            rank_options,
            portrait_image: encode_blob(self.portrait_image),
            full_image: encode_blob(self.full_image),
        })
    }
}

fn parse_column<T>(id: &str, value: &str) -> DbResult<T>
where
    T: std::str::FromStr<Err = RosterError>,
{
    value.parse().map_err(|e: RosterError| ServerError::CorruptRow {
        id: id.to_string(),
        reason: e.detail(),
    })
}

/// The rank options column holds a JSON array of strings
fn parse_rank_options(id: &str, value: &str) -> DbResult<Vec<String>> {
    serde_json::from_str(value).map_err(|e| ServerError::CorruptRow {
        id: id.to_string(),
        reason: format!("rank_options: {}", e),
    })
}

fn encode_blob(blob: Option<Vec<u8>>) -> Option<String> {
    blob.filter(|bytes| !bytes.is_empty())
        .map(|bytes| ImagePayload::sniffed(bytes).to_data_uri())
}

/// List every champion, images re-encoded as data URIs
///
/// Ordered by creation time, so the order is stable across calls and restarts.
pub fn list_champions(conn: &Connection) -> DbResult<Vec<ChampionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM champions ORDER BY created_at, rowid",
        CHAMPION_COLUMNS
    ))?;

    let rows: rusqlite::Result<Vec<ChampionRow>> =
        stmt.query_map([], ChampionRow::from_row)?.collect();
    rows?.into_iter().map(ChampionRow::into_record).collect()
}

/// Get a single champion by id
pub fn get_champion(conn: &Connection, id: &str) -> DbResult<Option<ChampionRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM champions WHERE id = ?1", CHAMPION_COLUMNS),
            params![id],
            ChampionRow::from_row,
        )
        .optional()?;
    row.map(ChampionRow::into_record).transpose()
}

/// Get total count of champions in database
pub fn champion_count(conn: &Connection) -> DbResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM champions", [], |row| row.get(0))?)
}

// ── Accounts ───────────────────────────────────────────────────────────────

/// The privileged account created on first start
#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    pub name: String,
    pub email: String,
    /// Produced by the external hashing collaborator, stored as-is
    pub password_hash: String,
}

/// Create the admin account if no admin exists yet
///
/// Decided by an existence query, so repeated runs never add a second admin
/// and never rely on a uniqueness violation. Returns whether an account was created.
pub fn ensure_bootstrap_account(conn: &Connection, account: &BootstrapAccount) -> DbResult<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE role = ?1 LIMIT 1",
            params![ADMIN_ROLE],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_some() {
        log::debug!("Admin account already present, skipping bootstrap");
        return Ok(false);
    }

    if account.password_hash == LOCKED_PASSWORD_HASH {
        log::warn!(
            "No admin password hash configured; account '{}' is created locked",
            account.name
        );
    }

    conn.execute(
        "INSERT INTO users (id, name, email, password, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            &account.name,
            &account.email,
            &account.password_hash,
            ADMIN_ROLE,
            now(),
        ],
    )?;

    log::info!("Created bootstrap admin account '{}'", account.name);
    Ok(true)
}

/// Get total count of accounts in database
pub fn account_count(conn: &Connection) -> DbResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_common::NewChampion;

    /// Create an in-memory database for testing
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn make_champion(id: &str, name: &str) -> ChampionRecord {
        NewChampion::new(name, ChampionClass::Cosmic, StarRating::Six, &["Rank 4", "Rank 5"])
            .with_id(id.to_string())
    }

    fn admin() -> BootstrapAccount {
        BootstrapAccount {
            name: "Administrator".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$argon2id$test".to_string(),
        }
    }

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_db();

        for table in ["champions", "users"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = test_db();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn insert_then_list_returns_record() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Captain Marvel")).unwrap();

        let all = list_champions(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], make_champion("a", "Captain Marvel"));
    }

    #[test]
    fn insert_stores_images_as_raw_bytes() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.portrait_image = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
        insert_champion(&mut conn, &record).unwrap();

        let blob: Vec<u8> = conn
            .query_row(
                "SELECT portrait_image FROM champions WHERE id = ?1",
                params!["a"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(blob, b"\x89PNG\r\n\x1a\n".to_vec());

        let full: Option<Vec<u8>> = conn
            .query_row(
                "SELECT full_image FROM champions WHERE id = ?1",
                params!["a"],
                |row| row.get(0),
            )
            .unwrap();
        assert!(full.is_none());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Hulk")).unwrap();

        let err = insert_champion(&mut conn, &make_champion("a", "Thor")).unwrap_err();
        assert!(matches!(
            err.roster(),
            Some(RosterError::DuplicateId(id)) if id == "a"
        ));
        assert_eq!(champion_count(&conn).unwrap(), 1);
    }

    #[test]
    fn insert_rejects_rank_outside_vocabulary() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.rank_options = vec!["Rank 1".to_string()];

        let err = insert_champion(&mut conn, &record).unwrap_err();
        assert!(matches!(err.roster(), Some(RosterError::Validation(_))));
        assert_eq!(champion_count(&conn).unwrap(), 0);
    }

    #[test]
    fn insert_rejects_empty_rank_options() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.rank_options.clear();

        let err = insert_champion(&mut conn, &record).unwrap_err();
        assert!(matches!(err.roster(), Some(RosterError::Validation(_))));
    }

    #[test]
    fn insert_rejects_malformed_image() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.full_image = Some("not a data uri".to_string());

        let err = insert_champion(&mut conn, &record).unwrap_err();
        assert!(matches!(err.roster(), Some(RosterError::Validation(_))));
        assert_eq!(champion_count(&conn).unwrap(), 0);
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut conn = test_db();
        let patch = ChampionPatch {
            name: Some("X".to_string()),
            ..Default::default()
        };

        let err = update_champion(&mut conn, "nope", &patch).unwrap_err();
        assert!(matches!(err.roster(), Some(RosterError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn update_name_keeps_images() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.portrait_image = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
        record.full_image = Some("data:image/gif;base64,R0lGODlhAQABAA==".to_string());
        insert_champion(&mut conn, &record).unwrap();

        let patch = ChampionPatch {
            name: Some("X".to_string()),
            ..Default::default()
        };
        update_champion(&mut conn, "a", &patch).unwrap();

        let stored = get_champion(&conn, "a").unwrap().unwrap();
        assert_eq!(stored.name, "X");
        assert_eq!(stored.portrait_image, record.portrait_image);
        assert_eq!(stored.full_image, record.full_image);
        assert_eq!(stored.rank_options, record.rank_options);
    }

    #[test]
    fn update_replaces_only_given_image() {
        let mut conn = test_db();
        let mut record = make_champion("a", "Hulk");
        record.portrait_image = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
        record.full_image = Some("data:image/gif;base64,R0lGODlhAQABAA==".to_string());
        insert_champion(&mut conn, &record).unwrap();

        let patch = ChampionPatch {
            full_image: Some("data:image/jpeg;base64,/9j/4AAQ".to_string()),
            ..Default::default()
        };
        update_champion(&mut conn, "a", &patch).unwrap();

        let stored = get_champion(&conn, "a").unwrap().unwrap();
        assert_eq!(stored.portrait_image, record.portrait_image);
        assert_eq!(
            stored.full_image.as_deref(),
            Some("data:image/jpeg;base64,/9j/4AAQ")
        );
    }

    #[test]
    fn update_revalidates_rank_options_against_new_rating() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Hulk")).unwrap();

        // Existing 6-star ranks are illegal for a 7-star champion
        let patch = ChampionPatch {
            star_rating: Some(StarRating::Seven),
            ..Default::default()
        };
        let err = update_champion(&mut conn, "a", &patch).unwrap_err();
        assert!(matches!(err.roster(), Some(RosterError::Validation(_))));

        let patch = ChampionPatch {
            star_rating: Some(StarRating::Seven),
            rank_options: Some(vec!["Rank 2".to_string()]),
            ..Default::default()
        };
        update_champion(&mut conn, "a", &patch).unwrap();

        let stored = get_champion(&conn, "a").unwrap().unwrap();
        assert_eq!(stored.star_rating, StarRating::Seven);
        assert_eq!(stored.rank_options, vec!["Rank 2".to_string()]);
    }

    #[test]
    fn update_rejects_blank_name() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Hulk")).unwrap();

        let patch = ChampionPatch {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(update_champion(&mut conn, "a", &patch).is_err());
        assert_eq!(get_champion(&conn, "a").unwrap().unwrap().name, "Hulk");
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut conn = test_db();
        for (id, name) in [("z", "Zemo"), ("a", "Abomination"), ("m", "Magik")] {
            insert_champion(&mut conn, &make_champion(id, name)).unwrap();
        }

        let names: Vec<String> = list_champions(&conn)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Zemo", "Abomination", "Magik"]);
    }

    #[test]
    fn list_returns_empty_when_store_empty() {
        let conn = test_db();
        assert!(list_champions(&conn).unwrap().is_empty());
    }

    #[test]
    fn corrupt_class_column_is_reported() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Hulk")).unwrap();
        conn.execute("UPDATE champions SET class = 'Bogus' WHERE id = 'a'", [])
            .unwrap();

        let err = list_champions(&conn).unwrap_err();
        assert!(matches!(err, ServerError::CorruptRow { ref id, .. } if id == "a"));
    }

    #[test]
    fn corrupt_rank_options_column_is_reported_on_list_and_update() {
        let mut conn = test_db();
        insert_champion(&mut conn, &make_champion("a", "Hulk")).unwrap();
        conn.execute("UPDATE champions SET rank_options = 'not json' WHERE id = 'a'", [])
            .unwrap();

        let err = list_champions(&conn).unwrap_err();
        assert!(matches!(err, ServerError::CorruptRow { ref id, .. } if id == "a"));

        let patch = ChampionPatch {
            star_rating: Some(StarRating::Six),
            ..Default::default()
        };
        let err = update_champion(&mut conn, "a", &patch).unwrap_err();
        assert!(matches!(err, ServerError::CorruptRow { ref id, .. } if id == "a"));
    }

    #[test]
    fn bootstrap_creates_single_admin() {
        let conn = test_db();

        assert!(ensure_bootstrap_account(&conn, &admin()).unwrap());
        assert!(!ensure_bootstrap_account(&conn, &admin()).unwrap());
        assert!(!ensure_bootstrap_account(&conn, &admin()).unwrap());

        assert_eq!(account_count(&conn).unwrap(), 1);
        let role: String = conn
            .query_row("SELECT role FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(role, ADMIN_ROLE);
    }

    #[test]
    fn bootstrap_skips_when_admin_has_other_name() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO users (id, name, email, password, role) VALUES ('1', 'root', 'root@example.com', 'x', 'admin')",
            [],
        )
        .unwrap();

        assert!(!ensure_bootstrap_account(&conn, &admin()).unwrap());
        assert_eq!(account_count(&conn).unwrap(), 1);
    }
}
