//! SQLite-backed [`Storage`] implementation.
//!
//! A single connection behind a mutex serializes all access; timestamps are
//! stored as RFC 3339 text. The schema is created on open, so a fresh
//! database file is immediately usable.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Storage, StorageError, StorageResult};
use crate::types::{
    Account, AdViewRecord, NewProject, Platform, Project, ProjectKind, ProjectUpdate, Template,
    UsageRecord,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id              TEXT PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,
    coins           INTEGER NOT NULL DEFAULT 1250 CHECK (coins >= 0),
    trial_ends_at   TEXT,
    subscription_id TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id             TEXT PRIMARY KEY,
    account_id     TEXT NOT NULL REFERENCES accounts(id),
    name           TEXT NOT NULL,
    description    TEXT,
    kind           TEXT NOT NULL,
    platform       TEXT NOT NULL,
    generated_code TEXT,
    provider       TEXT,
    template_id    TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS templates (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    category    TEXT NOT NULL,
    difficulty  TEXT NOT NULL,
    rating      INTEGER NOT NULL DEFAULT 0,
    downloads   INTEGER NOT NULL DEFAULT 0,
    code        TEXT NOT NULL,
    image_url   TEXT,
    is_premium  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS usage_records (
    id         TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id),
    project_id TEXT,
    provider   TEXT NOT NULL,
    prompt     TEXT NOT NULL,
    response   TEXT NOT NULL,
    coins_cost INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ad_views (
    id           TEXT PRIMARY KEY,
    account_id   TEXT NOT NULL REFERENCES accounts(id),
    coins_earned INTEGER NOT NULL,
    ad_provider  TEXT NOT NULL,
    viewed_at    TEXT NOT NULL
);
";

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn balance(conn: &Connection, account_id: &str) -> StorageResult<u64> {
        let coins: Option<i64> = conn
            .query_row(
                "SELECT coins FROM accounts WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        coins
            .map(|c| c.max(0) as u64)
            .ok_or_else(|| StorageError::AccountMissing(account_id.to_string()))
    }
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_ts(s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        coins: row.get::<_, i64>(3)?.max(0) as u64,
        trial_ends_at: parse_opt_ts(row.get(4)?)?,
        subscription_id: row.get(5)?,
        created_at: parse_ts(&row.get::<_, String>(6)?)?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let kind: String = row.get(4)?;
    let platform: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        kind: ProjectKind::from_str(&kind).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        platform: Platform::from_str(&platform).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        generated_code: row.get(6)?,
        provider: row.get(7)?,
        template_id: row.get(8)?,
        created_at: parse_ts(&row.get::<_, String>(9)?)?,
        updated_at: parse_ts(&row.get::<_, String>(10)?)?,
    })
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        difficulty: row.get(4)?,
        rating: row.get::<_, i64>(5)?.max(0) as u32,
        downloads: row.get::<_, i64>(6)?.max(0) as u64,
        code: row.get(7)?,
        image_url: row.get(8)?,
        is_premium: row.get(9)?,
        created_at: parse_ts(&row.get::<_, String>(10)?)?,
    })
}

fn row_to_usage(row: &Row<'_>) -> rusqlite::Result<UsageRecord> {
    Ok(UsageRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        project_id: row.get(2)?,
        provider: row.get(3)?,
        prompt: row.get(4)?,
        response: row.get(5)?,
        coins_cost: row.get::<_, i64>(6)?.max(0) as u64,
        created_at: parse_ts(&row.get::<_, String>(7)?)?,
    })
}

fn row_to_ad_view(row: &Row<'_>) -> rusqlite::Result<AdViewRecord> {
    Ok(AdViewRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        coins_earned: row.get::<_, i64>(2)?.max(0) as u64,
        ad_provider: row.get(3)?,
        viewed_at: parse_ts(&row.get::<_, String>(4)?)?,
    })
}

impl Storage for SqliteStorage {
    fn account(&self, id: &str) -> StorageResult<Option<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, email, coins, trial_ends_at, subscription_id, created_at
             FROM accounts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_account)?;
        rows.next().transpose().map_err(StorageError::from)
    }

    fn create_account(&self, account: &Account) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (id, username, email, coins, trial_ends_at, subscription_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                account.id,
                account.username,
                account.email,
                account.coins as i64,
                account.trial_ends_at.map(|t| t.to_rfc3339()),
                account.subscription_id,
                account.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn credit_coins(&self, account_id: &str, amount: u64) -> StorageResult<u64> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET coins = coins + ?1 WHERE id = ?2",
            params![amount as i64, account_id],
        )?;
        if changed == 0 {
            return Err(StorageError::AccountMissing(account_id.to_string()));
        }
        Self::balance(&conn, account_id)
    }

    fn deduct_coins(&self, account_id: &str, amount: u64) -> StorageResult<u64> {
        let conn = self.conn()?;
        // Single guarded statement: the balance check and the write are one
        // atomic operation, so concurrent spenders cannot both succeed.
        let changed = conn.execute(
            "UPDATE accounts SET coins = coins - ?1 WHERE id = ?2 AND coins >= ?1",
            params![amount as i64, account_id],
        )?;
        if changed == 0 {
            // Distinguish a drained balance from a missing row.
            return match Self::balance(&conn, account_id) {
                Ok(_) => Err(StorageError::BalanceConflict),
                Err(e) => Err(e),
            };
        }
        Self::balance(&conn, account_id)
    }

    fn set_subscription(&self, account_id: &str, subscription_id: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET subscription_id = ?1 WHERE id = ?2",
            params![subscription_id, account_id],
        )?;
        if changed == 0 {
            return Err(StorageError::AccountMissing(account_id.to_string()));
        }
        Ok(())
    }

    fn append_usage(&self, record: &UsageRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO usage_records (id, account_id, project_id, provider, prompt, response, coins_cost, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.account_id,
                record.project_id,
                record.provider,
                record.prompt,
                record.response,
                record.coins_cost as i64,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn usage_for_account(&self, account_id: &str) -> StorageResult<Vec<UsageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, project_id, provider, prompt, response, coins_cost, created_at
             FROM usage_records WHERE account_id = ?1 ORDER BY created_at DESC",
        )?;
        let records = stmt
            .query_map(params![account_id], row_to_usage)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn append_ad_view(&self, record: &AdViewRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ad_views (id, account_id, coins_earned, ad_provider, viewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.account_id,
                record.coins_earned as i64,
                record.ad_provider,
                record.viewed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn ad_views_for_account(&self, account_id: &str) -> StorageResult<Vec<AdViewRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, coins_earned, ad_provider, viewed_at
             FROM ad_views WHERE account_id = ?1 ORDER BY viewed_at DESC",
        )?;
        let records = stmt
            .query_map(params![account_id], row_to_ad_view)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn create_project(&self, account_id: &str, new: NewProject) -> StorageResult<Project> {
        let project = new.into_project(account_id);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (id, account_id, name, description, kind, platform, generated_code, provider, template_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                project.id,
                project.account_id,
                project.name,
                project.description,
                project.kind.as_str(),
                project.platform.as_str(),
                project.generated_code,
                project.provider,
                project.template_id,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(project)
    }

    fn project(&self, id: &str) -> StorageResult<Option<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, description, kind, platform, generated_code, provider, template_id, created_at, updated_at
             FROM projects WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_project)?;
        rows.next().transpose().map_err(StorageError::from)
    }

    fn projects_for_account(&self, account_id: &str) -> StorageResult<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, description, kind, platform, generated_code, provider, template_id, created_at, updated_at
             FROM projects WHERE account_id = ?1 ORDER BY updated_at DESC",
        )?;
        let projects = stmt
            .query_map(params![account_id], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn update_project(&self, id: &str, update: &ProjectUpdate) -> StorageResult<Option<Project>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE projects SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                generated_code = COALESCE(?3, generated_code),
                provider = COALESCE(?4, provider),
                updated_at = ?5
             WHERE id = ?6",
            params![
                update.name,
                update.description,
                update.generated_code,
                update.provider,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, description, kind, platform, generated_code, provider, template_id, created_at, updated_at
             FROM projects WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_project)?;
        rows.next().transpose().map_err(StorageError::from)
    }

    fn delete_project(&self, id: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn insert_template(&self, template: &Template) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO templates (id, name, description, category, difficulty, rating, downloads, code, image_url, is_premium, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                template.id,
                template.name,
                template.description,
                template.category,
                template.difficulty,
                template.rating as i64,
                template.downloads as i64,
                template.code,
                template.image_url,
                template.is_premium,
                template.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn templates(&self) -> StorageResult<Vec<Template>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, category, difficulty, rating, downloads, code, image_url, is_premium, created_at
             FROM templates ORDER BY rating DESC",
        )?;
        let templates = stmt
            .query_map([], row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    fn template(&self, id: &str) -> StorageResult<Option<Template>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, category, difficulty, rating, downloads, code, image_url, is_premium, created_at
             FROM templates WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_template)?;
        rows.next().transpose().map_err(StorageError::from)
    }

    fn templates_by_category(&self, category: &str) -> StorageResult<Vec<Template>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, category, difficulty, rating, downloads, code, image_url, is_premium, created_at
             FROM templates WHERE category = ?1 ORDER BY rating DESC",
        )?;
        let templates = stmt
            .query_map(params![category], row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_account(coins: u64) -> (SqliteStorage, Account) {
        let storage = SqliteStorage::in_memory().unwrap();
        let mut account = Account::new("steve", "steve@example.com");
        account.coins = coins;
        account.trial_ends_at = None;
        storage.create_account(&account).unwrap();
        (storage, account)
    }

    #[test]
    fn test_account_round_trip() {
        let (storage, account) = storage_with_account(100);
        let loaded = storage.account(&account.id).unwrap().unwrap();
        assert_eq!(loaded.username, "steve");
        assert_eq!(loaded.coins, 100);
        assert!(loaded.trial_ends_at.is_none());
    }

    #[test]
    fn test_deduct_is_guarded() {
        let (storage, account) = storage_with_account(30);
        assert_eq!(storage.deduct_coins(&account.id, 20).unwrap(), 10);
        match storage.deduct_coins(&account.id, 20) {
            Err(StorageError::BalanceConflict) => {}
            other => panic!("expected BalanceConflict, got {other:?}"),
        }
        // Failed deduction left the balance untouched.
        assert_eq!(storage.account(&account.id).unwrap().unwrap().coins, 10);
    }

    #[test]
    fn test_deduct_from_missing_account() {
        let storage = SqliteStorage::in_memory().unwrap();
        match storage.deduct_coins("nope", 5) {
            Err(StorageError::AccountMissing(_)) => {}
            other => panic!("expected AccountMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_credit_returns_new_balance() {
        let (storage, account) = storage_with_account(5);
        assert_eq!(storage.credit_coins(&account.id, 15).unwrap(), 20);
    }

    #[test]
    fn test_usage_records_are_append_only_and_ordered() {
        let (storage, account) = storage_with_account(0);
        let first = UsageRecord::new(&account.id, None, "claude", "p1", "r1", 25);
        let mut second = UsageRecord::new(&account.id, None, "gpt", "p2", "r2", 28);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        storage.append_usage(&first).unwrap();
        storage.append_usage(&second).unwrap();

        let records = storage.usage_for_account(&account.id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].provider, "gpt");
        assert_eq!(records[1].coins_cost, 25);
    }

    #[test]
    fn test_project_lifecycle() {
        let (storage, account) = storage_with_account(0);
        let project = storage
            .create_project(
                &account.id,
                NewProject {
                    name: "Teleport Pads".into(),
                    description: None,
                    kind: ProjectKind::Plugin,
                    platform: Platform::Spigot,
                    template_id: None,
                },
            )
            .unwrap();

        let update = ProjectUpdate {
            generated_code: Some("public class TeleportPads {}".into()),
            provider: Some("claude".into()),
            ..Default::default()
        };
        let updated = storage.update_project(&project.id, &update).unwrap().unwrap();
        assert_eq!(updated.provider.as_deref(), Some("claude"));
        assert_eq!(updated.name, "Teleport Pads");

        storage.delete_project(&project.id).unwrap();
        assert!(storage.project(&project.id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_project_returns_none() {
        let storage = SqliteStorage::in_memory().unwrap();
        let result = storage
            .update_project("ghost", &ProjectUpdate::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_templates_ordered_by_rating() {
        let storage = SqliteStorage::in_memory().unwrap();
        for (name, rating) in [("Economy", 3), ("Quests", 5)] {
            let template = Template {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.into(),
                description: "starter".into(),
                category: "gameplay".into(),
                difficulty: "beginner".into(),
                rating,
                downloads: 0,
                code: "// template".into(),
                image_url: None,
                is_premium: false,
                created_at: Utc::now(),
            };
            storage.insert_template(&template).unwrap();
        }
        let templates = storage.templates().unwrap();
        assert_eq!(templates[0].name, "Quests");
        assert_eq!(
            storage.templates_by_category("gameplay").unwrap().len(),
            2
        );
    }
}
