//! Generation lifecycle persistence.
//!
//! Install and activate each run as one SQLite transaction, so a generation
//! is either fully populated or absent, and cutover from the old generation
//! to the new one is atomic.

use super::connection::CacheDb;
use super::entries::{EntryRow, upsert_entry};
use crate::generation::{Generation, GenerationName, GenerationState};
use crate::{Error, Request, Response};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

impl CacheDb {
    /// Persist a fully fetched generation and all of its entries.
    ///
    /// A new generation lands in `installed`. Reinstalling an existing
    /// generation keeps its state and overwrites matching entries.
    /// Returns the number of entries written.
    pub async fn install_generation(
        &self, generation: &GenerationName, entries: Vec<(Request, Response)>,
    ) -> Result<usize, Error> {
        let name = generation.as_str().to_string();
        let version = generation.version().to_string();
        let rows = entries
            .iter()
            .map(|(req, res)| EntryRow::encode(req, res))
            .collect::<Result<Vec<_>, Error>>()?;

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO generations (name, version, state, created_at)
                     VALUES (?1, ?2, 'installed', ?3)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, version, now],
                )?;
                for row in &rows {
                    upsert_entry(&tx, &name, row, &now)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Make `name` the only generation: delete every other one (entries
    /// cascade) and mark it active.
    ///
    /// Returns the names of the deleted generations.
    pub async fn activate_generation(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;

                let state: Option<String> = tx
                    .query_row("SELECT state FROM generations WHERE name = ?1", params![name], |row| row.get(0))
                    .optional()?;
                let current = match state {
                    Some(s) => s.parse::<GenerationState>()?,
                    None => GenerationState::Absent,
                };
                current.transition(GenerationState::Active)?;

                let stale = {
                    let mut stmt = tx.prepare("SELECT name FROM generations WHERE name != ?1 ORDER BY name")?;
                    let names = stmt
                        .query_map(params![name], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    names
                };

                tx.execute("DELETE FROM generations WHERE name != ?1", params![name])?;
                tx.execute(
                    "UPDATE generations SET state = 'active', activated_at = COALESCE(activated_at, ?2)
                     WHERE name = ?1",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stored generations, sorted.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All stored generations with their metadata.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(String, String, String, String, Option<String>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name, version, state, created_at, activated_at FROM generations ORDER BY created_at, name",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(name, version, state, created_at, activated_at)| {
                Ok(Generation { name, version, state: state.parse()?, created_at, activated_at })
            })
            .collect()
    }

    /// Persisted state of a generation, `None` if it does not exist.
    pub async fn generation_state(&self, name: &str) -> Result<Option<GenerationState>, Error> {
        let name = name.to_string();
        let state = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let state = conn
                    .query_row("SELECT state FROM generations WHERE name = ?1", params![name], |row| row.get(0))
                    .optional()?;
                Ok(state)
            })
            .await
            .map_err(Error::from)?;

        state.map(|s| s.parse()).transpose()
    }

    /// Name of the active generation, if any.
    pub async fn active_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let name = conn
                    .query_row("SELECT name FROM generations WHERE state = 'active' LIMIT 1", [], |row| row.get(0))
                    .optional()?;
                Ok(name)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn entry(path: &str) -> (Request, Response) {
        let url = Url::parse(&format!("https://example.com/{path}")).unwrap();
        (Request::get(url.clone()), Response::new(url, 200, format!("body of {path}")))
    }

    fn name(version: &str) -> GenerationName {
        GenerationName::new("site", version).unwrap()
    }

    #[tokio::test]
    async fn test_install_creates_installed_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let written = db
            .install_generation(&name("v1"), vec![entry("a.css"), entry("b.js")])
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(db.generation_state("site-v1").await.unwrap(), Some(GenerationState::Installed));
        assert_eq!(db.entry_count("site-v1").await.unwrap(), 2);
        assert_eq!(db.active_generation().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_activate_deletes_other_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation(&name("v1"), vec![entry("a.css")]).await.unwrap();
        db.activate_generation("site-v1").await.unwrap();
        db.install_generation(&name("v2"), vec![entry("a.css")]).await.unwrap();
        db.install_generation(&name("v3"), vec![entry("a.css")]).await.unwrap();

        let deleted = db.activate_generation("site-v2").await.unwrap();

        assert_eq!(deleted, vec!["site-v1".to_string(), "site-v3".to_string()]);
        assert_eq!(db.generation_names().await.unwrap(), vec!["site-v2".to_string()]);
        assert_eq!(db.active_generation().await.unwrap(), Some("site-v2".to_string()));
        assert_eq!(db.entry_count("site-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_activate_missing_generation_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation(&name("v1"), vec![entry("a.css")]).await.unwrap();
        db.activate_generation("site-v1").await.unwrap();

        let result = db.activate_generation("site-v2").await;

        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert_eq!(db.active_generation().await.unwrap(), Some("site-v1".to_string()));
    }

    #[tokio::test]
    async fn test_reinstall_keeps_active_state() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation(&name("v1"), vec![entry("a.css")]).await.unwrap();
        db.activate_generation("site-v1").await.unwrap();

        db.install_generation(&name("v1"), vec![entry("a.css"), entry("b.js")]).await.unwrap();

        assert_eq!(db.generation_state("site-v1").await.unwrap(), Some(GenerationState::Active));
        assert_eq!(db.entry_count("site-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.install_generation(&name("v1"), vec![entry("a.css")]).await.unwrap();

        let generations = db.list_generations().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].version, "v1");
        assert_eq!(generations[0].state, GenerationState::Installed);
        assert!(generations[0].activated_at.is_none());

        db.activate_generation("site-v1").await.unwrap();
        let generations = db.list_generations().await.unwrap();
        assert_eq!(generations[0].state, GenerationState::Active);
        assert!(generations[0].activated_at.is_some());
    }
}
