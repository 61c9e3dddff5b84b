//! Cache entry reads and writes within a generation.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::{Error, Request, Response};
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;
use url::Url;

/// An entry encoded for storage.
#[derive(Debug, Clone)]
pub(crate) struct EntryRow {
    request_key: String,
    method: String,
    url: String,
    response_url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    pub(crate) fn encode(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Self {
            request_key: compute_request_key(&request.method, &request.url),
            method: request.method.to_ascii_uppercase(),
            url: request.normalized_url().to_string(),
            response_url: response.url.to_string(),
            status: i64::from(response.status),
            headers_json,
            body: response.body.clone(),
        })
    }
}

/// Insert or overwrite one entry. Runs on the connection thread.
pub(crate) fn upsert_entry(
    conn: &rusqlite::Connection, generation: &str, row: &EntryRow, stored_at: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO entries (
            generation, request_key, method, url, response_url,
            status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(generation, request_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            response_url = excluded.response_url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.request_key,
            &row.method,
            &row.url,
            &row.response_url,
            row.status,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

fn decode(response_url: &str, status: i64, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let url = Url::parse(response_url).map_err(|e| Error::CorruptEntry(format!("{response_url}: {e}")))?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status out of range: {status}")))?;
    let headers: Vec<(String, String)> =
        serde_json::from_str(headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(Response { url, status, headers, body, source: crate::ResponseSource::Cache })
}

impl CacheDb {
    /// Store a response for `request` in `generation`, overwriting any
    /// previous entry for the same request key.
    ///
    /// Fails if the generation does not exist.
    pub async fn put_entry(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::encode(request, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                upsert_entry(conn, &generation, &row, &chrono::Utc::now().to_rfc3339())?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for `request` in `generation`.
    pub async fn match_entry(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key = compute_request_key(&request.method, &request.url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, i64, String, Vec<u8>)>, Error> {
                let row = conn
                    .query_row(
                        "SELECT response_url, status, headers_json, body
                         FROM entries WHERE generation = ?1 AND request_key = ?2",
                        params![generation, key],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(|(url, status, headers, body)| decode(&url, status, &headers, body))
            .transpose()
    }

    /// Normalized request URLs stored in `generation`, sorted.
    pub async fn entry_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `generation`.
    pub async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationName;
    use crate::ResponseSource;

    async fn db_with_generation() -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        let name = GenerationName::new("site", "v1").unwrap();
        db.install_generation(&name, Vec::new()).await.unwrap();
        db
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = db_with_generation().await;
        let req = Request::get(url("https://example.com/styles.css"));
        let res = Response::new(url("https://example.com/styles.css"), 200, "body { margin: 0 }")
            .with_header("Content-Type", "text/css")
            .with_header("Set-Cookie", "a=1")
            .with_header("Set-Cookie", "b=2");

        db.put_entry("site-v1", &req, &res).await.unwrap();
        let cached = db.match_entry("site-v1", &req).await.unwrap().unwrap();

        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, res.body);
        assert_eq!(cached.headers, res.headers);
        assert_eq!(cached.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let db = db_with_generation().await;
        let req = Request::get(url("https://example.com/"));
        db.put_entry("site-v1", &req, &Response::new(url("https://example.com/"), 200, "home"))
            .await
            .unwrap();

        let with_fragment = Request::get(url("https://example.com/#contact"));
        assert!(db.match_entry("site-v1", &with_fragment).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = db_with_generation().await;
        let req = Request::get(url("https://example.com/nope.css"));
        assert!(db.match_entry("site-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_single_entry() {
        let db = db_with_generation().await;
        let req = Request::get(url("https://example.com/script.js"));
        db.put_entry("site-v1", &req, &Response::new(req.url.clone(), 200, "v1")).await.unwrap();
        db.put_entry("site-v1", &req, &Response::new(req.url.clone(), 200, "v2")).await.unwrap();

        assert_eq!(db.entry_count("site-v1").await.unwrap(), 1);
        let cached = db.match_entry("site-v1", &req).await.unwrap().unwrap();
        assert_eq!(cached.body, b"v2".to_vec());
    }

    #[tokio::test]
    async fn test_put_into_missing_generation_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = Request::get(url("https://example.com/a.css"));
        let result = db.put_entry("site-v9", &req, &Response::new(req.url.clone(), 200, "")).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_list_entries_sorted() {
        let db = db_with_generation().await;
        let a = Request::get(url("https://example.com/a.css"));
        let b = Request::get(url("https://example.com/b.css"));
        db.put_entry("site-v1", &b, &Response::new(b.url.clone(), 200, "")).await.unwrap();
        db.put_entry("site-v1", &a, &Response::new(a.url.clone(), 200, "")).await.unwrap();

        assert_eq!(
            db.entry_urls("site-v1").await.unwrap(),
            vec!["https://example.com/a.css".to_string(), "https://example.com/b.css".to_string()]
        );
        assert_eq!(db.entry_count("site-v1").await.unwrap(), 2);
    }
}
