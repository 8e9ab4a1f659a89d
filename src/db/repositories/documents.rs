use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
    models::DocumentRow,
};

const DOCUMENT_ID: i64 = 1;

fn row_to_document(row: &Row) -> Result<DocumentRow> {
    let version: i64 = row.get("version")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(DocumentRow {
        version: to_u32(version, "version")?,
        body: row.get("body")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn load_document(&self) -> Result<Option<DocumentRow>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT version, body, updated_at FROM store_documents WHERE id = ?1",
            )?;
            let row = stmt
                .query_row(params![DOCUMENT_ID], |row| Ok(row_to_document(row)))
                .optional()
                .context("failed to load store document")?;
            row.transpose()
        })
        .await
    }

    pub async fn save_document(
        &self,
        version: u32,
        body: String,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO store_documents (id, version, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     version = excluded.version,
                     body = excluded.body,
                     updated_at = excluded.updated_at",
                params![DOCUMENT_ID, i64::from(version), body, updated_at.to_rfc3339()],
            )
            .context("failed to save store document")?;
            Ok(())
        })
        .await
    }

    pub async fn clear_document(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM store_documents", [])
                .context("failed to clear store document")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn saves_overwrites_and_clears_the_single_row() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("aspire.sqlite3")).unwrap();
        assert!(db.load_document().await.unwrap().is_none());

        let now = Utc::now();
        db.save_document(1, "{\"a\":1}".into(), now).await.unwrap();
        db.save_document(1, "{\"a\":2}".into(), now).await.unwrap();

        let row = db.load_document().await.unwrap().unwrap();
        assert_eq!(row.version, 1);
        assert_eq!(row.body, "{\"a\":2}");

        db.clear_document().await.unwrap();
        assert!(db.load_document().await.unwrap().is_none());
    }
}
