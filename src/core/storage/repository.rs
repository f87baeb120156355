use std::collections::BTreeMap;
use std::path::Path;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::models::ParameterRecord;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to read parameters file {path}: {source}")]
    SeedFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid parameters file: {0}")]
    SeedFormat(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ParameterRepository {
    pool: SqlitePool,
}

impl ParameterRepository {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn put_parameter(&self, name: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO parameters (name, value)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET
              value = excluded.value,
              updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Non-recursive: names that still contain `/` once the prefix is
    /// removed belong to a nested path and are left out.
    pub async fn get_parameters_by_path(
        &self,
        path_prefix: &str,
    ) -> Result<BTreeMap<String, String>, StorageError> {
        let rows = sqlx::query_as::<_, ParameterRecord>(
            r#"
            SELECT name, value, created_at, updated_at
            FROM parameters
            WHERE substr(name, 1, length(?1)) = ?1
            ORDER BY name
            "#,
        )
        .bind(path_prefix)
        .fetch_all(&self.pool)
        .await?;

        let parameters = rows
            .into_iter()
            .filter_map(|row| {
                let key = row.name.strip_prefix(path_prefix)?;
                if key.is_empty() || key.contains('/') {
                    return None;
                }
                Some((key.to_string(), row.value))
            })
            .collect();
        Ok(parameters)
    }

    /// Upserts every `{"full/name": "value"}` pair from a JSON object.
    pub async fn import_parameters_file(&self, path: &Path) -> Result<usize, StorageError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StorageError::SeedFile {
            path: path.display().to_string(),
            source,
        })?;
        let parameters: BTreeMap<String, String> = serde_json::from_str(&raw)?;

        let mut imported = 0_usize;
        for (name, value) in &parameters {
            self.put_parameter(name, value).await?;
            imported += 1;
        }
        Ok(imported)
    }
}
