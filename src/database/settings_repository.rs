use crate::database::error::DbResult;
use async_trait::async_trait;

#[cfg(feature = "database")]
use crate::database::error::DatabaseError;
#[cfg(feature = "database")]
use sqlx::PgPool;

pub const SETTINGS_VALIDATED_KEY: &str = "viva_settings_validated";
pub const IPN_VALIDATED_KEY: &str = "viva_ipn_validated";
pub const NOTICE_KEY_PREFIX: &str = "viva_notice:";

pub fn notice_key(name: &str) -> String {
    format!("{}{}", NOTICE_KEY_PREFIX, name)
}

/// Key/value gateway settings, including dismissible notice flags.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DbResult<()>;
}

#[cfg(feature = "database")]
pub struct PgSettingsRepository {
    pool: PgPool,
}

#[cfg(feature = "database")]
impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SettingsStore for PgSettingsRepository {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM gateway_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO gateway_settings (key, value)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}
