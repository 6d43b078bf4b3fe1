//! Conexión a SQLite
//!
//! Este módulo crea el pool de conexiones y aplica las migraciones
//! versionadas del esquema al arrancar.

use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::utils::errors::AppResult;

/// Migraciones versionadas embebidas desde `migrations/`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Conexión a la base de datos
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Crear la conexión y aplicar migraciones pendientes
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        info!("🗄️ Conectando a la base de datos {}", config.url);
        let pool = config.create_pool().await?;
        let connection = Self { pool };
        connection.run_migrations().await?;
        Ok(connection)
    }

    /// Base de datos en memoria, ya migrada
    pub async fn in_memory() -> AppResult<Self> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ejecutar migraciones de la base de datos (idempotente)
    pub async fn run_migrations(&self) -> AppResult<()> {
        MIGRATOR.run(&self.pool).await?;
        if let Some(latest) = MIGRATOR.iter().last() {
            info!(
                "✅ Esquema en versión {} ({})",
                latest.version, latest.description
            );
        }
        Ok(())
    }

    /// Verificar que la conexión funciona
    pub async fn ping(&self) -> AppResult<()> {
        ping_pool(&self.pool).await
    }
}

/// Consulta mínima contra el pool; la usa también el health check
pub async fn ping_pool(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
