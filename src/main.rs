use anyhow::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repair_log::config::{DatabaseConfig, EnvironmentConfig};
use repair_log::create_app;
use repair_log::database::DatabaseConnection;
use repair_log::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenvy::dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repair_log=debug,tower_http=info")),
        )
        .init();

    info!("⏱️ Registro de Tiempo de Reparos");
    info!("================================");

    let config = EnvironmentConfig::from_env();
    let db_config = DatabaseConfig::from_env();

    // Inicializar base de datos y aplicar migraciones
    let db_connection = match DatabaseConnection::new(&db_config).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app_state = AppState::new(db_connection.pool().clone(), config);
    let app = create_app(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio");
    info!("   POST /api/repairs/start - Iniciar reparo");
    info!("   POST /api/repairs/stop - Finalizar reparo");
    info!("   GET  /api/repairs - Consultar registros");
    info!("   GET  /api/repairs/open - Reparos en curso");
    info!("   GET  /api/repairs/open/:vin - Reparo en curso de un VIN");
    info!("   GET  /api/repairs/vin/:vin - Historial de un VIN");
    info!("📈 Reportes:");
    info!("   GET  /api/reports/summary - MTTR y tiempo total");
    info!("   GET  /api/reports/operators - Resumen por operador");
    info!("   GET  /api/reports/daily - Reparos por fecha");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
    }

    db_connection.pool().close().await;
    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el manejador de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el manejador de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
