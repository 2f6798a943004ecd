//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use paisagismo_backend::{
    config::{AppState, Settings},
    routes::build_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().context("Falha ao carregar a configuração")?;
    let (app_state, db_pool) = AppState::connect(&settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some((email, password)) = &settings.admin_bootstrap {
        app_state
            .auth_service
            .bootstrap_admin(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao criar o administrador inicial: {e}"))?;
    }

    let app = build_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
