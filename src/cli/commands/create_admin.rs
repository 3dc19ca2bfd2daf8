use tracing::info;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::AuthService;
use crate::state::AppState;

pub async fn handle(config: AppConfig, username: &str, password: &str) -> anyhow::Result<()> {
    let store = DatabaseManager::connect(&config.database).await?;
    let state = AppState::new(config, store.clone())?;

    let result = AuthService::new(&state).create_admin(username, password).await;
    store.close().await;

    let user = result?;
    info!("Created admin {} ({})", user.username, user.id);
    println!("Admin account '{}' created with id {}", user.username, user.id);
    Ok(())
}
