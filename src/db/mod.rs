use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::team::{Team, TeamInput};
pub use repositories::user::{Standing, User};

/// Query-layer failure. Absence is never an error (repositories return
/// `Ok(None)` for that); this type distinguishes domain conflicts from
/// infrastructure failures so callers can map them to different responses.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Owns the database connection pool. Constructed once at startup and handed
/// to the app state; each query borrows a pooled connection for its duration.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn team_repo(&self) -> repositories::team::TeamRepository {
        repositories::team::TeamRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        self.user_repo().create(username, password_hash).await
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        self.user_repo().get_with_password(username).await
    }

    pub async fn standings(&self) -> Result<Vec<Standing>, StoreError> {
        self.user_repo().standings().await
    }

    // ========================================================================
    // Teams
    // ========================================================================

    pub async fn create_team(&self, input: &TeamInput) -> Result<Team, StoreError> {
        self.team_repo().create(input).await
    }

    pub async fn get_team(&self, id: i32) -> Result<Option<Team>, StoreError> {
        self.team_repo().get(id).await
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        self.team_repo().list().await
    }

    pub async fn assign_team_owner(
        &self,
        id: i32,
        user_id: Option<i32>,
    ) -> Result<Option<Team>, StoreError> {
        self.team_repo().assign_owner(id, user_id).await
    }
}
