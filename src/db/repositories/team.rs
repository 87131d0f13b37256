use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::info;

use super::super::StoreError;
use crate::entities::{prelude::*, teams};

/// Repository for team operations
pub struct TeamRepository {
    conn: DatabaseConnection,
}

impl TeamRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_team_model(t: teams::Model) -> Team {
        Team {
            id: t.id,
            name: t.name,
            rank: t.rank,
            wins: t.wins,
            losses: t.losses,
            web_id: t.web_id,
            user_id: t.user_id,
        }
    }

    pub async fn create(&self, input: &TeamInput) -> Result<Team, StoreError> {
        let active = teams::ActiveModel {
            name: Set(input.name.clone()),
            rank: Set(input.rank),
            wins: Set(input.wins),
            losses: Set(input.losses),
            web_id: Set(input.web_id),
            user_id: Set(input.user_id),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        info!("Created team {} ({:?})", model.id, model.name);
        Ok(Self::map_team_model(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Team>, StoreError> {
        let team = Teams::find_by_id(id).one(&self.conn).await?;
        Ok(team.map(Self::map_team_model))
    }

    /// All teams, best rank first.
    pub async fn list(&self) -> Result<Vec<Team>, StoreError> {
        let rows = Teams::find()
            .order_by_desc(teams::Column::Rank)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_team_model).collect())
    }

    /// Reassign a team's owner. Only the owning-user column is written;
    /// whatever else the caller submitted for the team is discarded
    /// (longstanding observed behavior, covered by a regression test).
    pub async fn assign_owner(
        &self,
        id: i32,
        user_id: Option<i32>,
    ) -> Result<Option<Team>, StoreError> {
        let Some(team) = Teams::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: teams::ActiveModel = team.into();
        active.user_id = Set(user_id);
        let updated = active.update(&self.conn).await?;

        Ok(Some(Self::map_team_model(updated)))
    }
}

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct Team {
    pub id: i32,
    pub name: Option<String>,
    pub rank: Option<i32>,
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub web_id: Option<i32>,
    pub user_id: Option<i32>,
}

/// Fields a client may submit for a team. Everything is optional; the form
/// allows partial entries.
#[derive(Debug, Clone, Default)]
pub struct TeamInput {
    pub name: Option<String>,
    pub rank: Option<i32>,
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub web_id: Option<i32>,
    pub user_id: Option<i32>,
}
