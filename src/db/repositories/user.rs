use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
};
use tracing::info;

use super::super::StoreError;
use crate::entities::{prelude::*, teams, users};

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
        }
    }
}

/// One row of the league standings: per-user totals aggregated over the
/// teams a user owns. "points" is losses x 5 -- the scoring rule the league
/// actually plays by, misleading name and all.
#[derive(Debug, Clone, FromQueryResult)]
pub struct Standing {
    pub username: String,
    pub rank: i64,
    pub losses: i64,
    pub points: i64,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user. Uniqueness of the username is enforced by the
    /// storage constraint, so concurrent registrations cannot both succeed;
    /// the losing insert surfaces as `DuplicateUsername`.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => {
                info!("Registered user: {username}");
                Ok(User::from(model))
            }
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    Err(StoreError::DuplicateUsername(username.to_string()))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Get user by username. Absence is `Ok(None)`; a failing database is an
    /// error, not a not-found.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    /// Get user by username along with the stored password hash, for login
    /// verification.
    pub async fn get_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// League standings: every user with rank/loss totals summed over their
    /// teams (LEFT JOIN, so users without teams show zeros), ordered by the
    /// summed rank ascending.
    pub async fn standings(&self) -> Result<Vec<Standing>, StoreError> {
        let rank_sum: SimpleExpr =
            Func::coalesce([teams::Column::Rank.sum(), Expr::val(0).into()]).into();
        let loss_sum: SimpleExpr =
            Func::coalesce([teams::Column::Losses.sum(), Expr::val(0).into()]).into();

        let rows = Users::find()
            .select_only()
            .column(users::Column::Username)
            .expr_as(rank_sum.clone(), "rank")
            .expr_as(loss_sum.clone(), "losses")
            .expr_as(Expr::expr(loss_sum).mul(5), "points")
            .join(JoinType::LeftJoin, users::Relation::Teams.def())
            .group_by(users::Column::Username)
            .order_by(rank_sum, Order::Asc)
            .into_model::<Standing>()
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
