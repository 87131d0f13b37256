use serde::Serialize;

use crate::db::{Standing, Team, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Session token plus the account it belongs to, returned on registration,
/// login, and the token echo endpoint.
#[derive(Debug, Serialize)]
pub struct AccountToken {
    pub access_token: String,
    pub token_type: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct StandingDto {
    pub username: String,
    pub rank: i64,
    pub losses: i64,
    pub points: i64,
}

impl From<Standing> for StandingDto {
    fn from(s: Standing) -> Self {
        Self {
            username: s.username,
            rank: s.rank,
            losses: s.losses,
            points: s.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamDto {
    pub id: i32,
    pub name: Option<String>,
    pub rank: Option<i32>,
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub web_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl From<Team> for TeamDto {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            rank: team.rank,
            wins: team.wins,
            losses: team.losses,
            web_id: team.web_id,
            user_id: team.user_id,
        }
    }
}
