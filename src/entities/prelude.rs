pub use super::teams::Entity as Teams;
pub use super::users::Entity as Users;
