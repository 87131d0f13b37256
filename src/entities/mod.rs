pub mod prelude;

pub mod teams;
pub mod users;
