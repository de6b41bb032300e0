pub mod attendance;
pub mod schema;
