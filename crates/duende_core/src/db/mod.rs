pub mod migrations;
pub mod models;
pub mod schema;
