mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::DocumentRow;

pub const DATABASE_FILE_NAME: &str = "aspire.sqlite3";
