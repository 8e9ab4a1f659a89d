use chrono::{DateTime, Utc};

/// The stored root document as raw JSON text.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub version: u32,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}
