//! Records read back from the local store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::GeneratedArticle;

/// The persisted article plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    pub run_id: Uuid,
    pub source_url: Option<String>,
    pub article: GeneratedArticle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
