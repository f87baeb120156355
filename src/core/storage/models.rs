use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParameterRecord {
    pub name: String,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
}
