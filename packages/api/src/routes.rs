use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub mod health;
pub mod ingestion_tokens;
pub mod opamp;
pub mod sources;
pub mod teams;

#[derive(Clone, Deserialize, Serialize, Debug, IntoParams)]
pub struct PaginationParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
