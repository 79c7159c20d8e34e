use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Id;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Number of days to look back from now
    pub days: i64,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureResponse {
    pub id: Id,
    /// Water temperature in Celsius
    pub temperature: f32,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}
