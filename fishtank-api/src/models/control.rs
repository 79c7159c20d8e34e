use serde::{Deserialize, Serialize};

/// Result code reported by actuator endpoints when the device acknowledged the command
pub const RESULT_SUCCESS: i32 = 0;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableRequest {
    /// Engage (`true`) or release (`false`) the actuator
    pub enable: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentageRequest {
    /// Fraction in `0.0..=1.0`
    pub percentage: f32,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub result: i32,
}

impl ControlResponse {
    pub fn success() -> Self {
        Self {
            result: RESULT_SUCCESS,
        }
    }
}
