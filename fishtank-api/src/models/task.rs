use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, Time};

use super::Id;

/// `data` value that opens a valve or switches an actuator on
pub const DATA_OPEN: i32 = 1;
/// `data` value that closes a valve or switches an actuator off
pub const DATA_CLOSE: i32 = 0;

const TIME_OF_DAY: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Audit marker of a water replacement, no device action
    ReplaceWater,
    ValveInWater,
    ValveOutWater,
    Light,
    Purifier,
    Heater,
    Pump,
    /// `data` carries the brightness percent (0-100)
    Brightness,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ReplaceWater => "replace_water",
            TaskType::ValveInWater => "valve_in_water",
            TaskType::ValveOutWater => "valve_out_water",
            TaskType::Light => "light",
            TaskType::Purifier => "purifier",
            TaskType::Heater => "heater",
            TaskType::Pump => "pump",
            TaskType::Brightness => "brightness",
        }
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for TaskType {
    type Err = UnknownVariant;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "replace_water" => Ok(TaskType::ReplaceWater),
            "valve_in_water" => Ok(TaskType::ValveInWater),
            "valve_out_water" => Ok(TaskType::ValveOutWater),
            "light" => Ok(TaskType::Light),
            "purifier" => Ok(TaskType::Purifier),
            "heater" => Ok(TaskType::Heater),
            "pump" => Ok(TaskType::Pump),
            "brightness" => Ok(TaskType::Brightness),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Standby,
    Finished,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Standby => "standby",
            TaskState::Finished => "finished",
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = UnknownVariant;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "standby" => Ok(TaskState::Standby),
            "finished" => Ok(TaskState::Finished),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Parses a wall-clock `HH:MM:SS` string.
pub fn parse_time_of_day(input: &str) -> Result<Time, time::error::Parse> {
    Time::parse(input, TIME_OF_DAY)
}

pub fn format_time_of_day(time: Time) -> String {
    format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Id,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub data: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub execute_time: OffsetDateTime,
    pub state: TaskState,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceWaterRequest {
    /// Fraction of the tank volume to replace, `0 < percentage <= 0.5`
    pub percentage: f32,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePeriodicTaskRequest {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub data: i32,
    /// Wall-clock time of day, `HH:MM:SS`
    pub time: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePeriodicTaskRequest {
    #[serde(rename = "periodicTask")]
    pub id: Id,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicTaskResponse {
    pub id: Id,
    pub user_id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub data: i32,
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_string_roundtrip() {
        for task_type in [
            TaskType::ReplaceWater,
            TaskType::ValveInWater,
            TaskType::ValveOutWater,
            TaskType::Light,
            TaskType::Purifier,
            TaskType::Heater,
            TaskType::Pump,
            TaskType::Brightness,
        ] {
            assert_eq!(task_type.to_string().parse::<TaskType>().unwrap(), task_type);
        }

        assert!("aquarium".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&TaskType::ValveOutWater).unwrap();
        assert_eq!(json, "\"valve_out_water\"");

        let state: TaskState = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(state, TaskState::Finished);
    }

    #[test]
    fn test_time_of_day() {
        let time = parse_time_of_day("07:30:05").unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (7, 30, 5));
        assert_eq!(format_time_of_day(time), "07:30:05");

        assert!(parse_time_of_day("25:00:00").is_err());
        assert!(parse_time_of_day("7:30").is_err());
    }
}
