mod actuator_service;
mod device_link;
pub mod serial;
mod task_service;
mod temperature_service;
mod token_service;

pub use actuator_service::*;
pub use device_link::*;
pub use task_service::*;
pub use temperature_service::*;
pub use token_service::*;

use time::{Duration, OffsetDateTime, UtcOffset};

/// Normalizes a timestamp to UTC without sub-second precision, the form every
/// stored timestamp takes.
pub fn truncate_to_second(time: OffsetDateTime) -> OffsetDateTime {
    let time = time.to_offset(UtcOffset::UTC);
    time - Duration::nanoseconds(time.nanosecond() as i64)
}
