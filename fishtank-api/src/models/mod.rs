mod control;
mod task;
mod temperature;

pub use control::*;
pub use task::*;
pub use temperature::*;

pub type Id = i32;
