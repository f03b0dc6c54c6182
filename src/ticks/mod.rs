pub mod driver;

pub use driver::{TickDrivers, TickSchedule};
