//! Usage window counters.
//!
//! Two notions of "how much has been used lately" coexist:
//!
//! - **RollingWindowCounter**: a look-back duration measured continuously
//!   backward from now; its horizon slides with every call.
//! - **CalendarWindowCounter**: a period anchored to a fixed weekday and
//!   time-of-day; it resets at wall-clock instants, independent of when
//!   usage occurred.

pub mod calendar;
pub mod rolling;

pub use calendar::CalendarWindowCounter;
pub use rolling::RollingWindowCounter;
