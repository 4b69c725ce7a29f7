//! Attendance consistency and temporal eligibility engine.
//!
//! Everything here is synchronous and single-threaded; the only I/O goes
//! through [`PersistenceGateway`].

pub mod calendar;
pub mod cleanup;
pub mod dates;
pub mod eligibility;
pub mod error;
pub mod gateway;
pub mod holidays;
pub mod model;
pub mod roster;
pub mod saved_index;
pub mod session;
pub mod sticky;
pub mod store;
pub mod validate;

pub use dates::Clock;
pub use error::AttendanceError;
pub use gateway::PersistenceGateway;
pub use model::{AttendanceRecord, DayRecords, Holiday, Mark, Snapshot, Student, StudentStatus};
pub use session::AttendanceSession;
