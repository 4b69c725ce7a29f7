pub mod attendance;
pub mod backup;
pub mod calendar;
pub mod core;
pub mod holidays;
pub mod roster;
pub mod settings;
