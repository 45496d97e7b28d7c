pub mod attendance;
pub mod budgets;
pub mod errors;
pub mod fuel;
pub mod reference;
pub mod standby;
pub mod submission;
pub mod trips;
pub mod vehicles;
