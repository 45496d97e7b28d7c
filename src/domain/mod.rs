pub mod carry;
pub mod costing;
pub mod draft;
pub mod models;
