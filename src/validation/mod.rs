pub mod requests;
pub mod rules;
