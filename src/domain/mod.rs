pub mod callback;
pub mod money;
pub mod outcome;
pub mod ports;
pub mod reconciliation;
