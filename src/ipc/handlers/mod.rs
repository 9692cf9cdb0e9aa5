pub mod activities;
pub mod assignments;
pub mod core;
pub mod drivers;
pub mod kids;
pub mod occurrences;
