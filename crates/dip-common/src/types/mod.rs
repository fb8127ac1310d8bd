//! Core data types

pub mod bounds;
pub mod history;
pub mod state;
pub mod trajectory;
