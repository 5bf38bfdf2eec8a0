//! Route modules for the Chest Numbers server

pub mod generate;
pub mod health;
pub mod progress;
