//! Points engine for match predictions: compares a fan's prediction with the
//! actual outcome, applies focus, timing and streak modifiers, and folds the
//! per-match results into a scoring profile.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
