// src/lib.rs
// proposal-police: GitHub App that checks issue comments against the proposal template

pub mod api;
pub mod assistant;
pub mod classify;
pub mod config;
pub mod error;
pub mod github;
pub mod handlers;
pub mod http;
pub mod state;
pub mod tasks;
pub mod webhook;

pub use config::PoliceConfig;
pub use error::{PoliceError, Result};
