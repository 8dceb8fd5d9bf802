// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod cue;
pub mod llm;
pub mod policy;
pub mod protocol;
pub mod puzzle;
pub mod reveal;
pub mod services;
pub mod session;
pub mod settings;
pub mod state;
pub mod types;
pub mod wheel;
pub mod ws;
