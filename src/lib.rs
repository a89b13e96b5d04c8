// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod game;
pub mod pokeapi;
pub mod ranking;
pub mod session;
pub mod state;
pub mod supabase;
pub mod token;
pub mod types;
pub mod view;
