// Library exports for campus-feed
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod model;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod reactions;
pub mod session;
pub mod state;
pub mod store;
pub mod surveys;
pub mod upload;
pub mod view;

#[cfg(test)]
mod testing;
