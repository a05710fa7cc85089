pub mod broadcast;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod lookup;
pub mod messages;
pub mod model;
pub mod poller;
pub mod ratelimit;
pub mod state;
pub mod transport;
