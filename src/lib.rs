pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
