pub mod admin;
pub mod codes;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod state;
