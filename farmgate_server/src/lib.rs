pub mod auth;
pub mod catalog_routes;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod payment_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod test;
