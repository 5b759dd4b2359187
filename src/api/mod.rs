mod account;
mod ai;
mod billing;
mod body;
mod server;
mod types;

pub use server::run_http_server;
