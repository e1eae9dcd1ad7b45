pub mod config;
pub mod confirm;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod rpc;
