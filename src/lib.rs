pub mod arguments;
pub mod config;
pub mod detector;
pub mod filtering;
pub mod logger;
pub mod positions;
pub mod pricing;
pub mod rpc;
pub mod sniper;
pub mod swaps;
pub mod utils;
pub mod wallet;
