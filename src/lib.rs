pub mod config;
pub mod db;
pub mod interval;
pub mod pipeline;
pub mod utils;
pub mod validation;
