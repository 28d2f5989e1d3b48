pub mod config;
pub mod db;
pub mod email;
pub mod logging;
pub mod repositories;
