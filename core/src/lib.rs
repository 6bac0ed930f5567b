pub mod collector;
pub mod config;
pub mod counter;
pub mod db;
pub mod detector;
pub mod error;
pub mod executor;
pub mod injector;
pub mod notifier;
pub mod plot;
pub mod recovery;
pub mod sampler;
pub mod scanner;
pub mod series;

pub use error::{MonitorError, Result};
