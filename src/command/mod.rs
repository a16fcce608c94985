pub mod authenticate;
pub mod check_config;
mod error;

pub use error::Error;
