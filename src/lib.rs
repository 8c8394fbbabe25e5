// Library exports for testing
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod service;
pub mod thinking;
pub mod validation;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::handlers::*;
pub use crate::models::*;
pub use crate::service::*;
pub use crate::thinking::*;
pub use crate::validation::*;
