//! App - アプリケーション層
//!
//! - **config**: ServiceConfig（TOML）
//! - **service**: DependencyService とその builder

pub mod config;
pub mod service;

pub use self::config::{ConfigError, ServiceConfig};
pub use self::service::{DependencyService, DependencyServiceBuilder};
