//! 业务服务模块

pub mod bootstrap;

pub use bootstrap::{BootstrapReport, Bootstrapper};
