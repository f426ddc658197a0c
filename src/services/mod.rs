//! The three systemd services a local stack runs, and [`ServiceManager`]
//! for driving them through systemctl.

mod apache;
mod manager;
mod mysql;
mod php_fpm;
mod registry;
mod traits;

pub use apache::ApacheService;
pub use manager::{ServiceAction, ServiceManager};
pub use mysql::MysqlService;
pub use php_fpm::PhpFpmService;
pub use registry::ServiceRegistry;
pub use traits::ServiceDefinition;
