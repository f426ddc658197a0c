//! Certificate and SSL module operations.

mod certificate;
mod module;

pub use certificate::{SslCreateCertCommand, SslTrustCommand, SslUntrustCommand};
pub use module::{SslEnableCommand, SslIsEnabledCommand};
