//! Virtual hosts: configuration composition, the vhost store, host-name
//! entries, and certificates.

mod certs;
mod composer;
mod document;
mod hosts;
mod ssl_module;
mod store;

pub use certs::{CertificateOutcome, CertificateStore};
pub use composer::{
    bound_php_version, rebind_handler, CertificatePaths, Composer, VhostSpec, HANDLER_MARKER,
};
pub use document::{Document, Node, Section};
pub use hosts::{entry_line, maps_name, with_entry, without_entry, HostsFileSection};
pub use ssl_module::{SslModule, SslModuleState};
pub use store::{
    CreateOutcome, CreateVhost, DeleteOutcome, ScannedVhost, ToggleOutcome, ToggleStatus,
    VhostDetails, VhostEntry, VhostStore,
};
