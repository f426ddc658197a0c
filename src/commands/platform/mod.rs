//! Platform introspection.

mod info;

pub use info::PlatformInfoCommand;
