//! Filesystem primitives shared by the vhost store, the PHP switch engine
//! and credential recovery.

mod atomic;
mod links;

pub use atomic::{write_atomic, write_private};
pub use links::{ensure_symlink, is_symlink, remove_symlink};
