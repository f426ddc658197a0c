//! Lookup of the managed services by their CLI name.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::apache::ApacheService;
use super::mysql::MysqlService;
use super::php_fpm::PhpFpmService;
use super::traits::ServiceDefinition;
use crate::error::{StackError, ValidationErrorKind};

pub struct ServiceRegistry {
    by_name: BTreeMap<&'static str, Arc<dyn ServiceDefinition>>,
}

impl ServiceRegistry {
    /// Apache, MySQL/MariaDB and PHP-FPM; nothing else is managed.
    pub fn new() -> Self {
        let known: [Arc<dyn ServiceDefinition>; 3] = [
            Arc::new(ApacheService),
            Arc::new(MysqlService),
            Arc::new(PhpFpmService),
        ];
        Self {
            by_name: known.into_iter().map(|s| (s.name(), s)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceDefinition>> {
        self.by_name.get(name).map(Arc::clone)
    }

    /// Fails with `UnknownService` (exit 2) for unmanaged names.
    pub fn require(&self, name: &str) -> Result<Arc<dyn ServiceDefinition>, StackError> {
        self.get(name).ok_or_else(|| StackError::InvalidParameters {
            kind: ValidationErrorKind::UnknownService {
                service: name.to_owned(),
            },
        })
    }

    /// Names in sorted order.
    pub fn list(&self) -> Vec<&'static str> {
        self.by_name.keys().copied().collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
