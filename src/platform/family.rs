//! Distribution families and the per-family strategy table.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Supported Linux distribution families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Rpm,
    Debian,
    Arch,
}

/// Package managers the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Dnf,
    Yum,
    Apt,
    Pacman,
}

/// How the web server enables a PHP module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum ModuleLayout {
    /// `<available>/php<v>.load` symlinked into `<enabled>`.
    Symlinked {
        available: PathBuf,
        enabled: PathBuf,
    },
    /// `<dir>/15-php<v>.conf`, renamed to `.conf.disabled` when off.
    Renamed { dir: PathBuf },
}

/// Which PHP binding a package set or variant refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    /// The web server's PHP module.
    Apache,
    /// A standalone PHP-FPM runtime.
    Fpm,
}

impl Binding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "apache" | "mod_php" | "module" => Some(Binding::Apache),
            "fpm" | "php-fpm" => Some(Binding::Fpm),
            _ => None,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Apache => write!(f, "apache"),
            Binding::Fpm => write!(f, "fpm"),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Rpm => write!(f, "rpm"),
            OsFamily::Debian => write!(f, "debian"),
            OsFamily::Arch => write!(f, "arch"),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt-get",
            PackageManager::Pacman => "pacman",
        }
    }

    /// Arguments that install the given packages non-interactively.
    pub fn install_args(&self, packages: &[String]) -> Vec<String> {
        let mut args: Vec<String> = match self {
            PackageManager::Dnf | PackageManager::Yum => vec!["install".into(), "-y".into()],
            PackageManager::Apt => vec!["install".into(), "-y".into()],
            PackageManager::Pacman => vec!["-S".into(), "--noconfirm".into(), "--needed".into()],
        };
        args.extend(packages.iter().cloned());
        args
    }

    /// Arguments that remove the given packages non-interactively.
    pub fn remove_args(&self, packages: &[String]) -> Vec<String> {
        let mut args: Vec<String> = match self {
            PackageManager::Dnf | PackageManager::Yum => vec!["remove".into(), "-y".into()],
            PackageManager::Apt => vec!["remove".into(), "-y".into()],
            PackageManager::Pacman => vec!["-R".into(), "--noconfirm".into()],
        };
        args.extend(packages.iter().cloned());
        args
    }
}

/// Static per-family facts. Paths are absolute, relative to `/`.
#[derive(Debug, Clone, Copy)]
pub struct FamilyTable {
    pub package_manager: PackageManager,
    pub service_unit: &'static str,
    pub config_dir: &'static str,
    pub main_config: &'static str,
    pub vhost_dir: &'static str,
    pub enabled_vhost_dir: Option<&'static str>,
    pub log_dir: &'static str,
    pub control_program: &'static str,
    pub socket_path: &'static str,
    pub database_unit: &'static str,
    pub maintenance_credentials: Option<&'static str>,
    pub cert_dir: &'static str,
    pub key_dir: &'static str,
    pub trust_anchor_dir: &'static str,
    pub trust_refresh: &'static [&'static str],
    pub module_available_dir: &'static str,
    pub module_enabled_dir: Option<&'static str>,
    pub ssl_module_marker: &'static str,
    pub web_user: &'static str,
    pub database_user: &'static str,
}

const RPM: FamilyTable = FamilyTable {
    package_manager: PackageManager::Dnf,
    service_unit: "httpd",
    config_dir: "/etc/httpd",
    main_config: "/etc/httpd/conf/httpd.conf",
    vhost_dir: "/etc/httpd/conf.d",
    enabled_vhost_dir: None,
    log_dir: "/var/log/httpd",
    control_program: "apachectl",
    socket_path: "/var/lib/mysql/mysql.sock",
    database_unit: "mysqld",
    maintenance_credentials: None,
    cert_dir: "/etc/pki/tls/certs",
    key_dir: "/etc/pki/tls/private",
    trust_anchor_dir: "/etc/pki/ca-trust/source/anchors",
    trust_refresh: &["update-ca-trust", "extract"],
    module_available_dir: "/etc/httpd/conf.modules.d",
    module_enabled_dir: None,
    ssl_module_marker: "/etc/httpd/conf.modules.d/00-ssl.conf",
    web_user: "apache",
    database_user: "mysql",
};

const DEBIAN: FamilyTable = FamilyTable {
    package_manager: PackageManager::Apt,
    service_unit: "apache2",
    config_dir: "/etc/apache2",
    main_config: "/etc/apache2/apache2.conf",
    vhost_dir: "/etc/apache2/sites-available",
    enabled_vhost_dir: Some("/etc/apache2/sites-enabled"),
    log_dir: "/var/log/apache2",
    control_program: "apache2ctl",
    socket_path: "/var/run/mysqld/mysqld.sock",
    database_unit: "mysql",
    maintenance_credentials: Some("/etc/mysql/debian.cnf"),
    cert_dir: "/etc/ssl/certs",
    key_dir: "/etc/ssl/private",
    trust_anchor_dir: "/usr/local/share/ca-certificates",
    trust_refresh: &["update-ca-certificates"],
    module_available_dir: "/etc/apache2/mods-available",
    module_enabled_dir: Some("/etc/apache2/mods-enabled"),
    ssl_module_marker: "/etc/apache2/mods-enabled/ssl.load",
    web_user: "www-data",
    database_user: "mysql",
};

const ARCH: FamilyTable = FamilyTable {
    package_manager: PackageManager::Pacman,
    service_unit: "httpd",
    config_dir: "/etc/httpd",
    main_config: "/etc/httpd/conf/httpd.conf",
    vhost_dir: "/etc/httpd/conf/vhosts",
    enabled_vhost_dir: None,
    log_dir: "/var/log/httpd",
    control_program: "apachectl",
    socket_path: "/run/mysqld/mysqld.sock",
    database_unit: "mysqld",
    maintenance_credentials: None,
    cert_dir: "/etc/ssl/certs",
    key_dir: "/etc/ssl/private",
    trust_anchor_dir: "/etc/ca-certificates/trust-source/anchors",
    trust_refresh: &["trust", "extract-compat"],
    module_available_dir: "/etc/httpd/conf/modules.d",
    module_enabled_dir: None,
    ssl_module_marker: "/etc/httpd/conf/extra/httpd-ssl.conf",
    web_user: "http",
    database_user: "mysql",
};

impl OsFamily {
    /// The strategy table for this family.
    pub fn table(&self) -> &'static FamilyTable {
        match self {
            OsFamily::Rpm => &RPM,
            OsFamily::Debian => &DEBIAN,
            OsFamily::Arch => &ARCH,
        }
    }

    /// Map an os-release `ID` / `ID_LIKE` token to a family.
    pub fn from_os_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "ol" => Some(OsFamily::Rpm),
            "debian" | "ubuntu" | "linuxmint" | "pop" | "elementary" | "raspbian" => {
                Some(OsFamily::Debian)
            }
            "arch" | "manjaro" | "endeavouros" | "garuda" => Some(OsFamily::Arch),
            _ => None,
        }
    }

    /// Runtime socket the PHP-FPM pool of `version` listens on.
    pub fn fpm_socket(&self, version: &str) -> String {
        let compact = compact_version(version);
        match self {
            OsFamily::Debian => format!("/run/php/php{}-fpm.sock", version),
            OsFamily::Rpm => format!("/var/opt/remi/php{}/run/php-fpm/www.sock", compact),
            OsFamily::Arch => format!("/run/php{}-fpm/php-fpm.sock", compact),
        }
    }

    /// systemd unit of the PHP-FPM runtime for `version`.
    pub fn fpm_unit(&self, version: &str) -> String {
        let compact = compact_version(version);
        match self {
            OsFamily::Debian => format!("php{}-fpm", version),
            OsFamily::Rpm => format!("php{}-php-fpm", compact),
            OsFamily::Arch => format!("php{}-fpm", compact),
        }
    }

    /// Absolute path of the FPM binary; its presence means "installed".
    pub fn fpm_binary(&self, version: &str) -> String {
        let compact = compact_version(version);
        match self {
            OsFamily::Debian => format!("/usr/sbin/php-fpm{}", version),
            OsFamily::Rpm => format!("/opt/remi/php{}/root/usr/sbin/php-fpm", compact),
            OsFamily::Arch => format!("/usr/bin/php-fpm{}", compact),
        }
    }

    /// Command-line interpreter for `version`.
    pub fn php_cli_binary(&self, version: &str) -> String {
        let compact = compact_version(version);
        match self {
            OsFamily::Debian => format!("/usr/bin/php{}", version),
            OsFamily::Rpm => format!("/opt/remi/php{}/root/usr/bin/php", compact),
            OsFamily::Arch => format!("/usr/bin/php{}", compact),
        }
    }

    /// Package providing extension `ext` for PHP `version`.
    pub fn php_extension_package(&self, version: &str, ext: &str) -> String {
        let compact = compact_version(version);
        match self {
            OsFamily::Debian => format!("php{}-{}", version, ext),
            OsFamily::Rpm => format!("php{}-php-{}", compact, ext),
            OsFamily::Arch => format!("php{}-{}", compact, ext),
        }
    }

    /// Basename of the web-server PHP module for `version`.
    pub fn apache_module_name(&self, version: &str) -> String {
        match self {
            OsFamily::Debian => format!("php{}", version),
            OsFamily::Rpm | OsFamily::Arch => format!("15-php{}", version),
        }
    }

    /// Packages providing PHP `version` for the given binding.
    pub fn php_packages(&self, version: &str, binding: Binding) -> Vec<String> {
        let compact = compact_version(version);
        match (self, binding) {
            (OsFamily::Debian, Binding::Apache) => vec![
                format!("php{}", version),
                format!("php{}-cli", version),
                format!("libapache2-mod-php{}", version),
            ],
            (OsFamily::Debian, Binding::Fpm) => {
                vec![format!("php{}-cli", version), format!("php{}-fpm", version)]
            }
            (OsFamily::Rpm, Binding::Apache) => {
                vec![format!("php{}-php", compact), format!("php{}-php-cli", compact)]
            }
            (OsFamily::Rpm, Binding::Fpm) => vec![
                format!("php{}-php-cli", compact),
                format!("php{}-php-fpm", compact),
            ],
            (OsFamily::Arch, Binding::Apache) => {
                vec![format!("php{}", compact), format!("php{}-apache", compact)]
            }
            (OsFamily::Arch, Binding::Fpm) => {
                vec![format!("php{}", compact), format!("php{}-fpm", compact)]
            }
        }
    }
}

/// "8.2" -> "82".
pub fn compact_version(version: &str) -> String {
    version.chars().filter(|c| *c != '.').collect()
}

/// Recover a dotted PHP version from a socket path or unit name.
///
/// Understands both `php8.2` and the compact `php82` spelling.
pub fn version_from_path(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let mut search = lower.as_str();
    while let Some(pos) = search.find("php") {
        let rest = &search[pos + 3..];
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let digits = digits.trim_end_matches('.');
        if digits.contains('.') {
            let mut parts = digits.split('.');
            if let (Some(major), Some(minor)) = (parts.next(), parts.next()) {
                if !major.is_empty() && !minor.is_empty() {
                    return Some(format!("{}.{}", major, minor));
                }
            }
        } else if digits.len() >= 2 {
            let (major, minor) = digits.split_at(1);
            return Some(format!("{}.{}", major, minor));
        }
        search = rest;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_id() {
        assert_eq!(OsFamily::from_os_id("fedora"), Some(OsFamily::Rpm));
        assert_eq!(OsFamily::from_os_id("Ubuntu"), Some(OsFamily::Debian));
        assert_eq!(OsFamily::from_os_id("manjaro"), Some(OsFamily::Arch));
        assert_eq!(OsFamily::from_os_id("gentoo"), None);
    }

    #[test]
    fn test_fpm_naming_per_family() {
        assert_eq!(OsFamily::Debian.fpm_socket("8.2"), "/run/php/php8.2-fpm.sock");
        assert_eq!(OsFamily::Debian.fpm_unit("8.2"), "php8.2-fpm");
        assert_eq!(OsFamily::Rpm.fpm_unit("8.2"), "php82-php-fpm");
        assert_eq!(
            OsFamily::Rpm.fpm_socket("7.4"),
            "/var/opt/remi/php74/run/php-fpm/www.sock"
        );
        assert_eq!(OsFamily::Arch.fpm_binary("8.1"), "/usr/bin/php-fpm81");
    }

    #[test]
    fn test_php_cli_and_extension_naming() {
        assert_eq!(OsFamily::Debian.php_cli_binary("8.2"), "/usr/bin/php8.2");
        assert_eq!(OsFamily::Rpm.php_cli_binary("8.2"), "/opt/remi/php82/root/usr/bin/php");
        assert_eq!(OsFamily::Debian.php_extension_package("8.2", "mbstring"), "php8.2-mbstring");
        assert_eq!(OsFamily::Rpm.php_extension_package("8.1", "gd"), "php81-php-gd");
        assert_eq!(OsFamily::Arch.php_extension_package("8.3", "redis"), "php83-redis");
    }

    #[test]
    fn test_version_from_path() {
        assert_eq!(
            version_from_path("proxy:unix:/run/php/php8.2-fpm.sock|fcgi://localhost"),
            Some("8.2".to_string())
        );
        assert_eq!(
            version_from_path("/var/opt/remi/php74/run/php-fpm/www.sock"),
            Some("7.4".to_string())
        );
        assert_eq!(version_from_path("/run/php-fpm/www.sock"), None);
    }

    #[test]
    fn test_package_manager_args() {
        let packages = vec!["php8.3-fpm".to_string()];
        assert_eq!(
            PackageManager::Apt.install_args(&packages),
            vec!["install", "-y", "php8.3-fpm"]
        );
        assert_eq!(
            PackageManager::Pacman.remove_args(&packages),
            vec!["-R", "--noconfirm", "php8.3-fpm"]
        );
    }

    #[test]
    fn test_binding_parse() {
        assert_eq!(Binding::parse("FPM"), Some(Binding::Fpm));
        assert_eq!(Binding::parse("apache"), Some(Binding::Apache));
        assert_eq!(Binding::parse("nginx"), None);
    }
}
