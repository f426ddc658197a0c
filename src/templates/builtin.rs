//! Templates compiled into the binary.
//!
//! A `templates_dir` in the settings may override any of them by providing a
//! file with the same name.

/// Virtual-host skeleton: one HTTP block, plus one HTTPS block when `ssl`.
pub const VHOST: &str = r#"<VirtualHost *:80>
    ServerName {{ server_name }}
    ServerAlias www.{{ server_name }}
    DocumentRoot {{ document_root }}

    <Directory {{ document_root }}>
        Options Indexes FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>

    ErrorLog {{ log_dir }}/{{ server_name }}-error.log
    CustomLog {{ log_dir }}/{{ server_name }}-access.log combined
</VirtualHost>
{% if ssl %}
<VirtualHost *:443>
    ServerName {{ server_name }}
    ServerAlias www.{{ server_name }}
    DocumentRoot {{ document_root }}

    SSLEngine on
    SSLCertificateFile {{ certificate }}
    SSLCertificateKeyFile {{ certificate_key }}

    <Directory {{ document_root }}>
        Options Indexes FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>

    ErrorLog {{ log_dir }}/{{ server_name }}-ssl-error.log
    CustomLog {{ log_dir }}/{{ server_name }}-ssl-access.log combined
</VirtualHost>
{% endif %}"#;

/// Placeholder page written into an empty document root.
pub const PLACEHOLDER_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ server_name }}</title>
</head>
<body>
    <h1>{{ server_name }}</h1>
    <p>This virtual host is served from <code>{{ document_root }}</code>.</p>
</body>
</html>
"#;

/// Name/body pairs registered with the engine.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("apache/vhost.conf.tera", VHOST),
    ("apache/index.html.tera", PLACEHOLDER_INDEX),
];
