//! Generates virtual-host configuration and rebinds its PHP-FPM handler.

use std::path::{Path, PathBuf};

use serde_json::json;

use super::document::{Document, Node, Section};
use crate::error::{StackError, StackResult};
use crate::platform::PlatformProfile;
use crate::templates::TemplateEngine;

/// Comment line that opens every handler fragment the engine writes.
pub const HANDLER_MARKER: &str = "# PHP-FPM handler (managed by stackctl)";

/// Template rendering the block skeletons.
const VHOST_TEMPLATE: &str = "apache/vhost.conf.tera";

/// Certificate pair referenced by an HTTPS block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    pub certificate: PathBuf,
    pub key: PathBuf,
}

/// Everything needed to generate one vhost file.
#[derive(Debug, Clone)]
pub struct VhostSpec<'a> {
    pub server_name: &'a str,
    pub document_root: &'a Path,
    pub ssl: Option<&'a CertificatePaths>,
    pub php_version: Option<&'a str>,
}

/// Builds and mutates vhost configuration text.
pub struct Composer<'a> {
    profile: &'a PlatformProfile,
    templates: &'a TemplateEngine,
}

impl<'a> Composer<'a> {
    pub fn new(profile: &'a PlatformProfile, templates: &'a TemplateEngine) -> Self {
        Self { profile, templates }
    }

    /// One HTTP block, one HTTPS block when `ssl`, and a handler fragment in
    /// each when a PHP version is given.
    pub fn compose(&self, spec: &VhostSpec<'_>) -> StackResult<String> {
        let context = json!({
            "server_name": spec.server_name,
            "document_root": spec.document_root.display().to_string(),
            "log_dir": self.profile.log_dir.display().to_string(),
            "ssl": spec.ssl.is_some(),
            "certificate": spec.ssl.map(|c| c.certificate.display().to_string()),
            "certificate_key": spec.ssl.map(|c| c.key.display().to_string()),
        });
        let skeleton = self.templates.render(VHOST_TEMPLATE, &context)?;
        self.rebind_php(&skeleton, spec.php_version)
    }

    /// Remove the PHP handler fragments of each VirtualHost, then add one
    /// when `version` is given. Applying it twice gives the same text.
    pub fn rebind_php(&self, existing: &str, version: Option<&str>) -> StackResult<String> {
        let socket = version.map(|v| self.profile.fpm_socket(v));
        rebind_handler(existing, socket.as_deref())
    }
}

/// Socket-level rebind, independent of the platform.
pub fn rebind_handler(existing: &str, socket: Option<&str>) -> StackResult<String> {
    let mut doc = Document::parse(existing)?;
    let visited = doc.for_each_virtual_host_mut(|vhost| {
        strip_handlers(&mut vhost.children);
        if let Some(socket) = socket {
            let indent = vhost.child_indent();
            vhost.children.extend(handler_fragment(&indent, socket));
        }
    });

    if visited == 0 {
        return Err(StackError::MalformedConfig {
            message: "no <VirtualHost> block found".to_string(),
        });
    }

    Ok(doc.render())
}

fn handler_fragment(indent: &str, socket: &str) -> Vec<Node> {
    let inner = format!("{}    ", indent);
    let set_handler = format!("SetHandler \"proxy:unix:{}|fcgi://localhost\"", socket);
    vec![
        Node::Comment(format!("{}{}", indent, HANDLER_MARKER)),
        Node::Section(Section {
            open: format!("{}<FilesMatch \\.php$>", indent),
            name: "FilesMatch".to_string(),
            args: "\\.php$".to_string(),
            children: vec![Node::Directive {
                raw: format!("{}{}", inner, set_handler),
                name: "SetHandler".to_string(),
                args: set_handler["SetHandler ".len()..].to_string(),
            }],
            close: format!("{}</FilesMatch>", indent),
        }),
    ]
}

/// Socket path of a `SetHandler "proxy:unix:<socket>|fcgi://..."` argument.
fn unix_socket(args: &str) -> Option<&str> {
    let rest = args.trim_matches('"').strip_prefix("proxy:unix:")?;
    Some(rest.split('|').next().unwrap_or(rest))
}

fn is_fpm_socket(socket: &str) -> bool {
    let lower = socket.to_ascii_lowercase();
    lower.contains("php") && lower.contains("fpm")
}

/// `<FilesMatch>` whose pattern targets `.php` files.
fn targets_php(section: &Section) -> bool {
    section.is("FilesMatch") && section.args.to_ascii_lowercase().contains("\\.php")
}

/// Sockets of the `SetHandler` directives in a handler fragment body, or
/// `None` when the body holds anything other than FPM socket handlers.
fn fragment_sockets(section: &Section) -> Option<Vec<&str>> {
    let mut sockets = Vec::new();
    for child in &section.children {
        match child {
            Node::Blank(_) | Node::Comment(_) => {}
            Node::Directive { name, args, .. } if name.eq_ignore_ascii_case("SetHandler") => {
                let socket = unix_socket(args).filter(|s| is_fpm_socket(s))?;
                sockets.push(socket);
            }
            _ => return None,
        }
    }
    (!sockets.is_empty()).then_some(sockets)
}

/// A handler fragment written before the marker existed: a `.php`
/// FilesMatch holding only PHP-FPM socket handlers.
fn is_legacy_fragment(node: &Node) -> bool {
    match node {
        Node::Section(s) => targets_php(s) && fragment_sockets(s).is_some(),
        _ => false,
    }
}

fn is_marker(node: &Node) -> bool {
    node.comment_text()
        .map(|t| t == HANDLER_MARKER.trim_start_matches('#').trim())
        .unwrap_or(false)
}

/// Heading older tools wrote directly above their fragment.
fn is_legacy_heading(node: &Node) -> bool {
    node.comment_text()
        .map(|t| t.to_ascii_lowercase().starts_with("php-fpm"))
        .unwrap_or(false)
}

/// Drop handler fragments among the direct children of one VirtualHost.
/// Nested sections (`<Location>`, `<Directory>`, ...) are never entered.
fn strip_handlers(children: &mut Vec<Node>) {
    let mut kept: Vec<Node> = Vec::with_capacity(children.len());
    let mut nodes = children.drain(..).peekable();
    while let Some(node) = nodes.next() {
        if is_marker(&node) {
            let owned = matches!(nodes.peek(), Some(Node::Section(s)) if targets_php(s));
            if owned {
                nodes.next();
            }
            continue;
        }
        if is_legacy_fragment(&node) {
            if kept.last().map(is_legacy_heading).unwrap_or(false) {
                kept.pop();
            }
            continue;
        }
        kept.push(node);
    }
    drop(nodes);
    *children = kept;
}

/// PHP version bound in configuration text, read from the socket of its
/// first handler fragment.
pub fn bound_php_version(text: &str) -> Option<String> {
    let doc = Document::parse(text).ok()?;
    doc.virtual_hosts()
        .into_iter()
        .flat_map(|vhost| vhost.children.iter())
        .filter_map(|node| match node {
            Node::Section(s) if targets_php(s) => fragment_sockets(s),
            _ => None,
        })
        .flatten()
        .find_map(crate::platform::version_from_path)
}
