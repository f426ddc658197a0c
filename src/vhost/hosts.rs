//! Host-name entries for local virtual hosts.
//!
//! Entries the engine adds live in a delimited section of the hosts file.
//! Retraction only ever edits that section, so lines written by the user
//! or other tools are never touched.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StackResult;

const START_MARKER: &str = "# BEGIN stackctl";
const END_MARKER: &str = "# END stackctl";

/// The engine-owned section of a hosts file.
#[derive(Debug, Clone)]
pub struct HostsFileSection {
    path: PathBuf,
}

/// Byte range of the section (markers included) and its entry lines.
struct SectionSpan<'a> {
    start: usize,
    end: usize,
    entries: Vec<&'a str>,
}

fn find_section(content: &str) -> Option<SectionSpan<'_>> {
    let start = content.find(START_MARKER)?;
    let end_rel = content[start..].find(END_MARKER)?;
    let end = start + end_rel + END_MARKER.len();
    let inner = &content[start + START_MARKER.len()..start + end_rel];
    let entries = inner
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    Some(SectionSpan {
        start,
        end,
        entries,
    })
}

/// Host names on a non-comment line (everything after the address).
fn line_names(line: &str) -> impl Iterator<Item = &str> {
    let content = line.split('#').next().unwrap_or("");
    content.split_whitespace().skip(1)
}

/// Whether any line of the file maps `name`.
pub fn maps_name(content: &str, name: &str) -> bool {
    content
        .lines()
        .any(|line| line_names(line).any(|n| n.eq_ignore_ascii_case(name)))
}

/// The line written for a vhost.
pub fn entry_line(name: &str) -> String {
    format!("127.0.0.1 {} www.{}", name, name)
}

fn render_section(entries: &[&str]) -> String {
    let mut section = String::new();
    section.push_str(START_MARKER);
    section.push('\n');
    for entry in entries {
        let _ = writeln!(section, "{}", entry);
    }
    section.push_str(END_MARKER);
    section
}

/// `content` with an entry for `name` in the owned section.
///
/// Unchanged when any line already maps the name.
pub fn with_entry(content: &str, name: &str) -> String {
    if maps_name(content, name) {
        return content.to_string();
    }
    let line = entry_line(name);

    if let Some(span) = find_section(content) {
        let mut entries = span.entries.clone();
        entries.push(line.as_str());
        let mut output = String::from(&content[..span.start]);
        output.push_str(&render_section(&entries));
        output.push_str(&content[span.end..]);
        return output;
    }

    let mut output = String::from(content);
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&render_section(&[line.as_str()]));
    output.push('\n');
    output
}

/// `content` without the owned entry whose first host name is `name`.
///
/// An emptied section is removed along with its markers.
pub fn without_entry(content: &str, name: &str) -> String {
    let Some(span) = find_section(content) else {
        return content.to_string();
    };

    let entries: Vec<&str> = span
        .entries
        .iter()
        .copied()
        .filter(|line| {
            line_names(line)
                .next()
                .map(|first| !first.eq_ignore_ascii_case(name))
                .unwrap_or(true)
        })
        .collect();

    if entries.len() == span.entries.len() {
        return content.to_string();
    }

    let mut output = String::from(&content[..span.start]);
    if entries.is_empty() {
        let rest = &content[span.end..];
        output.push_str(rest.strip_prefix('\n').unwrap_or(rest));
    } else {
        output.push_str(&render_section(&entries));
        output.push_str(&content[span.end..]);
    }
    output
}

impl HostsFileSection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StackResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    // Written in place: /etc/hosts is often a bind mount that cannot be
    // replaced by rename.
    fn write(&self, content: &str) -> StackResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Add `127.0.0.1 name www.name` unless `name` is already mapped.
    /// Returns whether the file changed.
    pub fn add(&self, name: &str) -> StackResult<bool> {
        let current = self.read()?;
        let updated = with_entry(&current, name);
        if updated == current {
            debug!(name, "Host name already mapped");
            return Ok(false);
        }
        self.write(&updated)?;
        info!(name, hosts = %self.path.display(), "Host entry added");
        Ok(true)
    }

    /// Retract the owned entry for `name`. Returns whether the file changed.
    pub fn remove(&self, name: &str) -> StackResult<bool> {
        let current = self.read()?;
        let updated = without_entry(&current, name);
        if updated == current {
            return Ok(false);
        }
        self.write(&updated)?;
        info!(name, hosts = %self.path.display(), "Host entry removed");
        Ok(true)
    }
}
