//! Line-preserving directive tree for Apache configuration text.
//!
//! Every node keeps the exact line it was parsed from, so an unmodified
//! tree renders back byte-for-byte. Only nodes created by the engine carry
//! generated text.

use crate::error::StackError;

/// One node of the directive tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Blank(String),
    Comment(String),
    Directive {
        raw: String,
        name: String,
        args: String,
    },
    Section(Section),
}

/// A `<Name args>` ... `</Name>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub open: String,
    pub name: String,
    pub args: String,
    pub children: Vec<Node>,
    pub close: String,
}

/// A parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    trailing_newline: bool,
}

fn split_directive(text: &str) -> (String, String) {
    match text.split_once(char::is_whitespace) {
        Some((name, args)) => (name.to_string(), args.trim().to_string()),
        None => (text.to_string(), String::new()),
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

impl Node {
    pub fn comment_text(&self) -> Option<&str> {
        match self {
            Node::Comment(raw) => Some(raw.trim().trim_start_matches('#').trim()),
            _ => None,
        }
    }

    fn render_into(&self, out: &mut Vec<String>) {
        match self {
            Node::Blank(raw) | Node::Comment(raw) => out.push(raw.clone()),
            Node::Directive { raw, .. } => out.push(raw.clone()),
            Node::Section(section) => section.render_into(out),
        }
    }
}

impl Section {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_virtual_host(&self) -> bool {
        self.is("VirtualHost")
    }

    /// Arguments of the first direct child directive called `name`.
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::Directive { name: n, args, .. } if n.eq_ignore_ascii_case(name) => {
                Some(args.as_str())
            }
            _ => None,
        })
    }

    /// Indentation used for children: that of the first non-blank child, or
    /// the section's own indentation plus four spaces.
    pub fn child_indent(&self) -> String {
        self.children
            .iter()
            .find_map(|node| match node {
                Node::Blank(_) => None,
                Node::Comment(raw) | Node::Directive { raw, .. } => {
                    Some(leading_whitespace(raw).to_string())
                }
                Node::Section(s) => Some(leading_whitespace(&s.open).to_string()),
            })
            .unwrap_or_else(|| format!("{}    ", leading_whitespace(&self.open)))
    }

    fn render_into(&self, out: &mut Vec<String>) {
        out.push(self.open.clone());
        for child in &self.children {
            child.render_into(out);
        }
        out.push(self.close.clone());
    }
}

impl Document {
    /// Parse configuration text.
    ///
    /// Fails with `MalformedConfig` when sections are unbalanced.
    pub fn parse(text: &str) -> Result<Self, StackError> {
        let trailing_newline = text.ends_with('\n');
        let body = if trailing_newline {
            &text[..text.len() - 1]
        } else {
            text
        };

        let mut root: Vec<Node> = Vec::new();
        let mut stack: Vec<(Section, usize)> = Vec::new();

        if !text.is_empty() {
            for (index, line) in body.split('\n').enumerate() {
                let line_no = index + 1;
                let trimmed = line.trim();

                let node = if trimmed.is_empty() {
                    Node::Blank(line.to_string())
                } else if trimmed.starts_with('#') {
                    Node::Comment(line.to_string())
                } else if let Some(rest) = trimmed.strip_prefix("</") {
                    let name = rest.trim_end_matches('>').trim();
                    let (mut section, _) = stack.pop().ok_or_else(|| StackError::MalformedConfig {
                        message: format!("line {}: closing </{}> without an opening tag", line_no, name),
                    })?;
                    if !section.name.eq_ignore_ascii_case(name) {
                        return Err(StackError::MalformedConfig {
                            message: format!(
                                "line {}: </{}> closes <{}>",
                                line_no, name, section.name
                            ),
                        });
                    }
                    section.close = line.to_string();
                    Node::Section(section)
                } else if let Some(rest) = trimmed.strip_prefix('<') {
                    let inner = rest.trim_end_matches('>').trim();
                    let (name, args) = split_directive(inner);
                    stack.push((
                        Section {
                            open: line.to_string(),
                            name,
                            args,
                            children: Vec::new(),
                            close: String::new(),
                        },
                        line_no,
                    ));
                    continue;
                } else {
                    let (name, args) = split_directive(trimmed);
                    Node::Directive {
                        raw: line.to_string(),
                        name,
                        args,
                    }
                };

                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(node),
                    None => root.push(node),
                }
            }
        }

        if let Some((section, line_no)) = stack.last() {
            return Err(StackError::MalformedConfig {
                message: format!("<{}> opened at line {} is never closed", section.name, line_no),
            });
        }

        Ok(Self {
            nodes: root,
            trailing_newline,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render back to text.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for node in &self.nodes {
            node.render_into(&mut lines);
        }
        let mut text = lines.join("\n");
        if self.trailing_newline && !lines.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Every VirtualHost section, at any depth (e.g. inside `<IfModule>`).
    pub fn virtual_hosts(&self) -> Vec<&Section> {
        fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a Section>) {
            for node in nodes {
                if let Node::Section(section) = node {
                    if section.is_virtual_host() {
                        out.push(section);
                    } else {
                        walk(&section.children, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Apply `f` to every VirtualHost section. Returns how many were visited.
    pub fn for_each_virtual_host_mut<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&mut Section),
    {
        fn walk<F: FnMut(&mut Section)>(nodes: &mut [Node], f: &mut F) -> usize {
            let mut count = 0;
            for node in nodes {
                if let Node::Section(section) = node {
                    if section.is_virtual_host() {
                        f(section);
                        count += 1;
                    } else {
                        count += walk(&mut section.children, f);
                    }
                }
            }
            count
        }
        walk(&mut self.nodes, &mut f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# top comment\n<IfModule mod_ssl.c>\n  <VirtualHost *:443>\n    ServerName a.test\n\n    <Directory /srv/a>\n      Require all granted\n    </Directory>\n  </VirtualHost>\n</IfModule>\n";

    #[test]
    fn test_round_trip_is_byte_exact() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.render(), SAMPLE);

        let no_newline = "<VirtualHost *:80>\r\n\tServerName x\r\n</VirtualHost>";
        assert_eq!(Document::parse(no_newline).unwrap().render(), no_newline);
    }

    #[test]
    fn test_finds_nested_virtual_hosts() {
        let doc = Document::parse(SAMPLE).unwrap();
        let hosts = doc.virtual_hosts();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].directive("servername"), Some("a.test"));
        assert_eq!(hosts[0].args, "*:443");
        assert_eq!(hosts[0].child_indent(), "    ");
    }

    #[test]
    fn test_unbalanced_sections_are_malformed() {
        for text in [
            "<VirtualHost *:80>\nServerName a\n",
            "ServerName a\n</VirtualHost>\n",
            "<VirtualHost *:80>\n<Directory />\n</VirtualHost>\n</Directory>\n",
        ] {
            assert!(matches!(
                Document::parse(text),
                Err(StackError::MalformedConfig { .. })
            ));
        }
    }

    #[test]
    fn test_empty_text() {
        let doc = Document::parse("").unwrap();
        assert!(doc.nodes().is_empty());
        assert_eq!(doc.render(), "");
    }
}
