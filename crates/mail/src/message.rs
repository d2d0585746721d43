/// Subject and plain-text body shared by every recipient of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// First line (trimmed) is the subject; the rest, joined by `\n` and
    /// trimmed, is the body. Accepts `\r\n` line endings and a leading
    /// byte-order mark.
    pub fn parse(template: &str) -> Self {
        let mut lines = template.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let subject = trim(lines.next().unwrap_or_default()).to_string();
        let body = trim(&lines.collect::<Vec<_>>().join("\n")).to_string();
        Self { subject, body }
    }
}

/// Whitespace and byte-order marks count as padding.
fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}
