//! Minimal LDIF (RFC 2849) document builder used to feed `slapadd`.
//!
//! Documents are kept as typed records and only turned into text when
//! written, so values are never interpolated into a template by hand.

use base64::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attrs: Vec<(String, String)>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    /// Same attribute repeated once per value, in order
    pub fn attrs<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.attrs.push((name.to_string(), value.into()));
        }
        self
    }

    pub fn attr_if(self, condition: bool, name: &str, value: impl Into<String>) -> Self {
        if condition {
            self.attr(name, value)
        } else {
            self
        }
    }

    /// Values of the attribute, compared case-insensitively by name
    pub fn get(&self, name: &str) -> Vec<&str> {
        self.attrs
            .iter()
            .filter(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Entry(Entry),

    /// `include:` directive understood by slapadd for schema files
    Include(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    records: Vec<Record>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) -> &mut Self {
        self.records.push(Record::Entry(entry));
        self
    }

    pub fn include(&mut self, url: impl Into<String>) -> &mut Self {
        self.records.push(Record::Include(url.into()));
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.records.iter().filter_map(|record| match record {
            Record::Entry(entry) => Some(entry),
            Record::Include(_) => None,
        })
    }

    pub fn entry(&self, dn: &str) -> Option<&Entry> {
        self.entries().find(|entry| entry.dn.eq_ignore_ascii_case(dn))
    }

    pub fn to_ldif(&self) -> String {
        let mut out = String::new();

        for (idx, record) in self.records.iter().enumerate() {
            match record {
                Record::Entry(entry) => {
                    if idx > 0 {
                        out.push('\n');
                    }
                    push_line(&mut out, "dn", &entry.dn);
                    for (name, value) in &entry.attrs {
                        push_line(&mut out, name, value);
                    }
                }
                Record::Include(url) => {
                    if idx > 0 && !matches!(self.records[idx - 1], Record::Include(_)) {
                        out.push('\n');
                    }
                    out.push_str(&format!("include: {url}\n"));
                }
            }
        }

        out
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_ldif())
    }
}

fn push_line(out: &mut String, name: &str, value: &str) {
    if is_safe_string(value) {
        out.push_str(&format!("{name}: {value}\n"));
    } else {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        out.push_str(&format!("{name}:: {encoded}\n"));
    }
}

/// SAFE-STRING of RFC 2849, additionally refusing a trailing space
fn is_safe_string(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return true;
    };

    if matches!(first, ' ' | ':' | '<') || value.ends_with(' ') {
        return false;
    }

    value
        .chars()
        .all(|c| c.is_ascii() && !matches!(c, '\0' | '\n' | '\r'))
}
