//! Line-oriented report templates
//!
//! Placeholders are `$name` or `${name}` where `name` starts with a letter or
//! underscore followed by letters, digits or underscores. `$$` is a literal
//! `$`. Substitution is safe: a placeholder without a binding, or a `$` that
//! does not start a placeholder, is copied to the output unchanged.

use crate::error::DigestError;
use crate::stats::SummaryStats;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

/// Template text split into lines, terminators included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    lines: Vec<String>,
}

impl Template {
    pub fn parse(text: &str) -> Self {
        Self { lines: text.split_inclusive('\n').map(str::to_string).collect() }
    }

    /// Read a template file once; it is reused verbatim for every result file
    pub fn load(path: &Path) -> Result<Self, DigestError> {
        let text = std::fs::read_to_string(path).map_err(|e| DigestError::resource(path, e))?;
        Ok(Self::parse(&text))
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Expand every line against `mapping`
    pub fn render(&self, mapping: &SubstitutionMapping) -> Vec<String> {
        self.lines.iter().map(|line| substitute(line, mapping)).collect()
    }
}

/// Ordered `(name, value)` bindings for one result file.
///
/// `filename` comes first, then `mean_<i>` and `std_<i>` for each column in
/// index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMapping {
    bindings: Vec<(String, String)>,
}

impl SubstitutionMapping {
    pub fn for_file(filename: &str, stats: &SummaryStats) -> Self {
        let mut mapping = Self::default();
        mapping.bind("filename", filename);
        for (i, (mean, std)) in stats.mean.iter().zip(&stats.std).enumerate() {
            mapping.bind(format!("mean_{}", i), format_value(*mean));
            mapping.bind(format!("std_{}", i), format_value(*std));
        }
        mapping
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(n, _)| n.as_str())
    }
}

/// Shortest round-trip decimal, always with a fractional part (`5.0`, `2.5`).
///
/// Very large or small magnitudes switch to Rust's exponent notation with no
/// sign or zero padding on the exponent (`1e16`, `1e-5`).
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

/// `$$`, `$name` or `${name}`
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})")
            .expect("placeholder pattern is a valid regex")
    })
}

/// Expand the placeholders of a single line
pub fn substitute(line: &str, mapping: &SubstitutionMapping) -> String {
    placeholder_regex()
        .replace_all(line, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .and_then(|name| mapping.get(name.as_str()))
                .unwrap_or(&caps[0])
                .to_string()
        })
        .into_owned()
}
