//! Minimal INI syntax parsing.
//!
//! This parser only understands the INI grammar itself — sections, `key =
//! value` pairs, `#`/`;` comments, and indented continuation lines. It has no
//! notion of which keys are valid for a section or what kind of value they
//! hold; that is [`crate::schema`]'s job. Keeping the two separate mirrors
//! how the option schema is decoupled from file syntax in the source.

use crate::Error;

/// One `key = value` entry, with the 1-based source line it started on (for
/// error messages raised later when the schema applies it).
#[derive(Clone, Debug, PartialEq)]
pub struct IniEntry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// A parsed INI file: an ordered list of `(section name, entries)`.
/// The "main" section of a dnf-style config is not bracketed; it is
/// represented with section name `"main"` by convention of the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IniDocument {
    pub sections: Vec<(String, Vec<IniEntry>)>,
}

impl IniDocument {
    pub fn section(&self, name: &str) -> Option<&[IniEntry]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, entries)| entries.as_slice())
    }
}

/// Parses `text` (the contents of one `.conf`/`.repo` file) into an
/// [`IniDocument`].
pub fn parse_ini(path: &str, text: &str) -> Result<IniDocument, Error> {
    let mut doc = IniDocument::default();
    let mut current: Option<(String, Vec<IniEntry>)> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_end();

        if line.trim().is_empty() || line.trim_start().starts_with(['#', ';']) {
            continue;
        }

        if raw_line.starts_with([' ', '\t']) {
            // Continuation of the previous entry's value.
            let entries = &mut current
                .as_mut()
                .ok_or_else(|| syntax(path, line_no, "continuation line outside any entry"))?
                .1;
            let entry = entries
                .last_mut()
                .ok_or_else(|| syntax(path, line_no, "continuation line outside any entry"))?;
            entry.value.push('\n');
            entry.value.push_str(line.trim());
            continue;
        }

        let trimmed = line.trim();
        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if let Some(section) = current.take() {
                doc.sections.push(section);
            }
            current = Some((name.trim().to_string(), Vec::new()));
            continue;
        }

        let (key, value) = trimmed
            .split_once('=')
            .or_else(|| trimmed.split_once(':'))
            .ok_or_else(|| syntax(path, line_no, format!("expected `key = value`, got `{trimmed}`")))?;

        let entries = &mut current
            .as_mut()
            .ok_or_else(|| syntax(path, line_no, "entry outside any section"))?
            .1;
        entries.push(IniEntry {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            line: line_no,
        });
    }

    if let Some(section) = current.take() {
        doc.sections.push(section);
    }

    Ok(doc)
}

fn syntax(path: &str, line: usize, detail: impl Into<String>) -> Error {
    Error::Syntax {
        path: path.to_string(),
        line,
        detail: detail.into(),
    }
}
