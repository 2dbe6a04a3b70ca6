//! In-memory section file: an ordered map from dotted path to value.
//!
//! The text form groups entries by the path's first component:
//!
//! ```text
//! [player0]
//! name="Caesar"
//! c0.size=4
//! ```
//!
//! RULE: loaders and savers only touch the file through this API.
//! They never look at the text form.

use crate::error::{SaveError, SaveResult};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
}

#[derive(Debug, Clone, Default)]
pub struct SectionFile {
    entries: Vec<Option<(String, Value)>>,
    index:   HashMap<String, usize>,
}

impl SectionFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // ── Raw access ────────────────────────────────────────────────────────────

    pub fn set(&mut self, path: &str, value: Value) {
        match self.index.get(path) {
            Some(&i) => self.entries[i] = Some((path.to_string(), value)),
            None => {
                self.index.insert(path.to_string(), self.entries.len());
                self.entries.push(Some((path.to_string(), value)));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let &i = self.index.get(path)?;
        self.entries[i].as_ref().map(|(_, v)| v)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let i = self.index.remove(path)?;
        self.entries[i].take().map(|(_, v)| v)
    }

    /// Move a value to a new path. Returns false if `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.remove(from) {
            Some(value) => {
                self.set(to, value);
                true
            }
            None => false,
        }
    }

    /// Every live path that starts with `prefix`, in insertion order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .flatten()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    // ── Typed setters ─────────────────────────────────────────────────────────

    pub fn set_int(&mut self, path: &str, value: i64) {
        self.set(path, Value::Int(value));
    }

    pub fn set_bool(&mut self, path: &str, value: bool) {
        self.set(path, Value::Bool(value));
    }

    pub fn set_str(&mut self, path: &str, value: &str) {
        self.set(path, Value::Str(value.to_string()));
    }

    pub fn set_str_list<S: AsRef<str>>(&mut self, path: &str, values: &[S]) {
        let list = values.iter().map(|s| Value::Str(s.as_ref().to_string())).collect();
        self.set(path, Value::List(list));
    }

    pub fn set_int_list(&mut self, path: &str, values: &[i64]) {
        self.set(path, Value::List(values.iter().map(|&v| Value::Int(v)).collect()));
    }

    // ── Typed lookups ─────────────────────────────────────────────────────────

    pub fn lookup_int(&self, path: &str) -> Option<i64> {
        match self.get(path)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn lookup_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            Value::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// A single string is accepted as a one-element list.
    pub fn lookup_str_list(&self, path: &str) -> Option<Vec<String>> {
        match self.get(path)? {
            Value::Str(v) => Some(vec![v.clone()]),
            Value::List(items) => items
                .iter()
                .map(|v| match v {
                    Value::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn lookup_int_list(&self, path: &str) -> Option<Vec<i64>> {
        match self.get(path)? {
            Value::Int(v) => Some(vec![*v]),
            Value::List(items) => items
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn lookup_int_or(&self, path: &str, default: i64) -> i64 {
        self.lookup_int(path).unwrap_or(default)
    }

    pub fn lookup_bool_or(&self, path: &str, default: bool) -> bool {
        self.lookup_bool(path).unwrap_or(default)
    }

    pub fn lookup_str_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.lookup_str(path).unwrap_or(default)
    }

    // ── Text form ─────────────────────────────────────────────────────────────

    pub fn load(path: impl AsRef<Path>) -> SaveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SaveResult<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut sections: Vec<(&str, Vec<(&str, &Value)>)> = Vec::new();
        let mut section_pos: HashMap<&str, usize> = HashMap::new();

        for (path, value) in self.entries.iter().flatten() {
            let (section, key) = path.split_once('.').unwrap_or((path.as_str(), ""));
            let pos = *section_pos.entry(section).or_insert_with(|| {
                sections.push((section, Vec::new()));
                sections.len() - 1
            });
            sections[pos].1.push((key, value));
        }

        let mut out = String::new();
        for (section, entries) in sections {
            out.push_str(&format!("[{section}]\n"));
            for (key, value) in entries {
                out.push_str(key);
                out.push('=');
                write_value(&mut out, value);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    pub fn parse(text: &str) -> SaveResult<Self> {
        let mut file = Self::new();
        let mut section: Option<String> = None;

        for (n, raw) in text.lines().enumerate() {
            let line_no = n + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(name.trim().to_string());
                continue;
            }
            let Some(current) = section.as_deref() else {
                return Err(SaveError::Parse {
                    line: line_no,
                    message: "entry outside of any section".to_string(),
                });
            };
            let Some((key, rest)) = line.split_once('=') else {
                return Err(SaveError::Parse {
                    line: line_no,
                    message: format!("expected 'key=value', got '{line}'"),
                });
            };
            let value = parse_value(rest.trim(), line_no)?;
            file.set(&format!("{current}.{}", key.trim()), value);
        }
        Ok(file)
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Int(v) => out.push_str(&v.to_string()),
        Value::Bool(true) => out.push_str("TRUE"),
        Value::Bool(false) => out.push_str("FALSE"),
        Value::Str(s) => {
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
        }
    }
}

fn parse_value(text: &str, line: usize) -> SaveResult<Value> {
    let mut items = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };

        if first == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some('n') => s.push('\n'),
                        Some(other) => s.push(other),
                        None => break,
                    },
                    c => s.push(c),
                }
            }
            if !closed {
                return Err(SaveError::Parse { line, message: "unterminated string".to_string() });
            }
            items.push(Value::Str(s));
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            let token = token.trim();
            let value = match token {
                "TRUE" => Value::Bool(true),
                "FALSE" => Value::Bool(false),
                t => t.parse::<i64>().map(Value::Int).map_err(|_| SaveError::Parse {
                    line,
                    message: format!("unrecognised value '{t}'"),
                })?,
            };
            items.push(value);
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(c) => {
                return Err(SaveError::Parse {
                    line,
                    message: format!("unexpected '{c}' after value"),
                })
            }
        }
    }

    Ok(match items.len() {
        1 => items.remove(0),
        _ => Value::List(items),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_round_trips() {
        let mut file = SectionFile::new();
        file.set_int("game.turn", 12);
        file.set_bool("random.save", false);
        file.set_str("player0.name", "Cae\"sar, the \\first");
        file.set_str_list("savefile.roads_vector", &["Road", "Railroad"]);
        file.set_str("map.t0000", "");

        let parsed = SectionFile::parse(&file.to_text()).expect("parse");
        assert_eq!(parsed.lookup_int("game.turn"), Some(12));
        assert_eq!(parsed.lookup_bool("random.save"), Some(false));
        assert_eq!(parsed.lookup_str("player0.name"), Some("Cae\"sar, the \\first"));
        assert_eq!(
            parsed.lookup_str_list("savefile.roads_vector"),
            Some(vec!["Road".to_string(), "Railroad".to_string()])
        );
        assert_eq!(parsed.lookup_str("map.t0000"), Some(""));
    }

    #[test]
    fn rename_and_remove() {
        let mut file = SectionFile::new();
        file.set_str("map.kvb00_0000", "ff");
        assert!(file.rename("map.kvb00_0000", "map.k00_0000"));
        assert!(!file.contains("map.kvb00_0000"));
        assert_eq!(file.keys_with_prefix("map.k"), vec!["map.k00_0000".to_string()]);
        assert_eq!(file.remove("map.k00_0000"), Some(Value::Str("ff".into())));
        assert!(file.is_empty());
    }

    #[test]
    fn rejects_entries_outside_sections() {
        assert!(matches!(SectionFile::parse("turn=1"), Err(SaveError::Parse { line: 1, .. })));
    }
}
