/*
 * headers.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, an HTTP/1.1 client library.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Ordered header multimap with case-insensitive names.
//!
//! Names are stored lower-cased and trimmed, values trimmed. A name keeps the position of its
//! first insertion; values under one name keep insertion order.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Append a value for `name`, keeping any existing values.
    pub fn add(&mut self, name: &str, value: &str) {
        let value = value.trim().to_string();
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((normalize(name), vec![value])),
        }
    }

    /// Replace all values for `name` with a single value.
    pub fn set(&mut self, name: &str, value: &str) {
        let value = value.trim().to_string();
        match self.position(name) {
            Some(i) => {
                let values = &mut self.entries[i].1;
                values.clear();
                values.push(value);
            }
            None => self.entries.push((normalize(name), vec![value])),
        }
    }

    /// First value for `name`, or the empty string.
    pub fn get(&self, name: &str) -> &str {
        self.position(name)
            .and_then(|i| self.entries[i].1.first())
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// All values for `name` in insertion order; empty when the name is unknown.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).map_or(false, |i| !self.entries[i].1.is_empty())
    }

    pub fn remove(&mut self, name: &str) -> Vec<String> {
        match self.position(name) {
            Some(i) => self.entries.remove(i).1,
            None => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_empty())
    }

    /// (name, value) pairs in insertion order; a name with several values yields several pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// `"name: value"` lines for diagnostics.
    pub fn all_entries(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut h = Headers::new();
        h.set("Accept", "text/html");
        assert_eq!(h.get("accept"), "text/html");
        h.set("ACCEPT", " */* ");
        assert_eq!(h.get_all("Accept"), &["*/*".to_string()]);
    }

    #[test]
    fn add_keeps_order() {
        let mut h = Headers::new();
        h.add("Set-Cookie", "a=1");
        h.add("set-cookie", "b=2");
        assert_eq!(h.get_all("SET-COOKIE"), &["a=1".to_string(), "b=2".to_string()]);
        assert_eq!(h.get("set-cookie"), "a=1");
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let mut h = Headers::new();
        h.add("Content-Type", "text/plain");
        assert_eq!(h.get("content-type"), h.get("Content-Type"));
        assert!(h.contains(" CONTENT-TYPE "));
    }

    #[test]
    fn unknown_name_is_empty_and_not_created() {
        let h = Headers::new();
        assert_eq!(h.get("x-missing"), "");
        assert!(h.get_all("x-missing").is_empty());
        assert!(h.is_empty());
    }

    #[test]
    fn entries_use_lowercase_names_in_insertion_order() {
        let mut h = Headers::new();
        h.add("Host", "example.com");
        h.add("X-A", "1");
        h.add("x-a", "2");
        assert_eq!(
            h.all_entries(),
            vec!["host: example.com", "x-a: 1", "x-a: 2"]
        );
    }
}
