/*
 * cookie.rs
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

//! Cookie model: parse and serialize cookie strings, match a cookie against an access scope.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::protocol::http::error::CookieError;

/// Format used when writing `expires=`; RFC 1123 as sent by most servers.
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Netscape and asctime variants still seen in the wild.
const LEGACY_EXPIRES_FORMATS: &[&str] = &[
    "%a, %d-%b-%Y %H:%M:%S GMT",
    "%A, %d-%b-%Y %H:%M:%S GMT",
    "%a, %d %b %Y %H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse the value of an `expires` attribute as an absolute UTC timestamp.
pub fn parse_cookie_date(value: &str) -> Result<DateTime<Utc>, CookieError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CookieError::BadExpires(value.to_string()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let value = expand_two_digit_year(value);
    LEGACY_EXPIRES_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or(CookieError::BadExpires(value))
}

/// `Sun, 06-Nov-94 08:49:37 GMT` -> `Sun, 06-Nov-1994 08:49:37 GMT` (00-69 -> 20xx, 70-99 -> 19xx).
fn expand_two_digit_year(value: &str) -> String {
    let bytes = value.as_bytes();
    for (i, _) in value.match_indices('-') {
        let start = i + 1;
        let Some(rest) = bytes.get(start..) else { continue };
        if rest.len() >= 3
            && rest[0].is_ascii_digit()
            && rest[1].is_ascii_digit()
            && !rest[2].is_ascii_digit()
            && i >= 3
            && bytes[i - 3..i].iter().all(|b| b.is_ascii_alphabetic())
        {
            let yy = (rest[0] - b'0') as u32 * 10 + (rest[1] - b'0') as u32;
            let full = if yy < 70 { 2000 + yy } else { 1900 + yy };
            let mut out = value.to_string();
            out.replace_range(start..start + 2, &full.to_string());
            return out;
        }
    }
    value.to_string()
}

/// Scope a cookie is matched against: the request's domain and path, and the channel's properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAccessInfo {
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub script_accessible: bool,
}

impl CookieAccessInfo {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            path: Some(path.into()),
            secure: false,
            script_accessible: true,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn script_accessible(mut self, script_accessible: bool) -> Self {
        self.script_accessible = script_accessible;
        self
    }
}

impl From<&Cookie> for CookieAccessInfo {
    fn from(cookie: &Cookie) -> Self {
        Self {
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            script_accessible: cookie.script_accessible,
        }
    }
}

/// A single cookie. `expires == None` is a session cookie that never expires in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub script_accessible: bool,
}

impl Cookie {
    /// Session cookie with no scope. Fails if `name` is empty.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, CookieError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CookieError::Parse(format!("={}", value.into())));
        }
        Ok(Self {
            name,
            value: value.into(),
            expires: None,
            path: None,
            domain: None,
            secure: false,
            script_accessible: true,
        })
    }

    /// Parse a `Set-Cookie` style string: `name[=value](; attribute[=value])*`.
    ///
    /// Recognised attributes (case-insensitive): `httponly`, `expires`, `path`, `domain`,
    /// `secure`. Others are ignored. An unparseable `expires` is an error.
    pub fn parse(s: &str) -> Result<Self, CookieError> {
        let mut segments = s.split(';');
        let first = segments.next().unwrap_or("").trim();
        let (name, value) = match first.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            None => (first, ""),
        };
        if name.is_empty() {
            return Err(CookieError::Parse(s.to_string()));
        }
        let mut cookie = Cookie::new(name, value)?;

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, val) = match segment.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (segment, ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "httponly" => cookie.script_accessible = false,
                "expires" => cookie.expires = Some(parse_cookie_date(val)?),
                "path" => cookie.path = Some(val.to_string()),
                "domain" => cookie.domain = Some(val.to_string()),
                "secure" => cookie.secure = true,
                _ => {}
            }
        }
        Ok(cookie)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(false, |exp| exp < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `name=value`, as sent in a `Cookie` request header.
    pub fn to_value_string(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// True when the secure flags agree and the scopes collide.
    pub fn matches(&self, access: &CookieAccessInfo) -> bool {
        self.secure == access.secure && self.collides_with(access)
    }

    /// True when this cookie's domain/path scope covers `access`.
    ///
    /// A domain beginning with `.` is a wildcard: it covers the bare domain and any subdomain,
    /// anchored on a label boundary (`.example.com` covers `foo.example.com`, not
    /// `notexample.com`).
    pub fn collides_with(&self, access: &CookieAccessInfo) -> bool {
        if (self.path.is_some() && access.path.is_none())
            || (self.domain.is_some() && access.domain.is_none())
        {
            return false;
        }
        if let (Some(path), Some(access_path)) = (&self.path, &access.path) {
            if !access_path.starts_with(path.as_str()) {
                return false;
            }
        }
        match (&self.domain, &access.domain) {
            (None, None) => true,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(domain), Some(access_domain)) => {
                if domain.eq_ignore_ascii_case(access_domain) {
                    true
                } else if let Some(bare) = domain.strip_prefix('.') {
                    let access_domain = access_domain.to_ascii_lowercase();
                    let domain = domain.to_ascii_lowercase();
                    !bare.is_empty()
                        && (access_domain == bare.to_ascii_lowercase()
                            || access_domain.ends_with(&domain))
                } else {
                    false
                }
            }
        }
    }
}

impl FromStr for Cookie {
    type Err = CookieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cookie::parse(s)
    }
}

/// Serializes with only the attributes that are set, joined by `; `; parses back with `Cookie::parse`.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(expires) = self.expires {
            write!(f, "; expires={}", expires.format(EXPIRES_FORMAT))?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; domain={}", domain)?;
        }
        if let Some(path) = &self.path {
            write!(f, "; path={}", path)?;
        }
        if self.secure {
            f.write_str("; secure")?;
        }
        if !self.script_accessible {
            f.write_str("; httponly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn access(domain: &str, path: &str) -> CookieAccessInfo {
        CookieAccessInfo::new(domain, path)
    }

    #[test]
    fn parses_name_value_and_attributes() {
        let c = Cookie::parse("sid=abc=def; Path=/app; Domain=.example.com; Secure; HttpOnly").unwrap();
        assert_eq!(c.name(), "sid");
        assert_eq!(c.value, "abc=def");
        assert_eq!(c.path.as_deref(), Some("/app"));
        assert_eq!(c.domain.as_deref(), Some(".example.com"));
        assert!(c.secure);
        assert!(!c.script_accessible);
        assert!(c.expires.is_none());
    }

    #[test]
    fn value_is_optional() {
        let c = Cookie::parse("flag").unwrap();
        assert_eq!(c.name(), "flag");
        assert_eq!(c.value, "");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(Cookie::parse("=value"), Err(CookieError::Parse(_))));
        assert!(matches!(Cookie::parse(""), Err(CookieError::Parse(_))));
        assert!(Cookie::new("", "x").is_err());
    }

    #[test]
    fn bad_expires_is_an_error() {
        let err = Cookie::parse("a=b; expires=not a date").unwrap_err();
        assert!(matches!(err, CookieError::BadExpires(_)));
    }

    #[test]
    fn expires_formats() {
        let want = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        for s in [
            "Wed, 21 Oct 2015 07:28:00 GMT",
            "Wed, 21-Oct-2015 07:28:00 GMT",
            "Wednesday, 21-Oct-15 07:28:00 GMT",
        ] {
            assert_eq!(parse_cookie_date(s).unwrap(), want, "{}", s);
        }
    }

    #[test]
    fn display_round_trips() {
        let s = "k=v; expires=Wed, 21 Oct 2015 07:28:00 GMT; domain=example.com; path=/; secure; httponly";
        let c = Cookie::parse(s).unwrap();
        assert_eq!(c.to_string(), s);
        assert_eq!(Cookie::parse(&c.to_string()).unwrap(), c);
        assert_eq!(Cookie::parse("a=1").unwrap().to_string(), "a=1");
    }

    #[test]
    fn wildcard_domain_matches_on_label_boundary() {
        let c = Cookie::parse("a=1; domain=.example.com; path=/").unwrap();
        assert!(c.matches(&access("foo.example.com", "/")));
        assert!(c.matches(&access("a.b.example.com", "/x")));
        assert!(c.matches(&access("example.com", "/")));
        assert!(!c.matches(&access("notexample.com", "/")));
        assert!(!c.matches(&access("example.org", "/")));
    }

    #[test]
    fn exact_domain_only_matches_itself() {
        let c = Cookie::parse("a=1; domain=example.com").unwrap();
        assert!(c.collides_with(&access("EXAMPLE.com", "/")));
        assert!(!c.collides_with(&access("www.example.com", "/")));
    }

    #[test]
    fn secure_cookie_needs_secure_access() {
        let c = Cookie::parse("a=1; domain=example.com; secure").unwrap();
        assert!(!c.matches(&access("example.com", "/")));
        assert!(c.matches(&access("example.com", "/").secure(true)));
        let plain = Cookie::parse("b=2; domain=example.com").unwrap();
        assert!(!plain.matches(&access("example.com", "/").secure(true)));
    }

    #[test]
    fn path_prefix_rules() {
        let c = Cookie::parse("a=1; path=/app").unwrap();
        assert!(c.collides_with(&access("h", "/app/page")));
        assert!(!c.collides_with(&access("h", "/other")));
        let no_path_access = CookieAccessInfo {
            domain: Some("h".into()),
            path: None,
            secure: false,
            script_accessible: true,
        };
        assert!(!c.collides_with(&no_path_access));
    }

    #[test]
    fn unscoped_cookie_collides_with_anything() {
        let c = Cookie::new("a", "1").unwrap();
        assert!(c.collides_with(&access("anything.test", "/")));
    }

    #[test]
    fn expiry() {
        let mut c = Cookie::new("a", "1").unwrap();
        assert!(!c.is_expired());
        c.expires = Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        assert!(c.is_expired());
    }
}
