//! Shareable link: `<base>[?<query>][#<locator>]`
//!
//! The fragment carries the locator, the `t` query parameter carries the
//! display name. Query parameters use form-urlencoded escaping.

use std::fmt;

use crate::constants::share::{DEFAULT_BASE, NAME_PARAM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    base: String,
    params: Vec<(String, String)>,
    fragment: Option<String>,
}

impl Default for ShareLink {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            params: Vec::new(),
            fragment: None,
        }
    }
}

impl ShareLink {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Parse a link. Never fails: anything before `?`/`#` is the base.
    pub fn parse(link: &str) -> Self {
        let (rest, fragment) = match link.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (link, None),
        };
        let (base, query) = rest.split_once('?').unwrap_or((rest, ""));

        let params = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Self {
            base: base.to_string(),
            params,
            fragment,
        }
    }

    /// Locator carried in the fragment, if present and non-empty
    pub fn locator(&self) -> Option<&str> {
        self.fragment.as_deref().filter(|f| !f.is_empty())
    }

    /// Replace the fragment with a freshly encoded locator
    pub fn replace_locator(&mut self, locator: &str) {
        self.fragment = Some(locator.to_string());
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_param(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove_param(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    /// Display name, or `None` when absent or blank
    pub fn display_name(&self) -> Option<&str> {
        self.param(NAME_PARAM).map(str::trim).filter(|n| !n.is_empty())
    }

    /// Set the display name; blank after trimming removes the parameter
    pub fn set_display_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.remove_param(NAME_PARAM);
        } else {
            self.set_param(NAME_PARAM, name);
        }
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{}={}", form_encode(key), form_encode(value))?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn form_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
