//! Hierarchical scene paths
//!
//! Every object in the scene index (drawables, cameras, lights, render
//! buffers, tasks) is addressed by an absolute, `/`-separated path such as
//! `/taskData/renderTask`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors produced when building or parsing a path
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Empty path string
    #[error("Empty path")]
    Empty,

    /// Path does not start at the absolute root
    #[error("Path is not absolute: {0}")]
    NotAbsolute(String),

    /// Element name is empty or contains a separator
    #[error("Invalid path element: {0:?}")]
    InvalidElement(String),
}

/// Absolute hierarchical path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath(String);

impl ScenePath {
    /// The absolute root path `/`
    pub fn absolute_root() -> Self {
        Self("/".to_string())
    }

    /// Whether this is the absolute root
    pub fn is_absolute_root(&self) -> bool {
        self.0 == "/"
    }

    /// Whether `name` may be used as a single path element
    pub fn is_valid_element(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':' || c == '-' || c == '.')
    }

    /// Append a single element
    pub fn append_child(&self, name: &str) -> Result<Self, PathError> {
        if !Self::is_valid_element(name) {
            return Err(PathError::InvalidElement(name.to_string()));
        }
        if self.is_absolute_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Append every element of another absolute path, e.g.
    /// `/delegate` + `/World/ball` = `/delegate/World/ball`
    pub fn append_path(&self, other: &Self) -> Self {
        if other.is_absolute_root() {
            self.clone()
        } else if self.is_absolute_root() {
            other.clone()
        } else {
            Self(format!("{}{}", self.0, other.0))
        }
    }

    /// Remove `prefix` from the front of this path, yielding an absolute path
    pub fn strip_prefix(&self, prefix: &Self) -> Option<Self> {
        if !self.has_prefix(prefix) {
            return None;
        }
        if prefix.is_absolute_root() {
            return Some(self.clone());
        }
        let rest = &self.0[prefix.0.len()..];
        if rest.is_empty() {
            Some(Self::absolute_root())
        } else {
            Some(Self(rest.to_string()))
        }
    }

    /// Parent path, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_absolute_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::absolute_root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Last element name (empty for the root)
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Whether `prefix` equals this path or is one of its ancestors
    pub fn has_prefix(&self, prefix: &Self) -> bool {
        if prefix.is_absolute_root() {
            return true;
        }
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }

    /// Ancestors from the root down to and including this path
    pub fn ancestors_inclusive(&self) -> Vec<Self> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            chain.push(path);
        }
        chain.reverse();
        chain
    }

    /// Number of elements below the root
    pub fn depth(&self) -> usize {
        if self.is_absolute_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScenePath {
    fn default() -> Self {
        Self::absolute_root()
    }
}

impl FromStr for ScenePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if !s.starts_with('/') {
            return Err(PathError::NotAbsolute(s.to_string()));
        }
        if s == "/" {
            return Ok(Self::absolute_root());
        }
        s[1..].split('/').try_fold(Self::absolute_root(), |path, element| path.append_child(element))
    }
}

impl TryFrom<String> for ScenePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScenePath> for String {
    fn from(path: ScenePath) -> Self {
        path.0
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
