//! Slash-separated paths and wildcard path templates.

use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const RESERVED: &[char] = &['.', '#', '$', '[', ']'];

/// Splits `path` into segments. Leading and trailing slashes are ignored,
/// so `""` and `"/"` both address the root.
///
/// # Examples
///
/// ```
/// use linecut_store::path::segments;
///
/// assert_eq!(segments("/empresas/abc/status").unwrap(), vec!["empresas", "abc", "status"]);
/// assert!(segments("/").unwrap().is_empty());
/// assert!(segments("/a//b").is_err());
/// ```
pub fn segments(path: &str) -> Result<Vec<String>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split('/')
        .map(|seg| {
            if seg.is_empty() || seg.contains(RESERVED) {
                Err(StoreError::InvalidPath(path.to_string()))
            } else {
                Ok(seg.to_string())
            }
        })
        .collect()
}

/// Joins segments back into an absolute path (`"/a/b"`, or `"/"` for none).
pub fn join<S: AsRef<str>>(segs: &[S]) -> String {
    let mut out = String::new();
    for seg in segs {
        out.push('/');
        out.push_str(seg.as_ref());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `{name}` matches any single segment and binds it to `name`.
    Wildcard(String),
}

impl Segment {
    pub fn matches(&self, seg: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == seg,
            Segment::Wildcard(_) => true,
        }
    }
}

/// A path pattern such as `/empresas/{userId}/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the shared leading segments of the template and `path`
    /// agree, i.e. a write at `path` can affect a location this template
    /// names (either an ancestor or a descendant of it).
    pub fn overlaps(&self, path: &[String]) -> bool {
        self.segments
            .iter()
            .zip(path)
            .all(|(tpl, seg)| tpl.matches(seg))
    }

    /// Binds wildcard names when `path` matches the template exactly.
    ///
    /// # Examples
    ///
    /// ```
    /// use linecut_store::path::{segments, PathTemplate};
    ///
    /// let tpl: PathTemplate = "/empresas/{userId}/status".parse().unwrap();
    /// let params = tpl.bind(&segments("/empresas/abc/status").unwrap()).unwrap();
    /// assert_eq!(params["userId"], "abc");
    /// assert!(tpl.bind(&segments("/empresas/abc").unwrap()).is_none());
    /// ```
    pub fn bind(&self, path: &[String]) -> Option<HashMap<String, String>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (tpl, seg) in self.segments.iter().zip(path) {
            match tpl {
                Segment::Literal(lit) if lit != seg => return None,
                Segment::Literal(_) => {}
                Segment::Wildcard(name) => {
                    params.insert(name.clone(), seg.clone());
                }
            }
        }
        Some(params)
    }
}

impl FromStr for PathTemplate {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim_matches('/');
        let mut parsed = Vec::new();
        if !trimmed.is_empty() {
            for seg in trimmed.split('/') {
                if let Some(inner) = seg.strip_prefix('{') {
                    let name = inner
                        .strip_suffix('}')
                        .filter(|n| !n.is_empty() && !n.contains(['{', '}']))
                        .ok_or_else(|| StoreError::InvalidTemplate(s.to_string()))?;
                    parsed.push(Segment::Wildcard(name.to_string()));
                } else if seg.is_empty() || seg.contains(RESERVED) || seg.contains(['{', '}']) {
                    return Err(StoreError::InvalidTemplate(s.to_string()));
                } else {
                    parsed.push(Segment::Literal(seg.to_string()));
                }
            }
        }
        Ok(Self {
            raw: s.to_string(),
            segments: parsed,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
