//! Node paths from the document root to a position

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`NodePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Property name inside an object
    Property(String),

    /// Item position inside an array
    Index(usize),
}

impl Segment {
    /// Property name, if this is a property segment
    pub fn as_property(&self) -> Option<&str> {
        match self {
            Segment::Property(name) => Some(name),
            Segment::Index(_) => None,
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Property(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Segment::Property(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Sequence of segments locating a node, root first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    /// The empty path, denoting the document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Segments, root first
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    /// Copy of this path with one more segment
    #[must_use]
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Path of the enclosing position, `None` at the root
    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Last segment
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }
}

impl From<Vec<Segment>> for NodePath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            match segment {
                Segment::Property(name) => {
                    if !first {
                        f.write_str("/")?;
                    }
                    f.write_str(name)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Parses `steps[0]/tool_id`. A segment made only of digits is an index too,
/// so `steps/0/tool_id` is the same path.
impl FromStr for NodePath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        let mut segments = Vec::new();

        for part in path.split('/') {
            if part.is_empty() {
                continue;
            }

            let (name, mut rest) = match part.find('[') {
                Some(open) => (&part[..open], &part[open..]),
                None => (part, ""),
            };

            if !name.is_empty() {
                if name.bytes().all(|b| b.is_ascii_digit()) {
                    let index = name
                        .parse()
                        .map_err(|_| Error::invalid_path(path, format!("bad index '{name}'")))?;
                    segments.push(Segment::Index(index));
                } else {
                    segments.push(Segment::Property(name.to_string()));
                }
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| Error::invalid_path(path, format!("unclosed bracket in '{part}'")))?;
                let index = rest[1..close]
                    .parse()
                    .map_err(|_| Error::invalid_path(path, format!("invalid index in '{part}'")))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(Error::invalid_path(
                        path,
                        format!("unexpected text after index in '{part}'"),
                    ));
                }
            }
        }

        Ok(Self(segments))
    }
}
