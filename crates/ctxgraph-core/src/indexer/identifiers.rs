//! Deterministic qualified identifiers for graph nodes.
//!
//! The scheme is `path` for files, `path::Name` for classes, interfaces and
//! free functions, and `path::Class::method` for methods. It is a pure
//! function of its inputs so repeated builds agree on every node id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, GraphResult};

pub const SEPARATOR: &str = "::";

/// Prefix for synthetic nodes standing in for includes outside the corpus.
pub const EXTERNAL_PREFIX: &str = "external::";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Class,
    Interface,
    Function,
    Method,
    /// Synthetic include target; never produced by [`identify`].
    External,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Class => "class",
            EntityKind::Interface => "interface",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::External => "external",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = GraphError;

    /// Only declared-entity kinds parse; `external` is internal to the graph.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(EntityKind::File),
            "class" => Ok(EntityKind::Class),
            "interface" => Ok(EntityKind::Interface),
            "function" => Ok(EntityKind::Function),
            "method" => Ok(EntityKind::Method),
            other => Err(GraphError::InvalidKind(other.to_string())),
        }
    }
}

/// Build the qualified identifier for one declared entity.
///
/// Methods require `parent`; the other kinds ignore it. The `External`
/// kind is rejected because external nodes are keyed by include literal,
/// not by declaring file.
pub fn qualified_id(
    path: &str,
    kind: EntityKind,
    name: &str,
    parent: Option<&str>,
) -> GraphResult<String> {
    match kind {
        EntityKind::File => Ok(file_id(path)),
        EntityKind::Class | EntityKind::Interface | EntityKind::Function => {
            Ok(member_id(path, name))
        }
        EntityKind::Method => match parent {
            Some(parent) => Ok(method_id(path, parent, name)),
            None => Err(GraphError::InvalidKind(format!(
                "method {name:?} in {path} has no parent class"
            ))),
        },
        EntityKind::External => Err(GraphError::InvalidKind(kind.to_string())),
    }
}

/// String-kinded entry point; unknown kinds fail with `InvalidKind`.
pub fn identify(path: &str, kind: &str, name: &str, parent: Option<&str>) -> GraphResult<String> {
    let kind = kind.parse::<EntityKind>()?;
    qualified_id(path, kind, name, parent)
}

pub fn file_id(path: &str) -> String {
    path.to_string()
}

/// Id of a class, interface or free function declared in `path`.
pub fn member_id(path: &str, name: &str) -> String {
    format!("{path}{SEPARATOR}{name}")
}

pub fn method_id(path: &str, parent: &str, name: &str) -> String {
    format!("{path}{SEPARATOR}{parent}{SEPARATOR}{name}")
}

/// Id of the synthetic node for an include that resolved to nothing loaded.
pub fn external_id(literal: &str) -> String {
    format!("{EXTERNAL_PREFIX}{literal}")
}

/// Key under which a method is additionally registered in the symbol index.
pub fn member_key(parent: &str, name: &str) -> String {
    format!("{parent}{SEPARATOR}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_shapes() {
        assert_eq!(identify("/a/b.h", "file", "", None).unwrap(), "/a/b.h");
        assert_eq!(
            identify("/a/b.h", "class", "Shape", None).unwrap(),
            "/a/b.h::Shape"
        );
        assert_eq!(
            identify("/a/b.h", "interface", "Drawable", None).unwrap(),
            "/a/b.h::Drawable"
        );
        assert_eq!(
            identify("/a/b.h", "function", "Area", None).unwrap(),
            "/a/b.h::Area"
        );
        assert_eq!(
            identify("/a/b.h", "method", "Area", Some("Shape")).unwrap(),
            "/a/b.h::Shape::Area"
        );
    }

    #[test]
    fn test_deterministic() {
        let a = identify("/x.cc", "method", "Run", Some("Task")).unwrap();
        let b = identify("/x.cc", "method", "Run", Some("Task")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_inputs_distinct_ids() {
        let ids = [
            identify("/x.cc", "function", "Run", None).unwrap(),
            identify("/x.cc", "method", "Run", Some("Task")).unwrap(),
            identify("/x.cc", "method", "Run", Some("Job")).unwrap(),
            identify("/y.cc", "function", "Run", None).unwrap(),
            identify("/x.cc", "file", "", None).unwrap(),
        ];
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_invalid_kind() {
        let err = identify("/x.cc", "namespace", "v8", None).unwrap_err();
        assert!(matches!(err, GraphError::InvalidKind(ref k) if k == "namespace"));
        assert!(matches!(
            identify("/x.cc", "external", "x", None),
            Err(GraphError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_method_without_parent() {
        assert!(matches!(
            qualified_id("/x.cc", EntityKind::Method, "Run", None),
            Err(GraphError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [
            EntityKind::File,
            EntityKind::Class,
            EntityKind::Interface,
            EntityKind::Function,
            EntityKind::Method,
        ] {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }
}
