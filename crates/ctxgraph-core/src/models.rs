//! Extraction record models consumed by the graph builder.
//!
//! Two serialized shapes are accepted: the flat [`ExtractionRecord`] shape
//! (`sourcePath`, `classes`, ...) and the `.context` document written by the
//! upstream analysis step, where every entry wraps a `metadata` object and a
//! `code` block. Both end up as an [`ExtractionRecord`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{GraphError, GraphResult};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Per-file extraction result. `source_path` is the identity key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    #[serde(default)]
    pub source_path: String,
    #[serde(default, deserialize_with = "entry_list")]
    pub classes: Vec<ClassEntry>,
    #[serde(default, deserialize_with = "entry_list")]
    pub interfaces: Vec<InterfaceEntry>,
    #[serde(default, deserialize_with = "entry_list")]
    pub functions: Vec<FunctionEntry>,
    /// Raw include/import text for the whole file.
    #[serde(
        default,
        deserialize_with = "optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub imports: Option<String>,
}

/// A class declaration. Names in `extends`, `implements` and `dependencies`
/// are as written in source and still unresolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    #[serde(default, deserialize_with = "optional_string")]
    pub name: Option<String>,
    /// Usually a single parent; interfaces may list several.
    #[serde(default, deserialize_with = "string_list")]
    pub extends: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub implements: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "method_list")]
    pub methods: Vec<FunctionEntry>,
}

/// Interfaces share the class shape.
pub type InterfaceEntry = ClassEntry;

/// A free function (no `parent`) or a method (`parent` names its class).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    #[serde(default, deserialize_with = "optional_string")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub dependencies: Vec<String>,
}

impl ClassEntry {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Trimmed name, or `None` when absent or blank.
    pub fn declared_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }
}

impl FunctionEntry {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn method(parent: &str, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            parent: Some(parent.to_string()),
            ..Self::default()
        }
    }

    pub fn declared_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    pub fn declared_parent(&self) -> Option<&str> {
        non_blank(self.parent.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Lenient list deserializers
// ---------------------------------------------------------------------------

/// Accepts `null`, a single string, or a list; non-string items are ignored.
fn string_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Anything but a string reads as absent.
fn optional_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Entries that fail to deserialize are dropped one by one, so a single bad
/// entry never costs the rest of the record.
fn entry_list<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn code_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string(de)?.unwrap_or_default())
}

/// The imports block, or a bare string holding the include text.
fn import_block<'de, D>(de: D) -> Result<Option<CodeBlock<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(code)) => Some(CodeBlock {
            metadata: Value::Null,
            code,
        }),
        Some(obj @ Value::Object(_)) => serde_json::from_value(obj).ok(),
        _ => None,
    })
}

/// Nested methods appear either as bare names or as function-shaped objects.
fn method_list<'de, D>(de: D) -> Result<Vec<FunctionEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(FunctionEntry::named(&name)),
            obj @ Value::Object(_) => serde_json::from_value::<FunctionEntry>(obj).ok(),
            _ => None,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// `.context` document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct FileMetadata {
    #[serde(default, deserialize_with = "optional_string")]
    pub path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// One `<func>`/`<class>`/`<imports>` block: metadata plus the raw code.
#[derive(Debug, Default, Deserialize)]
pub struct CodeBlock<M> {
    #[serde(default)]
    pub metadata: M,
    #[serde(default, deserialize_with = "code_text")]
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextDocument {
    #[serde(default)]
    pub metadata: FileMetadata,
    #[serde(default, deserialize_with = "import_block")]
    pub imports: Option<CodeBlock<Value>>,
    #[serde(default, deserialize_with = "entry_list")]
    pub functions: Vec<CodeBlock<FunctionEntry>>,
    #[serde(default, deserialize_with = "entry_list")]
    pub classes: Vec<CodeBlock<ClassEntry>>,
    #[serde(default, deserialize_with = "entry_list")]
    pub interfaces: Vec<CodeBlock<InterfaceEntry>>,
}

impl ContextDocument {
    pub fn into_record(self) -> ExtractionRecord {
        let imports = self
            .imports
            .map(|block| block.code)
            .filter(|code| !code.trim().is_empty());
        ExtractionRecord {
            source_path: self.metadata.path.unwrap_or_default(),
            classes: self.classes.into_iter().map(|b| b.metadata).collect(),
            interfaces: self.interfaces.into_iter().map(|b| b.metadata).collect(),
            functions: self.functions.into_iter().map(|b| b.metadata).collect(),
            imports,
        }
    }
}

/// Parse one serialized record, detecting the shape from its keys.
///
/// `origin` only labels errors (usually the record file path).
pub fn parse_record(text: &str, origin: &str) -> GraphResult<ExtractionRecord> {
    let value: Value = serde_json::from_str(text)?;
    let obj = match &value {
        Value::Object(obj) => obj,
        _ => return Err(GraphError::malformed(origin, "expected a JSON object")),
    };
    if obj.contains_key("sourcePath") {
        return Ok(serde_json::from_value(value)?);
    }
    if obj.contains_key("error") && !obj.contains_key("metadata") {
        let reason = obj
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("upstream analysis failed");
        return Err(GraphError::malformed(origin, format!("error report: {reason}")));
    }
    if obj.contains_key("metadata") {
        let doc: ContextDocument = serde_json::from_value(value)?;
        return Ok(doc.into_record());
    }
    Err(GraphError::malformed(
        origin,
        "neither an extraction record nor a context document",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_record() {
        let text = r##"{
            "sourcePath": "/src/a.h",
            "classes": [{"name": "Shape", "extends": "Base", "dependencies": ["Vector"]}],
            "functions": [{"name": "Area", "parent": "Shape"}],
            "imports": "#include \"b.h\""
        }"##;
        let record = parse_record(text, "a.json").unwrap();
        assert_eq!(record.source_path, "/src/a.h");
        assert_eq!(record.classes[0].extends, vec!["Base"]);
        assert_eq!(record.classes[0].dependencies, vec!["Vector"]);
        assert_eq!(record.functions[0].declared_parent(), Some("Shape"));
        assert_eq!(record.imports.as_deref(), Some("#include \"b.h\""));
    }

    #[test]
    fn test_parse_context_document() {
        let text = r##"{
            "metadata": {"path": "/v8/src/heap/heap.h", "file_name": "heap.h", "language": "C++"},
            "dependencies": [{"type": "class", "metadata": {"name": "Isolate"}, "code": ""}],
            "imports": {"metadata": {"language": "C++"}, "code": "#include <vector>\n#include \"src/base/macros.h\""},
            "classes": [{
                "metadata": {"name": "Heap", "implements": ["Visitor"], "methods": ["Setup", {"name": "TearDown"}]},
                "code": "class Heap {};"
            }],
            "interfaces": [{
                "metadata": {"name": "Visitor", "extends": ["ObjectVisitor", "RootVisitor"]},
                "code": ""
            }],
            "functions": [{"metadata": {"type": "method", "name": "Setup", "parent": "Heap", "dependencies": ["Isolate"]}, "code": ""}]
        }"##;
        let record = parse_record(text, "heap.h.context").unwrap();
        assert_eq!(record.source_path, "/v8/src/heap/heap.h");
        assert_eq!(record.classes[0].declared_name(), Some("Heap"));
        let methods: Vec<_> = record.classes[0]
            .methods
            .iter()
            .filter_map(|m| m.declared_name())
            .collect();
        assert_eq!(methods, vec!["Setup", "TearDown"]);
        assert_eq!(record.interfaces[0].extends, vec!["ObjectVisitor", "RootVisitor"]);
        assert_eq!(record.functions[0].dependencies, vec!["Isolate"]);
        assert!(record.imports.unwrap().contains("src/base/macros.h"));
    }

    #[test]
    fn test_broken_metadata_yields_nameless_entry() {
        let text = r#"{
            "metadata": {"path": "/a.cc"},
            "classes": [{"metadata": {"error": "JSON parsing error in metadata", "raw_text": "{"}, "code": ""}]
        }"#;
        let record = parse_record(text, "a.cc.context").unwrap();
        assert_eq!(record.classes.len(), 1);
        assert_eq!(record.classes[0].declared_name(), None);
    }

    #[test]
    fn test_bad_entry_keeps_rest_of_record() {
        let text = r#"{
            "sourcePath": "/a.h",
            "classes": [{"name": "Good"}, {"name": 42}, "junk", 7],
            "functions": [{"name": "Run", "parent": ["X"]}, {"name": "Stop", "dependencies": 5}]
        }"#;
        let record = parse_record(text, "a.json").unwrap();
        let classes: Vec<_> = record
            .classes
            .iter()
            .filter_map(ClassEntry::declared_name)
            .collect();
        assert_eq!(classes, vec!["Good"]);
        assert_eq!(record.functions.len(), 2);
        assert_eq!(record.functions[0].declared_name(), Some("Run"));
        assert_eq!(record.functions[0].declared_parent(), None);
        assert!(record.functions[1].dependencies.is_empty());
    }

    #[test]
    fn test_bad_block_keeps_rest_of_document() {
        let text = r#"{
            "metadata": {"path": "/a.cc"},
            "imports": "include text",
            "classes": [{"metadata": {"name": "Good"}, "code": ""}, 7, {"metadata": {"name": "Odd"}, "code": 3}],
            "functions": [{"metadata": {"name": "Run", "parent": ["X"]}, "code": ""}]
        }"#;
        let record = parse_record(text, "a.cc.context").unwrap();
        let classes: Vec<_> = record
            .classes
            .iter()
            .filter_map(ClassEntry::declared_name)
            .collect();
        assert_eq!(classes, vec!["Good", "Odd"]);
        assert_eq!(record.functions[0].declared_parent(), None);
        assert_eq!(record.imports.as_deref(), Some("include text"));
    }

    #[test]
    fn test_lenient_lists() {
        let entry: ClassEntry = serde_json::from_str(
            r#"{"name": " A ", "extends": null, "implements": "I", "dependencies": ["B", 3, "", {"x": 1}]}"#,
        )
        .unwrap();
        assert_eq!(entry.declared_name(), Some("A"));
        assert!(entry.extends.is_empty());
        assert_eq!(entry.implements, vec!["I"]);
        assert_eq!(entry.dependencies, vec!["B"]);
    }

    #[test]
    fn test_blank_imports_dropped() {
        let text = r#"{"metadata": {"path": "/a.cc"}, "imports": {"metadata": {}, "code": "   "}}"#;
        let record = parse_record(text, "a.cc.context").unwrap();
        assert!(record.imports.is_none());
    }

    #[test]
    fn test_error_report_rejected() {
        let text = r#"{"file_path": "/a.cc", "error": "Prompt blocked by API"}"#;
        let err = parse_record(text, "a.cc.error.json").unwrap_err();
        assert!(matches!(err, GraphError::MalformedRecord { .. }));
        assert!(err.to_string().contains("Prompt blocked"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            parse_record("[1, 2]", "x.json"),
            Err(GraphError::MalformedRecord { .. })
        ));
        assert!(matches!(parse_record("{", "x.json"), Err(GraphError::Json(_))));
    }
}
