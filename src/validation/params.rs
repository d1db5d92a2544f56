use serde_json::{Map, Value};

/// Single lookup view over a request's parameter sources.
///
/// The convert endpoint accepts parameters both at the top level of the
/// manifest and inside an optional `formdata` sub-object. Rules reference a
/// field by dot-path without caring which source carried it, so the sources
/// are merged once per request before any rule runs. Merging is shallow:
/// later sources override earlier ones per top-level key, with `formdata`
/// merged last.
#[derive(Debug, Clone, Default)]
pub struct ResolvedParams {
    merged: Map<String, Value>,
}

impl ResolvedParams {
    pub fn new(parameters: Map<String, Value>) -> Self {
        Self { merged: parameters }
    }

    /// Merge sources in fixed precedence order (first = lowest).
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut merged = Map::new();
        for source in sources {
            for (key, value) in source {
                merged.insert(key, value);
            }
        }
        Self { merged }
    }

    /// Resolve a dot-separated path into the merged view.
    ///
    /// A missing or non-object intermediate segment resolves to `None`; the
    /// traversal never fails.
    pub fn resolve(&self, key_path: &str) -> Option<&Value> {
        let mut segments = key_path.split('.').map(str::trim);
        let mut current = self.merged.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    /// Maximum nesting depth across all entries (an empty view has depth 0,
    /// a flat map depth 1).
    pub fn depth(&self) -> usize {
        self.merged
            .values()
            .map(value_depth)
            .max()
            .map(|d| d + 1)
            .unwrap_or(0)
    }
}

fn value_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(value_depth).max().map(|d| d + 1).unwrap_or(1),
        Value::Array(items) => items.iter().map(value_depth).max().map(|d| d + 1).unwrap_or(1),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn resolve_top_level_and_nested() {
        let params = ResolvedParams::new(as_map(json!({
            "pdf-standard": "A4",
            "resize": {"width": 300, "height": 200}
        })));

        assert_eq!(params.resolve("pdf-standard"), Some(&json!("A4")));
        assert_eq!(params.resolve("resize.width"), Some(&json!(300)));
    }

    #[test]
    fn resolve_missing_intermediate_is_none() {
        let params = ResolvedParams::new(as_map(json!({"resize": {"width": 300}})));

        assert_eq!(params.resolve("crop.x"), None);
        assert_eq!(params.resolve("resize.width.px"), None);
        assert_eq!(params.resolve("resize.height"), None);
    }

    #[test]
    fn later_sources_override_earlier() {
        let params = ResolvedParams::from_sources([
            as_map(json!({"quality": "low", "rotate": 90})),
            as_map(json!({"quality": "high"})),
        ]);

        assert_eq!(params.resolve("quality"), Some(&json!("high")));
        assert_eq!(params.resolve("rotate"), Some(&json!(90)));
    }

    #[test]
    fn depth_counts_nesting() {
        assert_eq!(ResolvedParams::default().depth(), 0);
        assert_eq!(ResolvedParams::new(as_map(json!({"a": 1}))).depth(), 1);
        assert_eq!(
            ResolvedParams::new(as_map(json!({"a": {"b": {"c": 1}}}))).depth(),
            3
        );
    }
}
