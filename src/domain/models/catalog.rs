use serde_json::Value;

use crate::domain::DomainError;

/// Raw metadata document returned by a catalog search.
///
/// Only the part holding item links is ever interpreted; the body is kept
/// verbatim so that analysis can forward it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDocument {
    body: String,
}

impl CatalogDocument {
    pub fn from_body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Parse the body as JSON.
    pub fn parse(&self) -> Result<Value, DomainError> {
        serde_json::from_str(&self.body)
            .map_err(|err| DomainError::parse(format!("catalog body is not JSON: {err}")))
    }
}

/// Walk `path` through nested JSON objects, returning `None` as soon as a
/// segment is missing or the current value is not an object.
pub fn lookup_path<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |current, segment| current.as_object()?.get(segment.as_ref()))
}

/// Query parameters sent to the catalog search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub query: Option<String>,
    pub mission: Option<String>,
    pub target: Option<String>,
    pub media_type: Option<String>,
    pub rows: usize,
    pub rows_param: String,
    pub format: Option<String>,
}

impl CatalogQuery {
    /// Ordered `(name, value)` pairs, skipping unset fields.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let optional = [
            ("q", &self.query),
            ("mission", &self.mission),
            ("target", &self.target),
            ("media_type", &self.media_type),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((name.to_string(), value.to_string()));
            }
        }
        params.push((self.rows_param.clone(), self.rows.to_string()));
        if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
            params.push(("wt".to_string(), format.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_tolerates_missing_levels() {
        let doc = json!({ "collection": { "items": [1, 2] } });

        assert_eq!(
            lookup_path(&doc, &["collection", "items"]),
            Some(&json!([1, 2]))
        );
        assert!(lookup_path(&doc, &["collection", "missing"]).is_none());
        assert!(lookup_path(&doc, &["collection", "items", "deeper"]).is_none());
        assert_eq!(lookup_path::<&str>(&doc, &[]), Some(&doc));
    }

    #[test]
    fn params_skip_blank_fields() {
        let query = CatalogQuery {
            query: None,
            mission: Some("Mars Science Laboratory".into()),
            target: Some("Mars".into()),
            media_type: Some("  ".into()),
            rows: 3,
            rows_param: "rows".into(),
            format: Some("json".into()),
        };

        assert_eq!(
            query.to_params(),
            vec![
                ("mission".to_string(), "Mars Science Laboratory".to_string()),
                ("target".to_string(), "Mars".to_string()),
                ("rows".to_string(), "3".to_string()),
                ("wt".to_string(), "json".to_string()),
            ]
        );
    }

    #[test]
    fn parse_reports_malformed_bodies() {
        let doc = CatalogDocument::from_body("<html>oops</html>");
        assert!(matches!(doc.parse(), Err(DomainError::Parse(_))));
    }
}
