use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool advertised by the tool session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// One item of a tool call's content. Only text is consumed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: true,
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|item| match item {
            ContentItem::Text { text } => Some(text.as_str()),
            ContentItem::Other => None,
        })
    }

    pub fn first_text(&self) -> Option<&str> {
        self.texts().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_content() {
        let result: ToolCallResult = serde_json::from_str(
            r#"{"content":[{"type":"image","data":"..","mimeType":"image/png"},
                           {"type":"text","text":"hello"}],
                "isError":true}"#,
        )
        .unwrap();
        assert!(result.is_error);
        assert_eq!(result.content[0], ContentItem::Other);
        assert_eq!(result.first_text(), Some("hello"));
    }

    #[test]
    fn missing_fields_default() {
        let result: ToolCallResult = serde_json::from_str("{}").unwrap();
        assert!(!result.is_error);
        assert!(result.first_text().is_none());
    }
}
