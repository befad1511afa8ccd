use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HighlightColor, TextRange};

/// A colored highlight over a container's flattened text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: Uuid,
    pub container_id: String,
    #[serde(flatten)]
    pub range: TextRange,
    pub color: HighlightColor,
    #[serde(rename = "text")]
    pub source_text: String,
}

impl Annotation {
    pub fn new(
        container_id: impl Into<String>,
        range: TextRange,
        color: HighlightColor,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            container_id: container_id.into(),
            range,
            color,
            source_text: source_text.into(),
        }
    }

    pub fn start_offset(&self) -> usize {
        self.range.start_offset
    }

    pub fn end_offset(&self) -> usize {
        self.range.end_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_json_shape() {
        let ann = Annotation::new("p1", TextRange::new(4, 9), HighlightColor::Yellow, "quick");
        let json = serde_json::to_string(&ann).unwrap();

        assert!(json.contains("\"containerId\":\"p1\""));
        assert!(json.contains("\"startOffset\":4"));
        assert!(json.contains("\"endOffset\":9"));
        assert!(json.contains("\"color\":\"yellow\""));
        assert!(json.contains("\"text\":\"quick\""));
    }

    #[test]
    fn test_fresh_ids() {
        let a = Annotation::new("p1", TextRange::new(0, 1), HighlightColor::Green, "x");
        let b = Annotation::new("p1", TextRange::new(0, 1), HighlightColor::Green, "x");
        assert_ne!(a.id, b.id);
    }
}
