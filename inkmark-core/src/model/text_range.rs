use serde::{Deserialize, Serialize};

/// Half-open range of flattened-text character offsets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_offset: usize,
    pub end_offset: usize,
}

impl TextRange {
    /// Build a range from two offsets in either order
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start_offset: start.min(end),
            end_offset: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset >= self.end_offset
    }

    /// Check if this range contains the given offset
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.end_offset
    }

    /// Ranges overlap or share an endpoint
    pub fn touches(&self, other: &TextRange) -> bool {
        other.start_offset <= self.end_offset && self.start_offset <= other.end_offset
    }

    pub fn union(&self, other: &TextRange) -> TextRange {
        TextRange {
            start_offset: self.start_offset.min(other.start_offset),
            end_offset: self.end_offset.max(other.end_offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_orders_offsets() {
        let range = TextRange::new(9, 4);
        assert_eq!(range.start_offset, 4);
        assert_eq!(range.end_offset, 9);
        assert_eq!(range.len(), 5);
    }

    #[test]
    fn test_touching_ranges() {
        let a = TextRange::new(5, 10);
        assert!(a.touches(&TextRange::new(10, 12)));
        assert!(a.touches(&TextRange::new(0, 5)));
        assert!(!a.touches(&TextRange::new(11, 12)));
        assert_eq!(a.union(&TextRange::new(8, 15)), TextRange::new(5, 15));
    }

    #[test]
    fn test_camel_case_fields() {
        let json = serde_json::to_string(&TextRange::new(4, 9)).unwrap();
        assert_eq!(json, r#"{"startOffset":4,"endOffset":9}"#);
    }
}
