use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Bidirectional mapping between string labels and class indices.
///
/// Classes are kept in sorted order so the index of a label never depends on
/// the order rows were seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the sorted set of distinct labels
    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<()> {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();

        if classes.is_empty() {
            return Err(AppError::DataShape(
                "cannot fit label encoder without labels".to_string(),
            ));
        }

        self.classes = classes;
        Ok(())
    }

    /// Build an encoder directly from a class list
    pub fn from_classes(mut classes: Vec<String>) -> Self {
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| AppError::Validation(format!("unknown label: {label}")))
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| AppError::Internal(format!("class index {index} out of range")))
    }

    /// Classes must be non-empty, sorted and distinct for lookups to work
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        if self.classes.is_empty() {
            return Err("encoder has no classes".to_string());
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!("classes {:?} are not sorted and distinct", self.classes));
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_are_sorted_and_unique() {
        let mut encoder = LabelEncoder::new();
        encoder
            .fit(&["network", "hardware", "network", "account"])
            .unwrap();

        assert_eq!(encoder.classes(), &["account", "hardware", "network"]);
        assert_eq!(encoder.encode("hardware").unwrap(), 1);
        assert_eq!(encoder.decode(2).unwrap(), "network");
    }

    #[test]
    fn test_unknown_label_and_index() {
        let encoder = LabelEncoder::from_classes(vec!["low".into(), "high".into()]);

        assert!(matches!(encoder.encode("medium"), Err(AppError::Validation(_))));
        assert!(encoder.decode(5).is_err());
        assert_eq!(encoder.encode_all(&["high", "low"]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_empty_fit_fails() {
        let mut encoder = LabelEncoder::new();
        let empty: [&str; 0] = [];
        assert!(encoder.fit(&empty).is_err());
        assert!(!encoder.is_fitted());
    }

    #[test]
    fn test_unsorted_classes_are_inconsistent() {
        assert!(LabelEncoder::from_classes(vec!["b".into(), "a".into()])
            .check_consistency()
            .is_ok());
        assert!(LabelEncoder::new().check_consistency().is_err());

        let encoder = LabelEncoder {
            classes: vec!["b".into(), "a".into()],
        };
        assert!(encoder.check_consistency().is_err());
    }
}
