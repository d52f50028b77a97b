use crate::error::{AppError, Result};
use crate::ml::models::{FeatureConfig, SparseVector};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Tokens are runs of two or more word characters
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// TF-IDF vectorizer over word n-grams.
///
/// The vocabulary and IDF weights are learned once by [`fit`](Self::fit) and
/// frozen; [`transform`](Self::transform) ignores any n-gram outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtractor {
    /// Configuration
    config: FeatureConfig,

    /// Vocabulary mapping (term -> column)
    vocabulary: HashMap<String, usize>,

    /// Smoothed IDF per column
    idf: Vec<f64>,

    /// Number of documents seen by fit
    n_documents: usize,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            n_documents: 0,
            is_fitted: false,
        }
    }

    /// Fit the vocabulary and IDF weights on a corpus
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<()> {
        let (lo, hi) = self.config.ngram_range;
        if lo == 0 || lo > hi {
            return Err(AppError::Configuration(format!(
                "invalid n-gram range ({lo}, {hi})"
            )));
        }
        if texts.is_empty() {
            return Err(AppError::DataShape(
                "cannot fit feature extractor on an empty corpus".to_string(),
            ));
        }

        let n_docs = texts.len();

        // Document frequency per term
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let unique: HashSet<String> = self.extract_terms(text.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_df = (self.config.max_df * n_docs as f64).floor().max(1.0) as usize;
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.config.min_df && *df <= max_df)
            .collect();

        // Highest document frequency first, ties broken lexicographically
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(self.config.max_features);

        // Columns follow lexicographic term order
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let n = n_docs as f64;
        self.idf = kept
            .iter()
            .map(|(_, df)| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();
        self.vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();
        self.n_documents = n_docs;
        self.is_fitted = true;

        tracing::debug!(
            vocab_size = self.vocabulary.len(),
            n_documents = n_docs,
            "Feature extractor fitted"
        );

        Ok(())
    }

    /// Transform one text into an L2-normalized TF-IDF row
    pub fn transform_one(&self, text: &str) -> Result<SparseVector> {
        if !self.is_fitted {
            return Err(AppError::NotReady(
                "FeatureExtractor must be fitted before transform".to_string(),
            ));
        }

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.extract_terms(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut indices = Vec::with_capacity(counts.len());
        let mut values = Vec::with_capacity(counts.len());
        for (idx, tf) in counts {
            indices.push(idx);
            values.push(tf * self.idf[idx]);
        }

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }

        Ok(SparseVector::new(indices, values))
    }

    /// Transform a batch of texts
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<SparseVector>> {
        texts.iter().map(|t| self.transform_one(t.as_ref())).collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<Vec<SparseVector>> {
        self.fit(texts)?;
        self.transform(texts)
    }

    /// Extract n-gram terms from text after stop-word removal
    fn extract_terms(&self, text: &str) -> Vec<String> {
        let tokens = TextPreprocessor::tokenize(text);
        let (lo, hi) = self.config.ngram_range;

        let mut terms = Vec::new();
        for n in lo..=hi {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else {
                for window in tokens.windows(n) {
                    terms.push(window.join(" "));
                }
            }
        }

        terms
    }

    /// Terms with the lowest IDF (the most widespread), for reporting
    pub fn top_features(&self, k: usize) -> Vec<String> {
        let mut terms: Vec<(&String, f64)> = self
            .vocabulary
            .iter()
            .map(|(term, &idx)| (term, self.idf[idx]))
            .collect();
        terms.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        terms.into_iter().take(k).map(|(t, _)| t.clone()).collect()
    }

    /// Get number of features (vocabulary columns)
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Check if fitted
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Get vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Check that the vocabulary and IDF table describe the same columns
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        if !self.is_fitted {
            return Err("vectorizer is not fitted".to_string());
        }
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} IDF weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }

        let mut seen = vec![false; self.idf.len()];
        for (term, &idx) in &self.vocabulary {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => return Err(format!("column {idx} is assigned twice ('{term}')")),
                None => return Err(format!("term '{term}' maps to column {idx} out of range")),
            }
        }
        if let Some(w) = self.idf.iter().find(|w| !w.is_finite()) {
            return Err(format!("non-finite IDF weight {w}"));
        }
        Ok(())
    }

    /// Column of a term, if it is in the vocabulary
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}

/// Text preprocessing utilities
pub struct TextPreprocessor;

impl TextPreprocessor {
    /// Lowercase, split into word tokens, and drop English stop words
    pub fn tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|w| !STOP_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    }

    pub fn is_stop_word(word: &str) -> bool {
        STOP_WORDS.contains(word)
    }

    /// Normalize text (lowercase, trim)
    pub fn normalize(text: &str) -> String {
        text.to_lowercase().trim().to_string()
    }
}

/// Standard English stop-word list
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
    "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "Database connection timeout",
            "Connection to database failed",
            "Printer not responding to print jobs",
        ]
    }

    #[test]
    fn test_feature_extractor_creation() {
        let extractor = FeatureExtractor::new(FeatureConfig::default());

        assert!(!extractor.is_fitted());
        assert_eq!(extractor.vocab_size(), 0);
    }

    #[test]
    fn test_consistency_catches_out_of_range_column() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        assert!(extractor.check_consistency().is_err());

        extractor.fit(&corpus()).unwrap();
        assert!(extractor.check_consistency().is_ok());

        let n = extractor.n_features();
        extractor.vocabulary.insert("printer".to_string(), n + 5);
        assert!(extractor.check_consistency().is_err());
    }

    #[test]
    fn test_transform_before_fit_is_not_ready() {
        let extractor = FeatureExtractor::new(FeatureConfig::default());
        let err = extractor.transform_one("anything").unwrap_err();
        assert!(matches!(err, AppError::NotReady(_)));
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let tokens = TextPreprocessor::tokenize("Laptop won't boot, the black screen, a fan");
        assert_eq!(tokens, vec!["laptop", "won", "boot", "black", "screen", "fan"]);
        assert!(TextPreprocessor::is_stop_word("the"));
        assert!(!TextPreprocessor::is_stop_word("laptop"));
    }

    #[test]
    fn test_unigrams_and_bigrams_in_vocabulary() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        extractor.fit(&corpus()).unwrap();

        assert!(extractor.term_index("database").is_some());
        assert!(extractor.term_index("database connection").is_some());
        assert!(extractor.term_index("connection timeout").is_some());
        // stop words never enter the vocabulary
        assert!(extractor.term_index("to").is_none());
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        let rows = extractor.fit_transform(&corpus()).unwrap();

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!((row.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_out_of_vocabulary_contributes_nothing() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        extractor.fit(&corpus()).unwrap();

        let row = extractor.transform_one("zebra quantum").unwrap();
        assert!(row.is_empty());

        let empty = extractor.transform_one("").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_max_features_keeps_most_frequent_terms() {
        let config = FeatureConfig {
            max_features: 2,
            ..Default::default()
        };
        let mut extractor = FeatureExtractor::new(config);
        extractor.fit(&corpus()).unwrap();

        // "connection" and "database" each occur in two documents
        assert_eq!(extractor.vocab_size(), 2);
        assert_eq!(extractor.term_index("connection"), Some(0));
        assert_eq!(extractor.term_index("database"), Some(1));
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let config = FeatureConfig {
            min_df: 2,
            ..Default::default()
        };
        let mut extractor = FeatureExtractor::new(config);
        extractor.fit(&corpus()).unwrap();

        assert_eq!(extractor.vocab_size(), 2);
        assert!(extractor.term_index("printer").is_none());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let mut a = FeatureExtractor::new(FeatureConfig::default());
        let mut b = FeatureExtractor::new(FeatureConfig::default());
        let rows_a = a.fit_transform(&corpus()).unwrap();
        let rows_b = b.fit_transform(&corpus()).unwrap();

        assert_eq!(rows_a, rows_b);
        assert_eq!(a.top_features(5), b.top_features(5));
    }

    #[test]
    fn test_smoothed_idf() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        extractor.fit(&corpus()).unwrap();

        let shared = extractor.term_index("database").unwrap();
        let unique = extractor.term_index("printer").unwrap();
        let expected_shared = (4.0f64 / 3.0).ln() + 1.0;
        let expected_unique = (4.0f64 / 2.0).ln() + 1.0;
        assert!((extractor.idf[shared] - expected_shared).abs() < 1e-12);
        assert!((extractor.idf[unique] - expected_unique).abs() < 1e-12);
        assert_eq!(extractor.top_features(1).len(), 1);
    }

    #[test]
    fn test_invalid_ngram_range() {
        let config = FeatureConfig {
            ngram_range: (2, 1),
            ..Default::default()
        };
        let mut extractor = FeatureExtractor::new(config);
        assert!(matches!(
            extractor.fit(&corpus()),
            Err(AppError::Configuration(_))
        ));
    }
}
