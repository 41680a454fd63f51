//! The tokenizer/IDF collaborator contract, plus a reference implementation.
//!
//! This crate does not ship a production NLP pipeline — the original
//! `simhash` package leaned on `jieba` for Chinese segmentation and a
//! stop-word list, both out of scope here. What's kept is the shape of
//! the contract: something that turns text into tokens, and something
//! that turns a token into a weight.

use std::collections::HashMap;

use regex::Regex;

/// Turns free text into a sequence of tokens. Implementations decide what
/// counts as a token (words, n-grams, morphemes, ...); the only contract is
/// determinism for a given input.
pub trait Tokenize: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits on Unicode word boundaries and lowercases. Adequate for
/// demonstrating the `(token, weight) -> Fingerprint` contract end to end;
/// not a substitute for a real tokenizer.
pub struct WordBoundaryTokenizer {
    word: Regex,
}

impl Default for WordBoundaryTokenizer {
    fn default() -> Self {
        Self {
            // \w matches [0-9A-Za-z_] plus Unicode word chars under the
            // `unicode-perl` behavior regex enables by default.
            word: Regex::new(r"[\w]+").expect("static pattern"),
        }
    }
}

impl Tokenize for WordBoundaryTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }
}

/// Default IDF weight assigned to a token with no entry in the dictionary,
/// matching the reference implementation's `idf_dic.get(i, 5)`.
pub const DEFAULT_IDF_WEIGHT: f64 = 5.0;

/// A `token -> idf weight` dictionary with a fallback for unknown tokens.
#[derive(Debug, Clone)]
pub struct IdfWeights {
    weights: HashMap<String, f64>,
    default_weight: f64,
}

impl Default for IdfWeights {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: DEFAULT_IDF_WEIGHT,
        }
    }
}

impl IdfWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_weight(default_weight: f64) -> Self {
        Self {
            weights: HashMap::new(),
            default_weight,
        }
    }

    pub fn insert(&mut self, token: impl Into<String>, weight: f64) {
        self.weights.insert(token.into(), weight);
    }

    /// Looks up `token`, falling back to the default weight (5.0 unless
    /// overridden) for anything not in the dictionary.
    pub fn weight(&self, token: &str) -> f64 {
        self.weights
            .get(token)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Parses the `write_idf_dic`/`load_idf_dic` text layout from the
    /// reference implementation: one `token weight` pair per line,
    /// space-separated.
    pub fn parse(text: &str) -> Self {
        let mut dic = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((token, weight)) = line.rsplit_once(' ') {
                if let Ok(w) = weight.trim().parse::<f64>() {
                    dic.insert(token, w);
                }
            }
        }
        dic
    }
}
