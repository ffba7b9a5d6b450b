//! Offline hashing embedder.

use crate::embeddings::Embedder;
use compass_core::{AppError, AppResult};
use std::collections::BTreeMap;

/// Deterministic embedder built from hashed character trigrams.
///
/// Not semantic, but content-dependent and stable across runs, which makes
/// it usable without network access and in tests.
#[derive(Debug)]
pub struct TrigramEmbedder {
    dimensions: usize,
}

impl TrigramEmbedder {
    pub fn new(dimensions: usize) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "Trigram embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // Ordered so colliding slots always accumulate in the same order
        let mut frequencies: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1)
        {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &frequencies {
            let weight = (*freq as f32).sqrt();
            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let slot = hash_chars(window, 37) % self.dimensions as u64;
                vector[slot as usize] += weight;
            }

            let chars: Vec<char> = word.chars().collect();
            let slot = hash_chars(&chars, 31) % self.dimensions as u64;
            vector[slot as usize] += *freq as f32;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }

        vector
    }
}

fn hash_chars(chars: &[char], multiplier: u64) -> u64 {
    chars
        .iter()
        .fold(0u64, |acc, &c| acc.wrapping_mul(multiplier).wrapping_add(c as u64))
}

#[async_trait::async_trait]
impl Embedder for TrigramEmbedder {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
