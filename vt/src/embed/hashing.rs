//! Deterministic hashed term-frequency embedder

use async_trait::async_trait;
use std::collections::HashMap;

use super::{EmbedError, Embedder};

/// Hashes lowercase alphanumeric terms into fixed buckets and L2-normalizes
///
/// Texts sharing most of their words land close together, which is enough
/// for the cache to recognize rephrasings of the same question.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// FNV-1a
    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % dims as u64) as usize
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<String, f32> = HashMap::new();
        for token in Self::tokenize(text) {
            *counts.entry(token).or_default() += 1.0;
        }

        let mut vec = vec![0.0f32; self.dimensions];
        for (term, count) in &counts {
            vec[Self::bucket(term, self.dimensions)] += count;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vector(text))
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
