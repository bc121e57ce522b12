use serde::{Deserialize, Serialize};

use crate::utils::Normalize;

/// A fixed-length vector produced by an embedding model.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl From<Vec<f32>> for Embedding {
    fn from(value: Vec<f32>) -> Self {
        Self(value)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(value: Embedding) -> Self {
        value.0
    }
}

impl Normalize for Embedding {
    fn normalized(&self) -> Self {
        Self(self.0.normalized())
    }
}

impl Embedding {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Whether every component is finite. NaN and infinities cannot be persisted.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }

    /// Inner product. Callers must ensure both sides have the same length.
    pub fn dot(&self, rhs: &Embedding) -> f32 {
        debug_assert_eq!(self.len(), rhs.len());
        self.0.iter().zip(rhs.0.iter()).map(|(x, y)| x * y).sum()
    }

    pub fn cosine(&self, rhs: &Embedding) -> f32 {
        self.normalized().dot(&rhs.normalized())
    }
}
