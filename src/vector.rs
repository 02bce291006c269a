//! Client-side vector helpers

/// Scale `vector` to unit L2 norm in place. Zero vectors are left as is.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Normalize every vector of a batch
pub fn normalize_all(vectors: &mut [Vec<f32>]) {
    for v in vectors.iter_mut() {
        normalize(v);
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
