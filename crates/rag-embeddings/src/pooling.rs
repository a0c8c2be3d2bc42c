//! Attention-masked mean pooling.

use crate::error::EmbeddingError;
use crate::model::HiddenStates;

/// Average the hidden vectors of every position whose mask value is 1.
///
/// Only the first batch row is pooled. Padding positions (mask 0) are
/// skipped entirely, so the result does not depend on how much padding the
/// unit carries.
pub fn mean_pool(
    hidden: &HiddenStates,
    attention_mask: &[u32],
) -> Result<Vec<f32>, EmbeddingError> {
    let expected = hidden.batch * hidden.seq_len * hidden.hidden_size;
    if hidden.batch == 0 || hidden.data.len() != expected {
        return Err(EmbeddingError::ShapeMismatch(format!(
            "hidden state holds {} values, dims [{}, {}, {}]",
            hidden.data.len(),
            hidden.batch,
            hidden.seq_len,
            hidden.hidden_size
        )));
    }
    if attention_mask.len() != hidden.seq_len {
        return Err(EmbeddingError::ShapeMismatch(format!(
            "attention mask length {} != sequence length {}",
            attention_mask.len(),
            hidden.seq_len
        )));
    }

    let mut pooled = vec![0.0f32; hidden.hidden_size];
    let mut valid = 0usize;

    for (position, _) in attention_mask.iter().enumerate().filter(|&(_, &m)| m == 1) {
        for (acc, value) in pooled.iter_mut().zip(hidden.row(0, position)) {
            *acc += value;
        }
        valid += 1;
    }

    if valid == 0 {
        return Err(EmbeddingError::NoValidTokens);
    }

    let count = valid as f32;
    for value in &mut pooled {
        *value /= count;
    }
    Ok(pooled)
}
