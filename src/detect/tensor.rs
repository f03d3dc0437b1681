//! Indexed view over a raw detection tensor.
//!
//! The model output is a flat f32 buffer with logical shape `[1, N, D]`:
//! `N` candidate proposals, each a `D`-length record of
//! `[cx, cy, w, h, objectness, class_score_0 ..]`. Shape consistency is
//! checked once here so the decoder can walk records with plain slicing.

use anyhow::{anyhow, Result};

use crate::infer::RawOutput;

/// Record layout: box center/size plus objectness precede the class scores.
pub const RECORD_FIXED_FIELDS: usize = 5;

/// Borrowed `[1, N, D]` view with the shape validated at construction.
#[derive(Clone, Copy, Debug)]
pub struct OutputView<'a> {
    data: &'a [f32],
    proposals: usize,
    record_len: usize,
}

impl<'a> OutputView<'a> {
    pub fn new(raw: &'a RawOutput) -> Result<Self> {
        if raw.proposals > 0 && raw.record_len <= RECORD_FIXED_FIELDS {
            return Err(anyhow!(
                "proposal record length {} leaves no class scores",
                raw.record_len
            ));
        }
        let expected = raw
            .proposals
            .checked_mul(raw.record_len)
            .ok_or_else(|| anyhow!("detection output shape overflows"))?;
        if raw.data.len() != expected {
            return Err(anyhow!(
                "detection output holds {} values, shape [1, {}, {}] needs {}",
                raw.data.len(),
                raw.proposals,
                raw.record_len,
                expected
            ));
        }
        Ok(Self {
            data: &raw.data,
            proposals: raw.proposals,
            record_len: raw.record_len,
        })
    }

    /// Number of candidate proposals (`N`).
    pub fn proposals(&self) -> usize {
        self.proposals
    }

    /// Number of class scores per record (`D - 5`).
    pub fn class_count(&self) -> usize {
        self.record_len.saturating_sub(RECORD_FIXED_FIELDS)
    }

    /// One proposal record. `index` must be `< proposals()`; the shape check
    /// in `new` guarantees the slice is in bounds.
    pub fn record(&self, index: usize) -> &'a [f32] {
        let start = index * self.record_len;
        &self.data[start..start + self.record_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_accepts_a_proposal_free_output() {
        let raw = RawOutput {
            data: Vec::new(),
            proposals: 0,
            record_len: 8,
        };
        let view = OutputView::new(&raw).unwrap();
        assert_eq!(view.proposals(), 0);
    }

    #[test]
    fn view_rejects_length_mismatch() {
        let raw = RawOutput {
            data: vec![0.0; 15],
            proposals: 2,
            record_len: 8,
        };
        assert!(OutputView::new(&raw).is_err());
    }

    #[test]
    fn view_rejects_record_without_class_scores() {
        let raw = RawOutput {
            data: vec![0.0; 10],
            proposals: 2,
            record_len: 5,
        };
        assert!(OutputView::new(&raw).is_err());
    }

    #[test]
    fn records_index_in_proposal_order() {
        let mut data = vec![0.0f32; 16];
        data[0] = 1.0;
        data[8] = 2.0;
        let raw = RawOutput {
            data,
            proposals: 2,
            record_len: 8,
        };
        let view = OutputView::new(&raw).unwrap();
        assert_eq!(view.proposals(), 2);
        assert_eq!(view.class_count(), 3);
        assert_eq!(view.record(0)[0], 1.0);
        assert_eq!(view.record(1)[0], 2.0);
    }
}
