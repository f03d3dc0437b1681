//! Inference backends.
//!
//! A backend owns preprocessing and model execution; the rest of the crate
//! only ever sees the raw `[1, N, D]` detection output. The stub backend
//! exists for tests, `backend-tract` adds real ONNX inference.

mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Raw detection output, logical shape `[1, proposals, record_len]`.
#[derive(Clone, Debug)]
pub struct RawOutput {
    pub data: Vec<f32>,
    pub proposals: usize,
    pub record_len: usize,
}

impl RawOutput {
    /// Build an output from explicit proposal records. All records must
    /// share one length.
    pub fn from_records(records: &[&[f32]]) -> Result<Self> {
        let record_len = records
            .first()
            .map(|r| r.len())
            .ok_or_else(|| anyhow!("at least one record is required"))?;
        let mut data = Vec::with_capacity(records.len() * record_len);
        for record in records {
            if record.len() != record_len {
                return Err(anyhow!(
                    "record length {} differs from first record length {}",
                    record.len(),
                    record_len
                ));
            }
            data.extend_from_slice(record);
        }
        Ok(Self {
            data,
            proposals: records.len(),
            record_len,
        })
    }
}

/// Model inference seam.
///
/// Implementations must treat the frame as read-only and must not retain it
/// beyond the `infer` call. Inference latency is external and unbounded; the
/// detection loop deliberately imposes no timeout on it.
pub trait InferenceBackend: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Side length of the model's square input space.
    fn reference_size(&self) -> u32;

    /// Preprocess the frame and run the model.
    fn infer(&mut self, frame: &Frame) -> Result<RawOutput>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
