#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::frame::Frame;
use crate::infer::{InferenceBackend, RawOutput};

/// Tract-based ONNX backend.
///
/// Loads a local detection model (YOLOv5-style `[1, N, D]` output) and runs
/// inference on RGB frames. Frames are resized to the model's square input
/// space with nearest-neighbor sampling and normalized to `[0, 1]` NCHW.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    reference_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, reference_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = reference_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            reference_size,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.is_empty() {
            return Err(anyhow!("cannot build model input from an empty frame"));
        }

        let side = self.reference_size as usize;
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let pixels = frame.pixels();

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, side, side),
            |(_, channel, y, x)| {
                let src_x = (x * src_w / side).min(src_w - 1);
                let src_y = (y * src_h / side).min(src_h - 1);
                let idx = (src_y * src_w + src_x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn extract_output(&self, outputs: TVec<TValue>) -> Result<RawOutput> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let shape = output.shape();
        let (proposals, record_len) = match shape {
            [1, n, d] => (*n, *d),
            _ => return Err(anyhow!("unexpected output shape {:?}, want [1, N, D]", shape)),
        };
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let data: Vec<f32> = view.iter().copied().collect();

        Ok(RawOutput {
            data,
            proposals,
            record_len,
        })
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn reference_size(&self) -> u32 {
        self.reference_size
    }

    fn infer(&mut self, frame: &Frame) -> Result<RawOutput> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_output(outputs)
    }
}
