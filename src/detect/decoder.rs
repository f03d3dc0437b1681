//! Raw tensor to detection decoding.
//!
//! One decode call turns a `[1, N, D]` output view into scored, labeled
//! boxes in source-frame pixel coordinates. Proposals are emitted in tensor
//! order; no sorting, no deduplication, and deliberately no non-maximum
//! suppression, so detection counts stay comparable with the model's raw
//! output. Adding NMS would change observable counts and is treated as a
//! behavior change, not a fix.

use crate::detect::tensor::{OutputView, RECORD_FIXED_FIELDS};

/// Axis-aligned box in source-frame pixels.
///
/// Width and height can come out zero or negative for proposals clipped at
/// the frame edge. Consumers treat those as zero-area boxes, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// One decoded detection. Created per frame, never persisted.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Objectness of the proposal, in `[0, 1]`.
    pub confidence: f32,
    /// Class name, or the decimal class index when the name list is short.
    pub label: String,
}

/// Scale factors from the model's square input space back to frame pixels.
#[derive(Clone, Copy, Debug)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    /// Frame dimensions over the model's fixed reference size.
    pub fn for_frame(frame_width: u32, frame_height: u32, reference_size: u32) -> Self {
        Self {
            x: frame_width as f32 / reference_size as f32,
            y: frame_height as f32 / reference_size as f32,
        }
    }
}

/// Decoder configured with the ordered class-name list.
#[derive(Clone, Debug)]
pub struct Decoder {
    class_names: Vec<String>,
}

impl Decoder {
    pub fn new(class_names: Vec<String>) -> Self {
        Self { class_names }
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Decode every proposal at or above `threshold`.
    ///
    /// Proposals below the threshold are skipped before any box or class
    /// work happens; with thousands of proposals and few survivors this
    /// early exit is the dominant cost saving.
    pub fn decode(
        &self,
        view: &OutputView<'_>,
        scale: Scale,
        frame_width: u32,
        frame_height: u32,
        threshold: f32,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();
        for i in 0..view.proposals() {
            let record = view.record(i);
            let objectness = record[4];
            if objectness < threshold {
                continue;
            }

            let cx = record[0] * scale.x;
            let cy = record[1] * scale.y;
            let w = record[2] * scale.x;
            let h = record[3] * scale.y;

            let mut left = (cx - w / 2.0) as i32;
            let mut top = (cy - h / 2.0) as i32;
            let mut width = w as i32;
            let mut height = h as i32;

            left = left.max(0);
            top = top.max(0);
            width = width.min(frame_width as i32 - left);
            height = height.min(frame_height as i32 - top);

            detections.push(Detection {
                bbox: BoundingBox {
                    x: left,
                    y: top,
                    w: width,
                    h: height,
                },
                confidence: objectness,
                label: self.resolve_label(record),
            });
        }
        detections
    }

    /// Pick the class with the highest score, first-seen wins on ties.
    ///
    /// Scores are compared with strict `>` against a starting max of zero,
    /// so a record whose scores are all <= 0 keeps class index -1 and falls
    /// through to the numeric fallback label.
    fn resolve_label(&self, record: &[f32]) -> String {
        let mut max_score = 0.0f32;
        let mut cls_id: i32 = -1;
        for (offset, &score) in record[RECORD_FIXED_FIELDS..].iter().enumerate() {
            if score > max_score {
                max_score = score;
                cls_id = offset as i32;
            }
        }
        match usize::try_from(cls_id).ok().and_then(|id| self.class_names.get(id)) {
            Some(name) => name.clone(),
            None => cls_id.to_string(),
        }
    }
}
