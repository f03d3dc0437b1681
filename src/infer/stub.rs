use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::infer::{InferenceBackend, RawOutput};

/// Scripted backend for tests. Each `infer` call pops the next scripted
/// step; an exhausted script yields a quiet output (one all-zero proposal)
/// so the loop keeps cycling without publishing.
pub struct StubBackend {
    reference_size: u32,
    script: VecDeque<Result<RawOutput, String>>,
}

impl StubBackend {
    pub fn new(reference_size: u32) -> Self {
        Self {
            reference_size,
            script: VecDeque::new(),
        }
    }

    /// Queue an output for a future cycle.
    pub fn push_output(&mut self, output: RawOutput) {
        self.script.push_back(Ok(output));
    }

    /// Queue an inference failure for a future cycle.
    pub fn push_failure(&mut self, message: &str) {
        self.script.push_back(Err(message.to_string()));
    }

    fn quiet_output() -> RawOutput {
        RawOutput {
            data: vec![0.0; 8],
            proposals: 1,
            record_len: 8,
        }
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn reference_size(&self) -> u32 {
        self.reference_size
    }

    fn infer(&mut self, _frame: &Frame) -> Result<RawOutput> {
        match self.script.pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Ok(Self::quiet_output()),
        }
    }
}
