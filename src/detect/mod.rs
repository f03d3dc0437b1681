mod decoder;
mod tensor;

pub use decoder::{BoundingBox, Decoder, Detection, Scale};
pub use tensor::{OutputView, RECORD_FIXED_FIELDS};
