//! Model architectures
//!
//! - [`extractor`]: the convolutional feature extractor used as a frozen or
//!   fine-tuned backbone for transfer learning
//! - [`classifier`]: the car classifier (extractor plus dense head)
//! - [`matting`]: the alpha-matting network behind background removal

pub mod classifier;
pub mod extractor;
pub mod matting;

pub use classifier::{CarClassifier, CarClassifierConfig};
pub use extractor::{ConvBlock, ExtractorConfig, FeatureExtractor};
pub use matting::{MattingNet, MattingNetConfig, MattingRemover, MATTE_SIZE};

use burn::tensor::{activation, backend::Backend, Tensor};

/// Swish activation: `x * sigmoid(x)`
pub(crate) fn swish<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    activation::sigmoid(x.clone()) * x
}
