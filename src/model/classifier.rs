//! Car Classifier
//!
//! Transfer-learning classifier: the convolutional feature extractor feeds a
//! dense head with swish activations and dropout regularization. The head
//! narrows 1024 -> 512 -> 256 -> 128 -> 64 before the class logits.

use burn::{
    config::Config,
    module::Module,
    nn::{BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig},
    tensor::{activation, backend::Backend, Tensor},
};

use crate::model::extractor::{ExtractorConfig, FeatureExtractor};
use crate::model::swish;

/// Configuration for the car classifier
#[derive(Config, Debug)]
pub struct CarClassifierConfig {
    /// Number of output classes
    #[config(default = "4")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "300")]
    pub image_size: usize,

    /// Dropout rate applied twice in the head
    #[config(default = "0.25")]
    pub dropout_rate: f64,

    /// Backbone configuration
    pub extractor: ExtractorConfig,
}

impl Default for CarClassifierConfig {
    fn default() -> Self {
        Self::new(ExtractorConfig::new())
    }
}

impl CarClassifierConfig {
    /// Initialize the classifier with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> CarClassifier<B> {
        self.init_with(self.extractor.init(device), device)
    }

    /// Initialize the classifier on top of an existing extractor
    ///
    /// Used for transfer learning: load the extractor's pretrained weights
    /// first, then attach the fresh head.
    pub fn init_with<B: Backend>(
        &self,
        extractor: FeatureExtractor<B>,
        device: &B::Device,
    ) -> CarClassifier<B> {
        let features = extractor.out_channels();

        CarClassifier {
            extractor,
            feature_norm: BatchNormConfig::new(features).init(device),
            fc1: LinearConfig::new(features, 1024).init(device),
            dropout1: DropoutConfig::new(self.dropout_rate).init(),
            fc2: LinearConfig::new(1024, 512).init(device),
            dropout2: DropoutConfig::new(self.dropout_rate).init(),
            fc3: LinearConfig::new(512, 256).init(device),
            fc4: LinearConfig::new(256, 128).init(device),
            fc5: LinearConfig::new(128, 64).init(device),
            output: LinearConfig::new(64, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

/// Car classifier: extractor backbone plus dense head
#[derive(Module, Debug)]
pub struct CarClassifier<B: Backend> {
    pub extractor: FeatureExtractor<B>,

    // Normalizes the pooled features before the head
    pub feature_norm: BatchNorm<B, 2>,

    pub fc1: Linear<B>,
    pub dropout1: Dropout,
    pub fc2: Linear<B>,
    pub dropout2: Dropout,
    pub fc3: Linear<B>,
    pub fc4: Linear<B>,
    pub fc5: Linear<B>,
    pub output: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> CarClassifier<B> {
    /// Forward pass
    ///
    /// Input `[batch_size, 3, height, width]`, output logits
    /// `[batch_size, num_classes]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.extractor.forward(x);
        let x = self.feature_norm.forward(x);

        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = swish(self.fc1.forward(x));
        let x = self.dropout1.forward(x);
        let x = swish(self.fc2.forward(x));
        let x = self.dropout2.forward(x);
        let x = swish(self.fc3.forward(x));
        let x = swish(self.fc4.forward(x));
        let x = swish(self.fc5.forward(x));

        self.output.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        activation::softmax(self.forward(x), 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
