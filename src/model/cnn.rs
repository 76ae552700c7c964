//! CNN Model Architecture for Embedding Visualization
//!
//! Two convolution + pooling blocks followed by two fully connected layers.
//! The output of the first fully connected layer is exposed as the
//! embedding of each image, so the training loop can follow how the learned
//! representation moves from epoch to epoch.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::geometry::{LayerGeometry, CONV_STRIDE, POOL_STRIDE};

/// Configuration for the ConvNet model
#[derive(Config, Debug)]
pub struct ConvNetConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Size of the embedding produced by the first fully connected layer
    pub embedding_dim: usize,

    /// Input image width (images are square, single channel)
    #[config(default = "28")]
    pub image_width: usize,

    /// Channels of the first convolution
    #[config(default = "32")]
    pub conv1_channels: usize,

    /// Channels of the second convolution
    #[config(default = "64")]
    pub conv2_channels: usize,

    /// Kernel size of both convolutions
    #[config(default = "5")]
    pub conv_kernel: usize,

    /// Window of both pooling stages
    #[config(default = "2")]
    pub pool_kernel: usize,

    /// Dropout rate applied to the flattened conv features
    #[config(default = "0.5")]
    pub dropout: f64,
}

impl ConvNetConfig {
    /// Layer geometry implied by this configuration
    pub fn geometry(&self) -> LayerGeometry {
        LayerGeometry::derive(self.image_width, self.conv_kernel, self.pool_kernel)
    }

    /// Initialize a model on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        ConvNet::new(self, device)
    }
}

/// Convolution, ReLU and max pooling
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block with explicit paddings
    pub fn new(
        channels: [usize; 2],
        conv_kernel: usize,
        conv_padding: usize,
        pool_kernel: usize,
        pool_padding: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new(channels, [conv_kernel, conv_kernel])
            .with_stride([CONV_STRIDE, CONV_STRIDE])
            .with_padding(PaddingConfig2d::Explicit(conv_padding, conv_padding))
            .init(device);

        let pool = MaxPool2dConfig::new([pool_kernel, pool_kernel])
            .with_strides([POOL_STRIDE, POOL_STRIDE])
            .with_padding(PaddingConfig2d::Explicit(pool_padding, pool_padding))
            .init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Class scores and embeddings for a batch
#[derive(Debug, Clone)]
pub struct ClassifierOutput<B: Backend> {
    /// Shape [batch_size, num_classes]
    pub logits: Tensor<B, 2>,
    /// Shape [batch_size, embedding_dim]
    pub embedding: Tensor<B, 2>,
}

/// Image classifier that also exposes its pre-final-layer embedding
///
/// Architecture:
/// - conv(5x5, 32) -> ReLU -> maxpool(2x2)
/// - conv(5x5, 64) -> ReLU -> maxpool(2x2)
/// - flatten -> dropout -> fc1 (embedding) -> fc2 (class scores)
#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub layer1: ConvBlock<B>,
    pub layer2: ConvBlock<B>,
    pub dropout: Dropout,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,

    num_classes: usize,
    embedding_dim: usize,
    image_width: usize,
    conv_kernel: usize,
    pool_kernel: usize,
}

impl<B: Backend> ConvNet<B> {
    /// Create a new ConvNet from configuration
    pub fn new(config: &ConvNetConfig, device: &B::Device) -> Self {
        let g = config.geometry();

        let layer1 = ConvBlock::new(
            [1, config.conv1_channels],
            config.conv_kernel,
            g.conv1_padding,
            config.pool_kernel,
            g.pool1_padding,
            device,
        );
        let layer2 = ConvBlock::new(
            [config.conv1_channels, config.conv2_channels],
            config.conv_kernel,
            g.conv2_padding,
            config.pool_kernel,
            g.pool2_padding,
            device,
        );

        let fc1 = LinearConfig::new(g.flattened_features(config.conv2_channels), config.embedding_dim)
            .init(device);
        let fc2 = LinearConfig::new(config.embedding_dim, config.num_classes).init(device);

        Self {
            layer1,
            layer2,
            dropout: DropoutConfig::new(config.dropout).init(),
            fc1,
            fc2,
            num_classes: config.num_classes,
            embedding_dim: config.embedding_dim,
            image_width: config.image_width,
            conv_kernel: config.conv_kernel,
            pool_kernel: config.pool_kernel,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `images` - Input tensor of shape [batch_size, 1, width, width]
    pub fn forward(&self, images: Tensor<B, 4>) -> ClassifierOutput<B> {
        let x = self.layer1.forward(images);
        let x = self.layer2.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.dropout.forward(x);
        let embedding = self.fc1.forward(x);
        let logits = self.fc2.forward(embedding.clone());

        ClassifierOutput { logits, embedding }
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Get the embedding dimensionality
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Get the expected input width
    pub fn image_width(&self) -> usize {
        self.image_width
    }

    /// Layer geometry this model was built with
    pub fn geometry(&self) -> LayerGeometry {
        LayerGeometry::derive(self.image_width, self.conv_kernel, self.pool_kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_conv_net_output_shapes() {
        let device = Default::default();
        let config = ConvNetConfig::new(10, 100);
        let model = ConvNet::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 1, 28, 28], &device);
        let output = model.forward(input);

        assert_eq!(output.logits.dims(), [2, 10]);
        assert_eq!(output.embedding.dims(), [2, 100]);
    }

    #[test]
    fn test_conv_net_odd_width() {
        let device = Default::default();
        let config = ConvNetConfig::new(3, 8).with_image_width(25);
        let model = config.init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::ones([1, 1, 25, 25], &device);
        let output = model.forward(input);

        assert_eq!(output.logits.dims(), [1, 3]);
        assert_eq!(output.embedding.dims(), [1, 8]);
        assert_eq!(model.image_width(), 25);
        assert_eq!(model.geometry().pool2_width, 7);
    }

    #[test]
    fn test_block_halves_width() {
        let device = Default::default();
        let g = LayerGeometry::derive(28, 5, 2);
        let block = ConvBlock::<TestBackend>::new([1, 4], 5, g.conv1_padding, 2, g.pool1_padding, &device);

        let output = block.forward(Tensor::zeros([1, 1, 28, 28], &device));
        assert_eq!(output.dims(), [1, 4, 14, 14]);
    }
}
