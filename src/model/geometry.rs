//! Layer geometry of the two-stage convolutional network.
//!
//! Each convolution keeps the spatial width, each pooling stage halves it
//! (rounding up). The paddings that achieve this are derived from
//! `out = floor((in - kernel + 2 * pad) / stride) + 1`.

use serde::{Deserialize, Serialize};

/// Stride of every convolution
pub const CONV_STRIDE: usize = 1;

/// Stride of every pooling stage
pub const POOL_STRIDE: usize = 2;

/// Spatial output size of a convolution or pooling window
pub fn output_size(input: usize, kernel: usize, padding: usize, stride: usize) -> usize {
    (input + 2 * padding - kernel) / stride + 1
}

/// Smallest padding for which a window of `kernel`/`stride` maps `input` to `output`
pub fn padding_for(input: usize, output: usize, kernel: usize, stride: usize) -> usize {
    let needed = (stride * output + kernel) as i64 - (stride + input) as i64;
    if needed <= 0 {
        0
    } else {
        ((needed + 1) / 2) as usize
    }
}

/// Widths and paddings of every stage for a given input width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGeometry {
    /// Input width
    pub input_width: usize,
    /// Padding of the first convolution
    pub conv1_padding: usize,
    /// Width after the first convolution
    pub conv1_width: usize,
    /// Padding of the first pooling stage
    pub pool1_padding: usize,
    /// Width after the first pooling stage
    pub pool1_width: usize,
    /// Padding of the second convolution
    pub conv2_padding: usize,
    /// Width after the second convolution
    pub conv2_width: usize,
    /// Padding of the second pooling stage
    pub pool2_padding: usize,
    /// Width after the second pooling stage
    pub pool2_width: usize,
}

impl LayerGeometry {
    /// Derive every padding and width from the input width and kernel sizes
    pub fn derive(input_width: usize, conv_kernel: usize, pool_kernel: usize) -> Self {
        let conv1_width = input_width;
        let conv1_padding = padding_for(input_width, conv1_width, conv_kernel, CONV_STRIDE);

        let pool1_width = conv1_width.div_ceil(2);
        let pool1_padding = padding_for(conv1_width, pool1_width, pool_kernel, POOL_STRIDE);

        let conv2_width = pool1_width;
        let conv2_padding = padding_for(pool1_width, conv2_width, conv_kernel, CONV_STRIDE);

        let pool2_width = conv2_width.div_ceil(2);
        let pool2_padding = padding_for(conv2_width, pool2_width, pool_kernel, POOL_STRIDE);

        Self {
            input_width,
            conv1_padding,
            conv1_width,
            pool1_padding,
            pool1_width,
            conv2_padding,
            conv2_width,
            pool2_padding,
            pool2_width,
        }
    }

    /// Number of features after flattening the second pooling stage
    pub fn flattened_features(&self, channels: usize) -> usize {
        self.pool2_width * self.pool2_width * channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_formula() {
        assert_eq!(output_size(28, 5, 2, 1), 28);
        assert_eq!(output_size(28, 2, 0, 2), 14);
        assert_eq!(output_size(7, 2, 1, 2), 4);
    }

    #[test]
    fn test_mnist_sized_input() {
        let g = LayerGeometry::derive(28, 5, 2);
        assert_eq!(g.conv1_padding, 2);
        assert_eq!(g.pool1_padding, 0);
        assert_eq!(g.pool1_width, 14);
        assert_eq!(g.conv2_padding, 2);
        assert_eq!(g.pool2_padding, 0);
        assert_eq!(g.pool2_width, 7);
        assert_eq!(g.flattened_features(64), 7 * 7 * 64);
    }

    #[test]
    fn test_odd_width_rounds_up() {
        let g = LayerGeometry::derive(25, 5, 2);
        assert_eq!(g.pool1_width, 13);
        assert_eq!(g.pool1_padding, 1);
        assert_eq!(g.pool2_width, 7);
    }

    #[test]
    fn test_paddings_realise_widths_for_any_width() {
        for width in 1..=128 {
            let g = LayerGeometry::derive(width, 5, 2);
            assert_eq!(output_size(width, 5, g.conv1_padding, CONV_STRIDE), width);
            assert_eq!(
                output_size(g.conv1_width, 2, g.pool1_padding, POOL_STRIDE),
                width.div_ceil(2)
            );
            assert_eq!(
                output_size(g.pool1_width, 5, g.conv2_padding, CONV_STRIDE),
                g.pool1_width
            );
            assert_eq!(
                output_size(g.conv2_width, 2, g.pool2_padding, POOL_STRIDE),
                g.pool1_width.div_ceil(2)
            );
            // Pooling padding never exceeds half the window
            assert!(g.pool1_padding <= 1 && g.pool2_padding <= 1);
        }
    }
}
