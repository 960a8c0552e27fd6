use super::padding_type::PaddingType;
use crate::error::ModelError;
use crate::neural_network::Tensor;
use ndarray::{Array2, ArrayD, ArrayViewD, ArrayViewMutD, Axis, Dimension, IxDyn, Slice, Zip};

/// Number of output elements above which convolution batches run in parallel.
const CONV_PARALLEL_THRESHOLD: usize = 10_000;

/// Spatial geometry of one convolution call, shared by the forward and the backward pass.
///
/// # Fields
///
/// - `input_spatial` - Spatial extent of the unpadded input
/// - `padded_spatial` - Spatial extent after zero padding
/// - `pad_before` - Zeros inserted before the input along each spatial axis
/// - `output_spatial` - Spatial extent of the output
/// - `kernel` - Kernel extent along each spatial axis
/// - `strides` - Stride along each spatial axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ConvGeometry {
    pub input_spatial: Vec<usize>,
    pub padded_spatial: Vec<usize>,
    pub pad_before: Vec<usize>,
    pub output_spatial: Vec<usize>,
    pub kernel: Vec<usize>,
    pub strides: Vec<usize>,
}

impl ConvGeometry {
    pub fn new(
        input_spatial: &[usize],
        kernel: &[usize],
        strides: &[usize],
        padding: PaddingType,
    ) -> Result<Self, ModelError> {
        if input_spatial.len() != kernel.len() || kernel.len() != strides.len() {
            return Err(ModelError::InputValidationError(format!(
                "Expected {} spatial dimensions, got {}",
                kernel.len(),
                input_spatial.len()
            )));
        }

        let mut padded_spatial = Vec::with_capacity(kernel.len());
        let mut pad_before = Vec::with_capacity(kernel.len());
        let mut output_spatial = Vec::with_capacity(kernel.len());
        for ((&input, &k), &s) in input_spatial.iter().zip(kernel).zip(strides) {
            let (output, before, padded) = padding.axis_geometry(input, k, s)?;
            output_spatial.push(output);
            pad_before.push(before);
            padded_spatial.push(padded);
        }

        Ok(Self {
            input_spatial: input_spatial.to_vec(),
            padded_spatial,
            pad_before,
            output_spatial,
            kernel: kernel.to_vec(),
            strides: strides.to_vec(),
        })
    }

    /// Full output shape `[batch_size, filters, ...output_spatial]`.
    pub fn output_shape(&self, batch_size: usize, filters: usize) -> Vec<usize> {
        let mut shape = vec![batch_size, filters];
        shape.extend_from_slice(&self.output_spatial);
        shape
    }

    fn is_padded(&self) -> bool {
        self.padded_spatial != self.input_spatial
    }

    /// Strided view of `channel` that kernel offset `offset` touches for every output position.
    fn window<'a>(&self, channel: &'a ArrayViewD<'_, f32>, offset: &[usize]) -> ArrayViewD<'a, f32> {
        channel.slice_each_axis(|ax| self.window_slice(ax.axis.index(), offset))
    }

    fn window_slice(&self, axis: usize, offset: &[usize]) -> Slice {
        let start = offset[axis];
        let end = start + (self.output_spatial[axis] - 1) * self.strides[axis] + 1;
        Slice::new(start as isize, Some(end as isize), self.strides[axis] as isize)
    }
}

/// Zero-pads a channels-first input along its spatial axes.
pub(super) fn pad_input(input: &Tensor, geometry: &ConvGeometry) -> Tensor {
    if !geometry.is_padded() {
        return input.clone();
    }

    let mut shape = input.shape()[..2].to_vec();
    shape.extend_from_slice(&geometry.padded_spatial);
    let mut padded = ArrayD::zeros(IxDyn(&shape));
    padded
        .slice_each_axis_mut(|ax| spatial_slice(ax.axis.index(), geometry))
        .assign(input);
    padded
}

/// Removes the padding rows that `pad_input` added, returning a gradient shaped like the input.
pub(super) fn strip_padding(padded: Tensor, geometry: &ConvGeometry) -> Tensor {
    if !geometry.is_padded() {
        return padded;
    }
    padded
        .slice_each_axis(|ax| spatial_slice(ax.axis.index(), geometry))
        .to_owned()
}

fn spatial_slice(axis: usize, geometry: &ConvGeometry) -> Slice {
    if axis < 2 {
        return Slice::from(..);
    }
    let start = geometry.pad_before[axis - 2];
    Slice::from(start..start + geometry.input_spatial[axis - 2])
}

/// Cross-correlation of a padded `[batch, channels, ...]` input with `[filters, channels, ...kernel]` weights.
///
/// Each kernel offset contributes `w[f, c, k] * window(x[b, c], k)` to `out[b, f]`, where the window
/// is the strided view of the input that offset touches. Batches run in parallel once the output is
/// large enough.
pub(super) fn convolve_forward(
    padded_input: &Tensor,
    weights: ArrayViewD<'_, f32>,
    bias: &Array2<f32>,
    geometry: &ConvGeometry,
) -> Tensor {
    let batch_size = padded_input.shape()[0];
    let filters = weights.shape()[0];
    let mut output = ArrayD::zeros(IxDyn(&geometry.output_shape(batch_size, filters)));
    let parallel = output.len() >= CONV_PARALLEL_THRESHOLD;

    let forward_sample = |mut out_b: ArrayViewMutD<'_, f32>, x_b: ArrayViewD<'_, f32>| {
        for (f, mut out_bf) in out_b.axis_iter_mut(Axis(0)).enumerate() {
            out_bf.fill(bias[[0, f]]);
            let w_f = weights.index_axis(Axis(0), f);
            for (x_bc, w_fc) in x_b.axis_iter(Axis(0)).zip(w_f.axis_iter(Axis(0))) {
                for (offset, &w) in w_fc.indexed_iter() {
                    out_bf.scaled_add(w, &geometry.window(&x_bc, offset.slice()));
                }
            }
        }
    };

    let zip = Zip::from(output.axis_iter_mut(Axis(0))).and(padded_input.axis_iter(Axis(0)));
    if parallel {
        zip.par_for_each(forward_sample);
    } else {
        zip.for_each(forward_sample);
    }

    output
}

/// Gradients of `convolve_forward`.
///
/// # Returns
///
/// - `(grad_padded_input, grad_weights, grad_bias)` - The input gradient still carries the padding,
///   the weight gradient has the shape of `weights` and the bias gradient is `[1, filters]`
pub(super) fn convolve_backward(
    padded_input: &Tensor,
    weights: ArrayViewD<'_, f32>,
    grad_output: &Tensor,
    geometry: &ConvGeometry,
) -> (Tensor, Tensor, Array2<f32>) {
    let filters = weights.shape()[0];
    let parallel = grad_output.len() >= CONV_PARALLEL_THRESHOLD;

    let grad_bias = Array2::from_shape_fn((1, filters), |(_, f)| {
        grad_output.index_axis(Axis(1), f).sum()
    });

    // dL/dw[f, c, k] = sum over batch and output positions of g[b, f] * window(x[b, c], k)
    let mut grad_weights = ArrayD::zeros(weights.raw_dim());
    let weight_sample = |f: usize, mut gw_f: ArrayViewMutD<'_, f32>| {
        for (c, mut gw_fc) in gw_f.axis_iter_mut(Axis(0)).enumerate() {
            for (offset, gw) in gw_fc.indexed_iter_mut() {
                *gw = padded_input
                    .axis_iter(Axis(0))
                    .zip(grad_output.axis_iter(Axis(0)))
                    .map(|(x_b, g_b)| {
                        let x_bc = x_b.index_axis_move(Axis(0), c);
                        let window = geometry.window(&x_bc, offset.slice());
                        Zip::from(&g_b.index_axis(Axis(0), f))
                            .and(&window)
                            .fold(0.0, |acc, &g, &x| acc + g * x)
                    })
                    .sum();
            }
        }
    };
    let filter_zip = Zip::indexed(grad_weights.axis_iter_mut(Axis(0)));
    if parallel {
        filter_zip.par_for_each(weight_sample);
    } else {
        filter_zip.for_each(weight_sample);
    }

    // dL/dx[b, c] window(k) += w[f, c, k] * g[b, f]
    let mut grad_input = ArrayD::zeros(padded_input.raw_dim());
    let input_sample = |mut gx_b: ArrayViewMutD<'_, f32>, g_b: ArrayViewD<'_, f32>| {
        for (g_bf, w_f) in g_b.axis_iter(Axis(0)).zip(weights.axis_iter(Axis(0))) {
            for (mut gx_bc, w_fc) in gx_b.axis_iter_mut(Axis(0)).zip(w_f.axis_iter(Axis(0))) {
                for (offset, &w) in w_fc.indexed_iter() {
                    gx_bc
                        .slice_each_axis_mut(|ax| geometry.window_slice(ax.axis.index(), offset.slice()))
                        .scaled_add(w, &g_bf);
                }
            }
        }
    };
    let input_zip = Zip::from(grad_input.axis_iter_mut(Axis(0))).and(grad_output.axis_iter(Axis(0)));
    if parallel {
        input_zip.par_for_each(input_sample);
    } else {
        input_zip.for_each(input_sample);
    }

    (grad_input, grad_weights, grad_bias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, array};

    #[test]
    fn same_padding_keeps_length_with_unit_stride() {
        let geometry = ConvGeometry::new(&[5, 4], &[3, 2], &[1, 1], PaddingType::Same).unwrap();
        assert_eq!(geometry.output_spatial, vec![5, 4]);
        assert_eq!(geometry.pad_before, vec![1, 0]);
        assert_eq!(geometry.padded_spatial, vec![7, 5]);
    }

    #[test]
    fn valid_padding_rejects_short_input() {
        assert!(ConvGeometry::new(&[2], &[3], &[1], PaddingType::Valid).is_err());
    }

    #[test]
    fn forward_matches_direct_1d_correlation() {
        let x = array![[[1.0f32, 2.0, 3.0, 4.0, 5.0]]].into_dyn();
        let w = array![[[1.0f32, 0.0, -1.0]]].into_dyn();
        let bias = Array2::from_elem((1, 1), 0.5);
        let geometry = ConvGeometry::new(&[5], &[3], &[1], PaddingType::Valid).unwrap();

        let out = convolve_forward(&x, w.view(), &bias, &geometry);
        assert_eq!(out, array![[[-1.5f32, -1.5, -1.5]]].into_dyn());
    }

    #[test]
    fn strided_forward_skips_positions() {
        let x = Array::from_iter((0..6).map(|v| v as f32))
            .into_shape_with_order((1, 1, 6))
            .unwrap()
            .into_dyn();
        let w = array![[[1.0f32, 1.0]]].into_dyn();
        let bias = Array2::zeros((1, 1));
        let geometry = ConvGeometry::new(&[6], &[2], &[2], PaddingType::Valid).unwrap();

        let out = convolve_forward(&x, w.view(), &bias, &geometry);
        assert_eq!(out, array![[[1.0f32, 5.0, 9.0]]].into_dyn());
    }

    #[test]
    fn backward_matches_finite_differences() {
        let x = Array::from_iter((0..18).map(|v| (v as f32 * 0.37).sin()))
            .into_shape_with_order((1, 2, 3, 3))
            .unwrap()
            .into_dyn();
        let w = Array::from_iter((0..16).map(|v| (v as f32 * 0.91).cos()))
            .into_shape_with_order((2, 2, 2, 2))
            .unwrap()
            .into_dyn();
        let bias = Array2::zeros((1, 2));
        let geometry = ConvGeometry::new(&[3, 3], &[2, 2], &[1, 1], PaddingType::Same).unwrap();
        let padded = pad_input(&x, &geometry);

        // loss = sum(out), so the upstream gradient is all ones
        let out = convolve_forward(&padded, w.view(), &bias, &geometry);
        let grad_out = ArrayD::ones(out.raw_dim());
        let (grad_padded, grad_w, grad_b) = convolve_backward(&padded, w.view(), &grad_out, &geometry);
        let grad_x = strip_padding(grad_padded, &geometry);

        let loss = |x: &Tensor, w: &Tensor| {
            convolve_forward(&pad_input(x, &geometry), w.view(), &bias, &geometry).sum()
        };
        let h = 1e-2;
        for idx in [vec![0, 0, 1, 1], vec![0, 1, 2, 0]] {
            let mut x_plus = x.clone();
            x_plus[idx.as_slice()] += h;
            let numeric = (loss(&x_plus, &w) - loss(&x, &w)) / h;
            assert!((numeric - grad_x[idx.as_slice()]).abs() < 1e-2);
        }
        for idx in [vec![1, 0, 1, 0], vec![0, 1, 0, 1]] {
            let mut w_plus = w.clone();
            w_plus[idx.as_slice()] += h;
            let numeric = (loss(&x, &w_plus) - loss(&x, &w)) / h;
            assert!((numeric - grad_w[idx.as_slice()]).abs() < 1e-2);
        }
        assert_eq!(grad_b, Array2::from_elem((1, 2), 9.0));
    }
}
