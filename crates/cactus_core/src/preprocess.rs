use crate::classifier::{ClassifierHandle, InputShape};
use crate::error::{Error, Result};
use crate::sample::ImageSample;
use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};

/// Resampling filter used when fitting a photo to a model's input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// `(1, H, W, 3)` batch with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    /// Wrap an existing NHWC array. Fails unless the batch axis is 1.
    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        if data.shape()[0] != 1 {
            let mut expected = data.shape().to_vec();
            expected[0] = 1;
            return Err(Error::ShapeMismatch {
                expected,
                actual: data.shape().to_vec(),
            });
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

/// Fit `image` to the input size declared by `handle`.
pub fn prepare(image: &ImageSample, handle: &ClassifierHandle) -> Result<InputTensor> {
    prepare_with(image, handle.input_shape(), ResizeFilter::default())
}

/// Resize to `shape`, scale each channel by 1/255 and add the batch axis.
pub fn prepare_with(image: &ImageSample, shape: InputShape, filter: ResizeFilter) -> Result<InputTensor> {
    if shape.channels != 3 {
        return Err(Error::ChannelConversionError(format!(
            "model expects {} channels, only RGB input is supported",
            shape.channels
        )));
    }
    let resized = imageops::resize(
        image.pixels(),
        shape.width as u32,
        shape.height as u32,
        filter.into(),
    );
    let mut data = Array4::<f32>::zeros((1, shape.height, shape.width, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (row, col) = (y as usize, x as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            data[[0, row, col, c]] = *value as f32 / 255.0;
        }
    }
    tracing::debug!(
        from = ?(image.width(), image.height()),
        to = ?data.shape(),
        "prepared input tensor"
    );
    Ok(InputTensor { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rstest::rstest;

    #[rstest]
    #[case(InputShape::new(150, 150, 3))]
    #[case(InputShape::new(224, 224, 3))]
    #[case(InputShape::new(96, 128, 3))]
    fn tensor_follows_declared_shape(#[case] shape: InputShape) {
        let sample = ImageSample::from_rgb(RgbImage::from_pixel(40, 30, Rgb([255, 0, 51])));
        let tensor = prepare_with(&sample, shape, ResizeFilter::Nearest).unwrap();
        assert_eq!(tensor.shape(), &shape.tensor_dims());
    }

    #[test]
    fn pixels_scaled_to_unit_range() {
        let sample = ImageSample::from_rgb(RgbImage::from_pixel(10, 10, Rgb([255, 0, 51])));
        let tensor = prepare_with(&sample, InputShape::new(4, 4, 3), ResizeFilter::Nearest).unwrap();
        let view = tensor.view();
        assert_eq!(view[[0, 2, 2, 0]], 1.0);
        assert_eq!(view[[0, 2, 2, 1]], 0.0);
        assert!((view[[0, 2, 2, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn non_rgb_model_input_is_rejected() {
        let sample = ImageSample::from_rgb(RgbImage::new(2, 2));
        let err = prepare_with(&sample, InputShape::new(4, 4, 4), ResizeFilter::Triangle).unwrap_err();
        assert!(matches!(err, Error::ChannelConversionError(_)));
    }

    #[test]
    fn from_array_requires_single_batch() {
        let err = InputTensor::from_array(Array4::zeros((2, 4, 4, 3))).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
