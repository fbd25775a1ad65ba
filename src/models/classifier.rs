use crate::config::{ModelSpec, OnnxConfig};
use crate::utils::error::ClassifyError;
use crate::Result;
use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;

/// 加载完成、可推理的分类模型
pub struct ClassificationModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String, // 动态发现的输出名称
    spec: ModelSpec,
    labels: Vec<String>,
}

impl ClassificationModel {
    pub fn load(
        spec: &ModelSpec,
        model_path: &Path,
        labels_path: &Path,
        onnx_config: &OnnxConfig,
    ) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifyError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading model '{}' from: {}", spec.id, model_path.display());

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(onnx_config.intra_threads))
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| ClassifyError::ModelLoad(format!("{}: {}", spec.id, e)))?;

        // 动态发现输入输出名称
        if session.inputs.is_empty() || session.outputs.is_empty() {
            return Err(ClassifyError::ModelLoad(format!(
                "Model '{}' has no inputs or outputs",
                spec.id
            )));
        }
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();
        tracing::info!(
            "Model '{}' input: '{}', output: '{}'",
            spec.id,
            input_name,
            output_name
        );

        let labels = Self::load_labels(spec, labels_path)?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            spec: spec.clone(),
            labels,
        })
    }

    fn load_labels(spec: &ModelSpec, labels_path: &Path) -> Result<Vec<String>> {
        let contents = std::fs::read_to_string(labels_path).map_err(|e| {
            ClassifyError::ModelLoad(format!(
                "Label file for '{}' unreadable at {}: {}",
                spec.id,
                labels_path.display(),
                e
            ))
        })?;

        let labels: Vec<String> = contents
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if labels.is_empty() {
            return Err(ClassifyError::ModelLoad(format!(
                "Label file for '{}' is empty: {}",
                spec.id,
                labels_path.display()
            )));
        }

        Ok(labels)
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// 前向推理，返回整个标签空间上的原始分数向量
    pub fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input)?;

        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifyError::Internal(format!(
                        "Model output '{}' not found. Available outputs: {:?}",
                        self.output_name, available_outputs
                    )));
                }
            }
        };

        let scores: Vec<f32> = predictions.iter().copied().collect();
        if scores.is_empty() {
            return Err(ClassifyError::Internal(format!(
                "Model '{}' produced an empty score vector",
                self.spec.id
            )));
        }

        Ok(scores)
    }
}

/// 模型专属的确定性预处理：缩放到期望输入尺寸，按mean/std归一化，NCHW布局
pub fn preprocess(image: &DynamicImage, spec: &ModelSpec) -> Array4<f32> {
    let (height, width) = spec.input_size;
    let resized = image.resize_exact(width, height, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - spec.mean[c]) / spec.std[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSpec;
    use image::{Rgb, RgbImage};

    fn resnet_spec() -> ModelSpec {
        ModelSpec {
            id: "resnet18".to_string(),
            model_file: "resnet18.onnx".to_string(),
            input_size: (224, 224),
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            labels_file: "imagenet_classes.txt".to_string(),
        }
    }

    #[test]
    fn preprocess_produces_nchw_tensor_of_expected_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let tensor = preprocess(&image, &resnet_spec());
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn preprocess_normalizes_with_mean_and_std() {
        // 纯白图像：每个通道的值为 (1.0 - mean) / std
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));
        let spec = resnet_spec();
        let tensor = preprocess(&image, &spec);

        for c in 0..3 {
            let expected = (1.0 - spec.mean[c]) / spec.std[c];
            let got = tensor[[0, c, 100, 100]];
            assert!((got - expected).abs() < 1e-5, "channel {}: {} vs {}", c, got, expected);
        }
    }

    #[test]
    fn preprocess_is_deterministic() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, 7])
        }));
        let spec = resnet_spec();

        assert_eq!(preprocess(&image, &spec), preprocess(&image, &spec));
    }
}
