use crate::classify::types::{rank, softmax, ClassificationOutcome};
use crate::image::{EditSpec, ImageEditor, ImageLoader};
use crate::models::{classifier, ModelRegistry};
use crate::store::{ImageHandle, ImageStore};
use crate::utils::error::ClassifyError;
use crate::{Config, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 图像分类流水线：存储、注册表和编辑器之上的核心操作
pub struct ClassifyPipeline {
    config: Config,
    store: ImageStore,
    registry: Arc<ModelRegistry>,
}

impl ClassifyPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let store = ImageStore::new(
            config.sample_images_dir(),
            config.uploads_dir(),
            config.server_config.max_upload_size,
        )?;
        let registry = Arc::new(ModelRegistry::new(config.clone()));

        Ok(Self {
            config,
            store,
            registry,
        })
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// 枚举已配置的模型名称，不触发加载
    pub fn list_models(&self) -> Vec<String> {
        self.registry.model_ids()
    }

    /// 枚举可用图片
    pub fn list_images(&self) -> Result<Vec<ImageHandle>> {
        self.store.list_images()
    }

    /// 对存储中的图片运行指定模型，返回排序后的top-k预测
    pub async fn classify(&self, model_id: &str, image_id: &str) -> Result<ClassificationOutcome> {
        let started = Instant::now();

        // 未知模型在任何图片IO之前报错
        let spec = self.registry.spec(model_id)?.clone();

        let path = self.store.resolve(image_id)?;
        let bytes = std::fs::read(&path)?;
        let image = ImageLoader::decode(&bytes)?;

        let tensor = classifier::preprocess(&image, &spec);

        // 推理在阻塞线程池中执行，受配置的超时约束
        let registry = Arc::clone(&self.registry);
        let owned_model_id = model_id.to_string();
        let top_k = self.config.top_k;
        let task = tokio::task::spawn_blocking(move || {
            let model = registry.get(&owned_model_id)?;
            let logits = model.infer(tensor)?;
            let scores = softmax(&logits);
            Ok::<_, ClassifyError>(rank(&scores, model.labels(), top_k))
        });

        let timeout = Duration::from_secs(self.config.server_config.inference_timeout);
        let predictions = match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| {
                ClassifyError::Internal(format!("Inference task failed: {}", e))
            })??,
            Err(_) => {
                return Err(ClassifyError::Timeout(
                    self.config.server_config.inference_timeout,
                ));
            }
        };

        let processing_time = started.elapsed().as_secs_f32();
        tracing::info!(
            "Classification completed: model={}, image={}, top_score={:.4}, time={:.3}s",
            model_id,
            image_id,
            predictions.first().map(|p| p.score).unwrap_or(0.0),
            processing_time
        );

        Ok(ClassificationOutcome {
            model_id: model_id.to_string(),
            image_id: image_id.to_string(),
            predictions,
            processing_time,
        })
    }

    /// 编辑存储中的图片，生成新的图片并返回其标识符
    pub fn edit(&self, image_id: &str, spec: &EditSpec) -> Result<ImageHandle> {
        spec.validate()?;

        let source = self.store.resolve(image_id)?;
        let (handle, dest) = self.store.allocate_derived(image_id)?;
        ImageEditor::edit_file(&source, spec, &dest)?;

        tracing::info!("Edited image: {} -> {}", image_id, handle);

        Ok(handle)
    }

    /// 验证并持久化上传文件
    pub fn store_upload(&self, bytes: &[u8], declared_content_type: Option<&str>) -> Result<ImageHandle> {
        self.store.store_upload(bytes, declared_content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn test_pipeline(data_dir: &std::path::Path) -> ClassifyPipeline {
        let config = Config::new(
            "127.0.0.1:0".to_string(),
            data_dir.join("models").display().to_string(),
            data_dir.display().to_string(),
            Some(1),
            false,
        )
        .unwrap();
        ClassifyPipeline::new(config).unwrap()
    }

    fn write_sample_png(data_dir: &std::path::Path, name: &str) {
        let samples = data_dir.join("imagenet_subset");
        std::fs::create_dir_all(&samples).unwrap();
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 50]));
        image::DynamicImage::ImageRgb8(img)
            .save(samples.join(name))
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_model_fails_before_any_image_io() {
        // 样例目录不存在：未知模型检查必须先于图片解析
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path());

        let err = pipeline.classify("resnet99", "cat.jpg").await.unwrap_err();
        assert!(matches!(err, ClassifyError::UnknownModel(_)));
    }

    #[tokio::test]
    async fn zero_byte_image_fails_with_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("imagenet_subset");
        std::fs::create_dir_all(&samples).unwrap();
        std::fs::write(samples.join("empty.jpg"), b"").unwrap();
        let pipeline = test_pipeline(dir.path());

        let err = pipeline.classify("resnet18", "empty.jpg").await.unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
    }

    #[tokio::test]
    async fn missing_image_fails_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path());

        let err = pipeline.classify("resnet18", "absent.jpg").await.unwrap_err();
        assert!(matches!(err, ClassifyError::ImageNotFound(_)));
    }

    #[test]
    fn edit_produces_resolvable_handle() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_png(dir.path(), "cat.png");
        let pipeline = test_pipeline(dir.path());

        let handle = pipeline.edit("cat.png", &EditSpec::IDENTITY).unwrap();
        assert!(handle.as_str().starts_with("edited-"));

        let edited_path = pipeline.store().resolve(handle.as_str()).unwrap();
        let original = image::open(dir.path().join("imagenet_subset/cat.png")).unwrap();
        let edited = image::open(edited_path).unwrap();
        assert_eq!(original.to_rgb8().as_raw(), edited.to_rgb8().as_raw());
    }

    #[test]
    fn edit_rejects_malformed_factors() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_png(dir.path(), "cat.png");
        let pipeline = test_pipeline(dir.path());

        let err = pipeline
            .edit("cat.png", &EditSpec::new(1.0, -3.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidEditParameter(_)));
    }

    #[test]
    fn listing_reflects_samples_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_png(dir.path(), "cat.png");
        let pipeline = test_pipeline(dir.path());

        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let uploaded = pipeline
            .store_upload(&png.into_inner(), Some("image/png"))
            .unwrap();

        let names: Vec<String> = pipeline
            .list_images()
            .unwrap()
            .into_iter()
            .map(|h| h.into_inner())
            .collect();
        assert!(names.contains(&"cat.png".to_string()));
        assert!(names.contains(&uploaded.into_inner()));
    }

    #[test]
    fn model_listing_does_not_load_models() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path());

        // 模型目录不存在也能枚举名称
        assert_eq!(
            pipeline.list_models(),
            vec!["resnet18", "alexnet", "vgg16", "densenet121"]
        );
    }
}
