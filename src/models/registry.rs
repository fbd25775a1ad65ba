use crate::config::ModelSpec;
use crate::models::ClassificationModel;
use crate::utils::error::ClassifyError;
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// 每个模型一个槽位：静态配置 + 惰性初始化的缓存单元
struct ModelSlot {
    spec: ModelSpec,
    cell: OnceCell<Arc<ClassificationModel>>,
}

/// 模型注册表：固定名称集合，按需加载，每个进程每个模型至多加载一次
///
/// OnceCell保证并发首次访问时只有一个加载者执行（single-flight），
/// 加载失败不会写入槽位，后续调用可以重试。
pub struct ModelRegistry {
    slots: Vec<ModelSlot>,
    config: Config,
}

impl ModelRegistry {
    pub fn new(config: Config) -> Self {
        let slots = config
            .model_specs()
            .into_iter()
            .map(|spec| ModelSlot {
                spec,
                cell: OnceCell::new(),
            })
            .collect();

        Self { slots, config }
    }

    /// 枚举已配置的模型名称，不触发任何加载
    pub fn model_ids(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.spec.id.clone()).collect()
    }

    /// 查找模型的静态配置，未配置的名称是硬错误
    pub fn spec(&self, model_id: &str) -> Result<&ModelSpec> {
        self.slots
            .iter()
            .find(|slot| slot.spec.id == model_id)
            .map(|slot| &slot.spec)
            .ok_or_else(|| ClassifyError::UnknownModel(model_id.to_string()))
    }

    /// 获取已加载的模型，首次访问时反序列化并缓存
    pub fn get(&self, model_id: &str) -> Result<Arc<ClassificationModel>> {
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.spec.id == model_id)
            .ok_or_else(|| ClassifyError::UnknownModel(model_id.to_string()))?;

        let model = slot.cell.get_or_try_init(|| {
            let model_path = self.config.model_path(&slot.spec);
            let labels_path = self.config.labels_path(&slot.spec);
            ClassificationModel::load(
                &slot.spec,
                &model_path,
                &labels_path,
                &self.config.onnx_config,
            )
            .map(Arc::new)
        })?;

        Ok(Arc::clone(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> (tempfile::TempDir, ModelRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(
            "127.0.0.1:0".to_string(),
            dir.path().join("models").display().to_string(),
            dir.path().join("data").display().to_string(),
            Some(1),
            false,
        )
        .unwrap();
        (dir, ModelRegistry::new(config))
    }

    #[test]
    fn model_ids_match_catalog_without_loading() {
        let (_dir, registry) = test_registry();
        assert_eq!(
            registry.model_ids(),
            vec!["resnet18", "alexnet", "vgg16", "densenet121"]
        );
    }

    #[test]
    fn unknown_model_is_hard_error() {
        let (_dir, registry) = test_registry();

        let err = registry.get("resnet99").unwrap_err();
        assert!(matches!(err, ClassifyError::UnknownModel(_)));

        let err = registry.spec("").unwrap_err();
        assert!(matches!(err, ClassifyError::UnknownModel(_)));
    }

    #[test]
    fn spec_lookup_does_not_require_model_file() {
        let (_dir, registry) = test_registry();

        let spec = registry.spec("resnet18").unwrap();
        assert_eq!(spec.input_size, (224, 224));
    }

    #[test]
    fn failed_load_does_not_poison_the_cache() {
        // 模型文件缺失：每次调用都应返回ModelLoad，而不是缓存失败状态
        let (_dir, registry) = test_registry();

        let first = registry.get("resnet18").unwrap_err();
        assert!(matches!(first, ClassifyError::ModelLoad(_)));

        let second = registry.get("resnet18").unwrap_err();
        assert!(matches!(second, ClassifyError::ModelLoad(_)));
    }
}
