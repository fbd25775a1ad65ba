use crate::utils::error::ClassifyError;
use crate::Result;
use std::path::PathBuf;

/// 默认返回的top-k预测数量
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件目录
    pub models_dir: PathBuf,

    /// 数据目录（样例图片和上传文件）
    pub data_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// 每次分类返回的预测数量
    pub top_k: usize,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 推理超时时间（秒）
    pub inference_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,

    /// 最大上传文件大小（字节）
    pub max_upload_size: usize,
}

/// 单个分类模型的静态配置
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// 模型标识符
    pub id: String,

    /// ONNX模型文件名
    pub model_file: String,

    /// 输入尺寸 (H, W)
    pub input_size: (u32, u32),

    /// 归一化均值（RGB顺序）
    pub mean: [f32; 3],

    /// 归一化标准差（RGB顺序）
    pub std: [f32; 3],

    /// 标签文件名
    pub labels_file: String,
}

impl ModelSpec {
    fn imagenet(id: &str) -> Self {
        Self {
            id: id.to_string(),
            model_file: format!("{}.onnx", id),
            input_size: (224, 224),
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            labels_file: "imagenet_classes.txt".to_string(),
        }
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        data_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        if bind_addr.is_empty() {
            return Err(ClassifyError::Config("Bind address cannot be empty".to_string()));
        }

        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            inference_timeout: if dev_mode { 120 } else { 30 },
            max_request_size: 50 * 1024 * 1024, // 50MB
            max_upload_size: 10 * 1024 * 1024,  // 10MB
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            data_dir: PathBuf::from(data_dir),
            workers,
            dev_mode,
            top_k: DEFAULT_TOP_K,
            onnx_config,
            server_config,
        })
    }

    /// 获取样例图片目录
    pub fn sample_images_dir(&self) -> PathBuf {
        self.data_dir.join("imagenet_subset")
    }

    /// 获取上传文件目录
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// 获取模型文件路径
    pub fn model_path(&self, spec: &ModelSpec) -> PathBuf {
        self.models_dir.join(&spec.model_file)
    }

    /// 获取标签文件路径
    pub fn labels_path(&self, spec: &ModelSpec) -> PathBuf {
        self.models_dir.join(&spec.labels_file)
    }

    /// 固定的模型目录：四个ImageNet预训练分类器
    pub fn model_specs(&self) -> Vec<ModelSpec> {
        vec![
            ModelSpec::imagenet("resnet18"),
            ModelSpec::imagenet("alexnet"),
            ModelSpec::imagenet("vgg16"),
            ModelSpec::imagenet("densenet121"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_catalog_is_fixed() {
        let config = Config::new(
            "127.0.0.1:8000".to_string(),
            "models".to_string(),
            "data".to_string(),
            Some(2),
            false,
        )
        .unwrap();

        let ids: Vec<String> = config.model_specs().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["resnet18", "alexnet", "vgg16", "densenet121"]);
    }

    #[test]
    fn imagenet_spec_defaults() {
        let spec = ModelSpec::imagenet("resnet18");
        assert_eq!(spec.model_file, "resnet18.onnx");
        assert_eq!(spec.input_size, (224, 224));
        assert_eq!(spec.mean, [0.485, 0.456, 0.406]);
        assert_eq!(spec.std, [0.229, 0.224, 0.225]);
    }

    #[test]
    fn empty_bind_addr_rejected() {
        let result = Config::new(
            String::new(),
            "models".to_string(),
            "data".to_string(),
            None,
            false,
        );
        assert!(result.is_err());
    }
}
