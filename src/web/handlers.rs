use crate::{
    classify::ClassificationOutcome,
    image::{EditSpec, ImageLoader},
    store::ImageHandle,
    utils::error::ClassifyError,
    web::{extractors::ValidatedJson, AppState},
    Result,
};
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

fn default_factor() -> f32 {
    1.0
}

/// 分类请求体
#[derive(Debug, Deserialize)]
pub struct ClassificationRequest {
    /// 模型标识符
    pub model_id: String,

    /// 图片标识符
    pub image_id: String,
}

/// 编辑请求体
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    /// 源图片标识符
    pub image_id: String,

    /// 色彩因子
    #[serde(default = "default_factor")]
    pub color: f32,

    /// 亮度因子
    #[serde(default = "default_factor")]
    pub brightness: f32,

    /// 对比度因子
    #[serde(default = "default_factor")]
    pub contrast: f32,

    /// 锐度因子
    #[serde(default = "default_factor")]
    pub sharpness: f32,

    /// 可选：编辑后立即用该模型分类
    #[serde(default)]
    pub model_id: Option<String>,
}

/// JSON base64上传请求体
#[derive(Debug, Deserialize)]
pub struct UploadBase64Request {
    /// Base64编码的图像数据（允许数据URL前缀）
    pub image: String,

    /// 可选的声明内容类型
    #[serde(default)]
    pub content_type: Option<String>,

    /// 可选：上传后立即用该模型分类
    #[serde(default)]
    pub model_id: Option<String>,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// 服务信息：模型列表与可用图片列表
#[derive(Debug, Serialize)]
pub struct InfoData {
    pub models: Vec<String>,
    pub images: Vec<ImageHandle>,
}

/// 编辑结果：新图片标识符与可选的分类结果
#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub image_id: ImageHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationOutcome>,
}

/// 上传结果：新图片标识符与可选的分类结果
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub image_id: ImageHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationOutcome>,
}

/// 服务信息处理器（不触发模型加载）
pub async fn info_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoData>>> {
    let data = InfoData {
        models: state.pipeline.list_models(),
        images: state.pipeline.list_images()?,
    };

    Ok(Json(ApiResponse::success(data)))
}

/// 图片内容处理器：按标识符返回存储中的图片字节
///
/// 浏览器侧的预览和直方图计算依赖这个端点。
pub async fn image_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Response> {
    let path = state.pipeline.store().resolve(&image_id)?;
    let bytes = std::fs::read(&path)?;

    let content_type = ImageLoader::detect_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// 分类处理器
pub async fn classify_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ClassificationRequest>,
) -> Result<Json<ApiResponse<ClassificationOutcome>>> {
    tracing::info!(
        "Processing classification request: model={}, image={}",
        request.model_id,
        request.image_id
    );

    let outcome = state
        .pipeline
        .classify(&request.model_id, &request.image_id)
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}

/// 编辑处理器：编辑图片，可选地对结果分类
pub async fn edit_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EditRequest>,
) -> Result<Json<ApiResponse<EditOutcome>>> {
    let spec = EditSpec::new(
        request.color,
        request.brightness,
        request.contrast,
        request.sharpness,
    );

    tracing::info!(
        "Processing edit request: image={}, factors=({}, {}, {}, {})",
        request.image_id,
        spec.color,
        spec.brightness,
        spec.contrast,
        spec.sharpness
    );

    let edited = state.pipeline.edit(&request.image_id, &spec)?;

    let classification = match request.model_id {
        Some(model_id) => Some(state.pipeline.classify(&model_id, edited.as_str()).await?),
        None => None,
    };

    Ok(Json(ApiResponse::success(EditOutcome {
        image_id: edited,
        classification,
    })))
}

/// Multipart文件上传处理器
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadOutcome>>> {
    let mut file_data: Option<(Vec<u8>, Option<String>)> = None;
    let mut model_id: Option<String> = None;

    // 解析multipart数据
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifyError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                let content_type = field.content_type().map(|ct| ct.to_string());

                let data = field.bytes().await.map_err(|e| {
                    ClassifyError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(ClassifyError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                file_data = Some((data.to_vec(), content_type));
            }
            "model_id" => {
                let value = field.text().await.unwrap_or_default();
                if !value.is_empty() {
                    model_id = Some(value);
                }
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (bytes, content_type) = file_data.ok_or_else(|| {
        ClassifyError::InvalidInput("No image file provided".to_string())
    })?;

    let handle = state
        .pipeline
        .store_upload(&bytes, content_type.as_deref())?;

    let classification = match model_id {
        Some(model_id) => Some(state.pipeline.classify(&model_id, handle.as_str()).await?),
        None => None,
    };

    Ok(Json(ApiResponse::success(UploadOutcome {
        image_id: handle,
        classification,
    })))
}

/// JSON base64上传处理器
pub async fn upload_base64_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UploadBase64Request>,
) -> Result<Json<ApiResponse<UploadOutcome>>> {
    let bytes = ImageLoader::decode_base64(&request.image)?;
    let handle = state
        .pipeline
        .store_upload(&bytes, request.content_type.as_deref())?;

    let classification = match request.model_id {
        Some(model_id) => Some(state.pipeline.classify(&model_id, handle.as_str()).await?),
        None => None,
    };

    Ok(Json(ApiResponse::success(UploadOutcome {
        image_id: handle,
        classification,
    })))
}
