use crate::utils::error::ClassifyError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// 验证的JSON提取器：解析后通过统一的错误类型校验
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ClassifyError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ClassifyError::InvalidInput(format!("JSON parse error: {}", err)))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// 验证trait：校验失败走统一的错误分类，不引入平行错误类型
pub trait Validate {
    fn validate(&self) -> crate::Result<()>;
}

impl Validate for crate::web::handlers::ClassificationRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(ClassifyError::InvalidInput(
                "model_id cannot be empty".to_string(),
            ));
        }
        if self.image_id.trim().is_empty() {
            return Err(ClassifyError::InvalidInput(
                "image_id cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for crate::web::handlers::EditRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.image_id.trim().is_empty() {
            return Err(ClassifyError::InvalidInput(
                "image_id cannot be empty".to_string(),
            ));
        }

        let factors = [
            ("color", self.color),
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("sharpness", self.sharpness),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(ClassifyError::InvalidEditParameter(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

impl Validate for crate::web::handlers::UploadBase64Request {
    fn validate(&self) -> crate::Result<()> {
        if self.image.trim().is_empty() {
            return Err(ClassifyError::InvalidInput(
                "Image data cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
