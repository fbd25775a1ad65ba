use crate::Result;
use base64::Engine;
use image::{DynamicImage, ImageFormat};

pub struct ImageLoader;

impl ImageLoader {
    /// 解码图像字节，损坏或不支持的数据返回ImageDecode错误
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        let image = image::load_from_memory(bytes)?;
        Ok(image)
    }

    /// 从base64字符串解码原始字节
    pub fn decode_base64(base64_data: &str) -> Result<Vec<u8>> {
        // 检测并移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        let bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean)?;
        Ok(bytes)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
        )
    }
}
