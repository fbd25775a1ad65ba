use crate::image::ImageLoader;
use crate::utils::error::ClassifyError;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// 可接受的上传内容类型
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

/// 存储中图片的文件扩展名
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// 存储图片的逻辑标识符（裸文件名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 图片存储：只读样例目录 + 可写上传目录，共享同一命名空间
pub struct ImageStore {
    samples_dir: PathBuf,
    uploads_dir: PathBuf,
    max_upload_bytes: usize,
}

impl ImageStore {
    pub fn new(samples_dir: PathBuf, uploads_dir: PathBuf, max_upload_bytes: usize) -> Result<Self> {
        std::fs::create_dir_all(&uploads_dir)?;

        Ok(Self {
            samples_dir,
            uploads_dir,
            max_upload_bytes,
        })
    }

    /// 枚举可用图片：先样例目录，后上传目录，各自按文件名排序
    pub fn list_images(&self) -> Result<Vec<ImageHandle>> {
        let mut handles = Vec::new();
        handles.extend(Self::scan_dir(&self.samples_dir)?);
        handles.extend(Self::scan_dir(&self.uploads_dir)?);
        Ok(handles)
    }

    fn scan_dir(dir: &Path) -> Result<Vec<ImageHandle>> {
        if !dir.is_dir() {
            tracing::warn!("Image directory not found: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if Self::has_image_extension(&name) {
                names.push(name);
            }
        }
        names.sort();

        Ok(names.into_iter().map(ImageHandle).collect())
    }

    fn has_image_extension(name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// 将标识符解析为文件路径，先查上传目录，再查样例目录
    pub fn resolve(&self, handle: &str) -> Result<PathBuf> {
        Self::validate_handle(handle)?;

        let uploaded = self.uploads_dir.join(handle);
        if uploaded.is_file() {
            return Ok(uploaded);
        }

        let sample = self.samples_dir.join(handle);
        if sample.is_file() {
            return Ok(sample);
        }

        Err(ClassifyError::ImageNotFound(handle.to_string()))
    }

    /// 标识符必须是单一的裸文件名，拒绝任何路径穿越
    fn validate_handle(handle: &str) -> Result<()> {
        if handle.is_empty() {
            return Err(ClassifyError::InvalidImageHandle(
                "empty image handle".to_string(),
            ));
        }

        let path = Path::new(handle);
        let mut components = path.components();
        let valid = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();

        if !valid || handle.contains('/') || handle.contains('\\') {
            return Err(ClassifyError::InvalidImageHandle(handle.to_string()));
        }

        Ok(())
    }

    /// 验证并持久化上传文件，返回新的标识符
    ///
    /// `declared_content_type` 为None时仅依赖字节嗅探（base64上传模式）。
    pub fn store_upload(&self, bytes: &[u8], declared_content_type: Option<&str>) -> Result<ImageHandle> {
        if let Some(content_type) = declared_content_type {
            let content_type = content_type
                .split(';')
                .next()
                .unwrap_or(content_type)
                .trim()
                .to_ascii_lowercase();
            if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
                return Err(ClassifyError::UnsupportedMediaType(content_type));
            }
        }

        if bytes.len() > self.max_upload_bytes {
            return Err(ClassifyError::PayloadTooLarge(bytes.len(), self.max_upload_bytes));
        }

        let format = ImageLoader::detect_format(bytes).ok_or_else(|| {
            ClassifyError::UnsupportedMediaType("unrecognized image data".to_string())
        })?;
        if !ImageLoader::is_supported_format(format) {
            return Err(ClassifyError::UnsupportedMediaType(format!("{:?}", format)));
        }

        let extension = format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin");
        let name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        let dest = self.uploads_dir.join(&name);

        // 先写临时文件再rename，避免读者看到半写状态
        let tmp = self.uploads_dir.join(format!(".{}.tmp", name));
        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &dest) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!("Stored upload: {} ({} bytes)", name, bytes.len());

        Ok(ImageHandle(name))
    }

    /// 为编辑结果分配一个不会冲突的目标文件名（位于上传目录）
    pub fn allocate_derived(&self, source_handle: &str) -> Result<(ImageHandle, PathBuf)> {
        Self::validate_handle(source_handle)?;

        let extension = Path::new(source_handle)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string());

        let name = format!("edited-{}.{}", uuid::Uuid::new_v4(), extension);
        let path = self.uploads_dir.join(&name);
        Ok((ImageHandle(name), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_fn(8, 8, |x, y| image::Rgb([x as u8 * 16, y as u8 * 16, 128]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn test_store(max_upload_bytes: usize) -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("imagenet_subset");
        std::fs::create_dir_all(&samples).unwrap();
        let store = ImageStore::new(samples, dir.path().join("uploads"), max_upload_bytes).unwrap();
        (dir, store)
    }

    #[test]
    fn upload_round_trip_is_byte_identical() {
        let (_dir, store) = test_store(1024 * 1024);
        let bytes = png_bytes();

        let handle = store.store_upload(&bytes, Some("image/png")).unwrap();
        let path = store.resolve(handle.as_str()).unwrap();

        assert_eq!(std::fs::read(path).unwrap(), bytes);
    }

    #[test]
    fn upload_rejects_non_image_content_type() {
        let (_dir, store) = test_store(1024 * 1024);

        let err = store.store_upload(b"hello", Some("text/plain")).unwrap_err();
        assert!(matches!(err, ClassifyError::UnsupportedMediaType(_)));
    }

    #[test]
    fn upload_rejects_bytes_that_do_not_sniff_as_image() {
        let (_dir, store) = test_store(1024 * 1024);

        let err = store
            .store_upload(b"definitely not an image", Some("image/png"))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::UnsupportedMediaType(_)));
    }

    #[test]
    fn oversized_upload_rejected() {
        let (_dir, store) = test_store(16);

        let err = store.store_upload(&png_bytes(), Some("image/png")).unwrap_err();
        assert!(matches!(err, ClassifyError::PayloadTooLarge(_, _)));
    }

    #[test]
    fn traversal_handles_rejected() {
        let (_dir, store) = test_store(1024);

        for handle in ["../secret.png", "a/b.png", "/etc/passwd", "..", ""] {
            let err = store.resolve(handle).unwrap_err();
            assert!(
                matches!(err, ClassifyError::InvalidImageHandle(_)),
                "handle {:?} should be invalid",
                handle
            );
        }
    }

    #[test]
    fn missing_image_is_not_found() {
        let (_dir, store) = test_store(1024);

        let err = store.resolve("nope.jpg").unwrap_err();
        assert!(matches!(err, ClassifyError::ImageNotFound(_)));
    }

    #[test]
    fn list_images_covers_samples_and_uploads() {
        let (dir, store) = test_store(1024 * 1024);
        std::fs::write(dir.path().join("imagenet_subset/cat.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("imagenet_subset/notes.txt"), b"x").unwrap();
        let uploaded = store.store_upload(&png_bytes(), Some("image/png")).unwrap();

        let handles = store.list_images().unwrap();
        let names: Vec<&str> = handles.iter().map(|h| h.as_str()).collect();

        assert_eq!(names[0], "cat.jpg");
        assert!(names.contains(&uploaded.as_str()));
        assert!(!names.contains(&"notes.txt"));
    }

    #[test]
    fn derived_name_keeps_source_extension() {
        let (_dir, store) = test_store(1024);

        let (handle, path) = store.allocate_derived("cat.JPG").unwrap();
        assert!(handle.as_str().starts_with("edited-"));
        assert!(handle.as_str().ends_with(".jpg"));
        assert!(path.ends_with(handle.as_str()));
    }
}
