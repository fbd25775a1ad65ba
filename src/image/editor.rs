use crate::utils::error::ClassifyError;
use crate::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::Path;

/// 3x3平滑核，锐度增强的退化图像
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

/// 四个光度编辑因子，1.0为恒等变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditSpec {
    pub color: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub sharpness: f32,
}

impl EditSpec {
    pub const IDENTITY: EditSpec = EditSpec {
        color: 1.0,
        brightness: 1.0,
        contrast: 1.0,
        sharpness: 1.0,
    };

    pub fn new(color: f32, brightness: f32, contrast: f32, sharpness: f32) -> Self {
        Self {
            color,
            brightness,
            contrast,
            sharpness,
        }
    }

    /// 所有因子必须是有限的非负数
    pub fn validate(&self) -> Result<()> {
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

impl Default for EditSpec {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 图像编辑器：按固定顺序应用 color -> brightness -> contrast -> sharpness
pub struct ImageEditor;

impl ImageEditor {
    /// 对解码后的图像应用全部编辑因子
    pub fn apply(image: &DynamicImage, spec: &EditSpec) -> Result<RgbImage> {
        spec.validate()?;

        let mut current = image.to_rgb8();

        if spec.color != 1.0 {
            current = Self::enhance_color(&current, spec.color);
        }
        if spec.brightness != 1.0 {
            current = Self::enhance_brightness(&current, spec.brightness);
        }
        if spec.contrast != 1.0 {
            current = Self::enhance_contrast(&current, spec.contrast);
        }
        if spec.sharpness != 1.0 {
            current = Self::enhance_sharpness(&current, spec.sharpness);
        }

        Ok(current)
    }

    /// 编辑源文件并将结果原子性地写入目标路径
    ///
    /// 失败时源文件和已有的目标文件都保持不变。
    pub fn edit_file(source: &Path, spec: &EditSpec, dest: &Path) -> Result<()> {
        spec.validate()?;

        if !source.is_file() {
            return Err(ClassifyError::ImageNotFound(source.display().to_string()));
        }

        let image = image::open(source)?;
        let edited = Self::apply(&image, spec)?;

        let format = ImageFormat::from_path(dest)
            .map_err(|_| ClassifyError::InvalidInput(format!(
                "Cannot infer image format from destination: {}",
                dest.display()
            )))?;

        // 先写临时文件再rename，并发读者不会看到半写文件
        let file_name = dest
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClassifyError::InvalidInput(format!(
                "Invalid destination path: {}",
                dest.display()
            )))?;
        let tmp = dest.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        if let Err(e) = edited.save_with_format(&tmp, format) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&tmp, dest) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    /// 色彩饱和度：向灰度图插值
    fn enhance_color(image: &RgbImage, factor: f32) -> RgbImage {
        let (width, height) = image.dimensions();
        let mut out = RgbImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let gray = Self::luma(pixel);
            let mut blended = [0u8; 3];
            for c in 0..3 {
                blended[c] = Self::blend(gray, pixel[c] as f32, factor);
            }
            out.put_pixel(x, y, Rgb(blended));
        }

        out
    }

    /// 亮度：向黑色插值，等价于逐通道乘以因子
    fn enhance_brightness(image: &RgbImage, factor: f32) -> RgbImage {
        let (width, height) = image.dimensions();
        let mut out = RgbImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let mut blended = [0u8; 3];
            for c in 0..3 {
                blended[c] = Self::blend(0.0, pixel[c] as f32, factor);
            }
            out.put_pixel(x, y, Rgb(blended));
        }

        out
    }

    /// 对比度：向整图平均灰度插值
    fn enhance_contrast(image: &RgbImage, factor: f32) -> RgbImage {
        let (width, height) = image.dimensions();
        let pixel_count = (width as f32) * (height as f32);

        let mean: f32 = image
            .pixels()
            .map(Self::luma)
            .sum::<f32>()
            / pixel_count.max(1.0);
        let mean = mean.round();

        let mut out = RgbImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels() {
            let mut blended = [0u8; 3];
            for c in 0..3 {
                blended[c] = Self::blend(mean, pixel[c] as f32, factor);
            }
            out.put_pixel(x, y, Rgb(blended));
        }

        out
    }

    /// 锐度：向平滑图像插值，因子大于1时反向外推产生锐化
    fn enhance_sharpness(image: &RgbImage, factor: f32) -> RgbImage {
        let smoothed = image::imageops::filter3x3(image, &SMOOTH_KERNEL);
        let (width, height) = image.dimensions();
        let mut out = RgbImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let degenerate = smoothed.get_pixel(x, y);
            let mut blended = [0u8; 3];
            for c in 0..3 {
                blended[c] = Self::blend(degenerate[c] as f32, pixel[c] as f32, factor);
            }
            out.put_pixel(x, y, Rgb(blended));
        }

        out
    }

    fn luma(pixel: &Rgb<u8>) -> f32 {
        pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114
    }

    /// degenerate + (original - degenerate) * factor，量化回u8
    fn blend(degenerate: f32, original: f32, factor: f32) -> u8 {
        (degenerate + (original - degenerate) * factor)
            .round()
            .clamp(0.0, 255.0) as u8
    }
}
