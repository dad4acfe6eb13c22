//! Application icon preparation.

use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
};
use image::{ImageFormat, Rgba, RgbaImage, imageops::FilterType};
use std::io::Cursor;

/// Edge length of the PNG icon shipped with Linux targets.
pub const ICON_SIZE: u32 = 256;

/// Sizes embedded in the Windows `.ico`.
const ICO_SIZES: [u32; 4] = [256, 48, 32, 16];

/// A square RGBA application icon.
#[derive(Clone, Debug)]
pub struct AppIcon {
    image: RgbaImage,
    placeholder: bool,
}

impl AppIcon {
    /// Load the configured icon, resized to [`ICON_SIZE`]. A generated
    /// placeholder is used when no icon is configured or the file is absent.
    pub fn load(settings: &Settings) -> Result<Self> {
        match settings.icon_path() {
            Some(path) if path.is_file() => {
                let image = image::open(&path)?
                    .resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3)
                    .to_rgba8();
                log::debug!("Using icon {}", path.display());
                Ok(Self {
                    image,
                    placeholder: false,
                })
            }
            Some(path) => {
                log::warn!(
                    "Icon {} not found; generating a placeholder",
                    path.display()
                );
                Ok(Self::placeholder())
            }
            None => Ok(Self::placeholder()),
        }
    }

    /// Plain generated icon: a filled circle on a transparent background.
    pub fn placeholder() -> Self {
        let center = ICON_SIZE as f32 / 2.0;
        let radius = center - 8.0;
        let image = RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            if dx * dx + dy * dy <= radius * radius {
                let shade = (96.0 + 96.0 * (y as f32 / ICON_SIZE as f32)) as u8;
                Rgba([40, shade, 200, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        Self {
            image,
            placeholder: true,
        }
    }

    /// Whether this is the generated placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// PNG encoding.
    pub fn png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Multi-resolution Windows icon.
    pub fn ico(&self) -> Result<Vec<u8>> {
        let mut dir = ico::IconDir::new(ico::ResourceType::Icon);
        for size in ICO_SIZES {
            let scaled = if size == ICON_SIZE {
                self.image.clone()
            } else {
                image::imageops::resize(&self.image, size, size, FilterType::Lanczos3)
            };
            let entry = ico::IconImage::from_rgba_data(size, size, scaled.into_raw());
            dir.add_entry(ico::IconDirEntry::encode(&entry)?);
        }

        let mut bytes = Vec::new();
        dir.write(&mut bytes)
            .map_err(|e| Error::GenericError(format!("failed to write .ico: {e}")))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    #[test]
    fn missing_icon_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new().source_dir(dir.path()).build().unwrap();
        let icon = AppIcon::load(&settings).unwrap();
        assert!(icon.is_placeholder());

        let png = icon.png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn configured_icon_is_resized() {
        let dir = tempfile::tempdir().unwrap();
        let img_dir = dir.path().join("gui_data/img");
        std::fs::create_dir_all(&img_dir).unwrap();
        RgbaImage::from_pixel(32, 32, Rgba([255, 0, 0, 255]))
            .save(img_dir.join("app_icon.png"))
            .unwrap();

        let settings = SettingsBuilder::new().source_dir(dir.path()).build().unwrap();
        let icon = AppIcon::load(&settings).unwrap();
        assert!(!icon.is_placeholder());

        let decoded = image::load_from_memory(&icon.png().unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (ICON_SIZE, ICON_SIZE));
    }

    #[test]
    fn ico_starts_with_icon_header() {
        let ico = AppIcon::placeholder().ico().unwrap();
        assert_eq!(&ico[0..4], &[0, 0, 1, 0]);
    }
}
