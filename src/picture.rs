use crate::config::MediaSize;
use image::{DynamicImage, RgbaImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_PICTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded still or camera frame. Cheap to clone; `id` changes whenever
/// the pixels do so displays can cache uploads.
#[derive(Clone)]
pub struct Picture {
    pub id: u64,
    pub pixels: Arc<RgbaImage>,
}

impl Picture {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            id: NEXT_PICTURE_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Arc::new(image.to_rgba8()),
        }
    }

    pub fn size(&self) -> MediaSize {
        MediaSize {
            width: self.pixels.width() as f32,
            height: self.pixels.height() as f32,
        }
    }
}

impl std::fmt::Debug for Picture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Picture#{}({}x{})",
            self.id,
            self.pixels.width(),
            self.pixels.height()
        )
    }
}

impl PartialEq for Picture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pictures_get_distinct_ids() {
        let a = Picture::new(DynamicImage::new_rgb8(4, 2));
        let b = Picture::new(DynamicImage::new_rgb8(4, 2));

        assert_ne!(a.id, b.id);
        assert_eq!(a.size(), MediaSize { width: 4.0, height: 2.0 });
        assert_eq!(format!("{:?}", a), format!("Picture#{}(4x2)", a.id));
    }
}
