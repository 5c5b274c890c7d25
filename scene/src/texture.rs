use image::{DynamicImage, GenericImageView};

/// Unique identifier for a texture in the scene.
pub type TextureId = u32;

/// A decoded texture image that exists without GPU resources.
///
/// GPU textures are created lazily by the renderer; the generation counter
/// tells it when the image changed and must be re-uploaded.
#[derive(Debug, Clone)]
pub struct Texture {
    /// Unique identifier (assigned by Scene)
    pub id: TextureId,
    image: DynamicImage,
    generation: u64,
}

impl Texture {
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            id: 0,
            image,
            generation: 1,
        }
    }

    /// Decodes PNG or JPEG bytes.
    pub fn from_encoded(bytes: &[u8]) -> image::ImageResult<Self> {
        Ok(Self::from_image(image::load_from_memory(bytes)?))
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the image, forcing a GPU re-upload on the next frame.
    pub fn set_image(&mut self, image: DynamicImage) {
        self.image = image;
        self.generation += 1;
    }
}
