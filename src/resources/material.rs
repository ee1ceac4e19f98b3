use glam::Vec3;

/// Index of a decoded image inside the owning model's texture list.
pub type TextureIndex = usize;

/// Blinn-Phong style surface description read from an MTL file.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    /// MTL `d`; 1.0 is fully opaque.
    pub dissolve: f32,

    pub ambient_map: Option<TextureIndex>,
    pub diffuse_map: Option<TextureIndex>,
    pub specular_map: Option<TextureIndex>,
    pub shininess_map: Option<TextureIndex>,
    pub normal_map: Option<TextureIndex>,
    pub has_opacity_map: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            shininess: 0.0,
            dissolve: 1.0,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            shininess_map: None,
            normal_map: None,
            has_opacity_map: false,
        }
    }
}

impl Material {
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        !self.has_opacity_map && self.dissolve >= 1.0
    }

    /// Scalar specular intensity stored in the G-buffer.
    #[must_use]
    pub fn specular_intensity(&self) -> f32 {
        self.specular.max_element()
    }
}
