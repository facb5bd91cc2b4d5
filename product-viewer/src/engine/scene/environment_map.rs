use std::f32::consts::{PI, TAU};

use bevy::image::TextureAccessError;
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{
    Extent3d, TextureDimension, TextureFormat, TextureViewDescriptor, TextureViewDimension,
};
use half::f16;
use thiserror::Error;

/// Cube faces in GPU layer order.
pub const CUBE_FACES: usize = 6;

/// Irradiance is integrated over the first mip at or below this size.
const IRRADIANCE_SOURCE_SIZE: u32 = 8;

#[derive(Debug, Error)]
pub enum EnvironmentMapError {
    #[error("source image has no texels")]
    Empty,
    #[error("source image is not a 2D texture")]
    NotTwoDimensional,
    #[error("could not read texel ({x}, {y})")]
    Texel {
        x: u32,
        y: u32,
        #[source]
        source: TextureAccessError,
    },
    #[error("cubemap face size must be a power of two, got {0}")]
    InvalidFaceSize(u32),
}

/// Direction through texel coordinates `(s, t)` in `[-1, 1]` of a cube face,
/// in cubemap space. `t` grows downwards.
pub fn face_direction(face: usize, s: f32, t: f32) -> Vec3 {
    let direction = match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    };
    direction.normalize()
}

/// Cubemaps are sampled left-handed, so world space flips z.
fn world_direction(cube_direction: Vec3) -> Vec3 {
    Vec3::new(cube_direction.x, cube_direction.y, -cube_direction.z)
}

/// Texel centre in `[-1, 1]` face coordinates.
fn texel_coordinate(index: u32, size: u32) -> f32 {
    (index as f32 + 0.5) / size as f32 * 2.0 - 1.0
}

/// Linear radiance of an equirectangular (latitude/longitude) image.
#[derive(Debug, Clone)]
pub struct EquirectangularMap {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
}

impl EquirectangularMap {
    pub fn from_image(image: &Image) -> Result<Self, EnvironmentMapError> {
        if image.texture_descriptor.dimension != TextureDimension::D2 {
            return Err(EnvironmentMapError::NotTwoDimensional);
        }
        let UVec2 {
            x: width,
            y: height,
        } = image.size();
        if width == 0 || height == 0 {
            return Err(EnvironmentMapError::Empty);
        }

        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let colour = image
                    .get_color_at(x, y)
                    .map_err(|source| EnvironmentMapError::Texel { x, y, source })?
                    .to_linear();
                texels.push(Vec3::new(colour.red, colour.green, colour.blue));
            }
        }

        Ok(Self {
            width,
            height,
            texels,
        })
    }

    fn texel(&self, x: i64, y: i64) -> Vec3 {
        let x = x.rem_euclid(self.width as i64) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.texels[(y * self.width + x) as usize]
    }

    /// Bilinear radiance along a world-space direction. Longitude wraps,
    /// latitude clamps at the poles.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let direction = direction.try_normalize().unwrap_or(Vec3::Y);
        let u = 0.5 + direction.z.atan2(direction.x) / TAU;
        let v = 0.5 - direction.y.clamp(-1.0, 1.0).asin() / PI;

        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), tx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }
}

/// One mip level of a cubemap, faces stored back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapLevel {
    size: u32,
    texels: Vec<Vec3>,
}

impl CubemapLevel {
    pub fn from_equirectangular(map: &EquirectangularMap, size: u32) -> Self {
        Self::from_fn(size, |direction| map.sample(direction))
    }

    fn from_fn(size: u32, mut radiance: impl FnMut(Vec3) -> Vec3) -> Self {
        let mut texels = Vec::with_capacity(CUBE_FACES * (size * size) as usize);
        for face in 0..CUBE_FACES {
            for y in 0..size {
                for x in 0..size {
                    let direction = face_direction(
                        face,
                        texel_coordinate(x, size),
                        texel_coordinate(y, size),
                    );
                    texels.push(radiance(world_direction(direction)));
                }
            }
        }
        Self { size, texels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: usize) -> &[Vec3] {
        let face_len = (self.size * self.size) as usize;
        &self.texels[face * face_len..(face + 1) * face_len]
    }

    fn texel(&self, face: usize, x: u32, y: u32) -> Vec3 {
        self.face(face)[(y * self.size + x) as usize]
    }

    /// Box-filter to half resolution.
    pub fn downsample(&self) -> Self {
        let size = (self.size / 2).max(1);
        let mut texels = Vec::with_capacity(CUBE_FACES * (size * size) as usize);
        for face in 0..CUBE_FACES {
            for y in 0..size {
                for x in 0..size {
                    let (sx, sy) = (x * 2, y * 2);
                    let sum = self.texel(face, sx, sy)
                        + self.texel(face, (sx + 1).min(self.size - 1), sy)
                        + self.texel(face, sx, (sy + 1).min(self.size - 1))
                        + self.texel(face, (sx + 1).min(self.size - 1), (sy + 1).min(self.size - 1));
                    texels.push(sum / 4.0);
                }
            }
        }
        Self { size, texels }
    }

    /// Cosine-weighted irradiance over this level, normalized so a constant
    /// environment keeps its value.
    pub fn irradiance(&self, size: u32) -> Self {
        let mut samples = Vec::with_capacity(self.texels.len());
        for face in 0..CUBE_FACES {
            for y in 0..self.size {
                for x in 0..self.size {
                    let s = texel_coordinate(x, self.size);
                    let t = texel_coordinate(y, self.size);
                    let solid_angle = (1.0 + s * s + t * t).powf(-1.5);
                    let direction = world_direction(face_direction(face, s, t));
                    samples.push((direction, solid_angle, self.texel(face, x, y)));
                }
            }
        }

        Self::from_fn(size, |normal| {
            let mut total = Vec3::ZERO;
            let mut weight = 0.0;
            for &(direction, solid_angle, radiance) in &samples {
                let w = normal.dot(direction).max(0.0) * solid_angle;
                total += radiance * w;
                weight += w;
            }
            if weight > 0.0 { total / weight } else { Vec3::ZERO }
        })
    }
}

/// Pack mip levels into a cube texture, layer by layer.
fn cubemap_image(levels: &[CubemapLevel]) -> Image {
    let size = levels.first().map_or(1, CubemapLevel::size);
    let texel_count: usize = levels.iter().map(|level| level.texels.len()).sum();
    let mut data = Vec::with_capacity(texel_count * 8);

    for face in 0..CUBE_FACES {
        for level in levels {
            for radiance in level.face(face) {
                for channel in [radiance.x, radiance.y, radiance.z, 1.0] {
                    data.extend_from_slice(&f16::from_f32(channel).to_le_bytes());
                }
            }
        }
    }

    let mut image = Image::new_uninit(
        Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: CUBE_FACES as u32,
        },
        TextureDimension::D2,
        TextureFormat::Rgba16Float,
        RenderAssetUsages::RENDER_WORLD,
    );
    image.texture_descriptor.mip_level_count = levels.len().max(1) as u32;
    image.texture_view_descriptor = Some(TextureViewDescriptor {
        dimension: Some(TextureViewDimension::Cube),
        ..default()
    });
    image.data = Some(data);
    image
}

pub struct EnvironmentMaps {
    /// Full mip chain; rougher surfaces read smaller mips.
    pub specular: Image,
    pub diffuse: Image,
}

/// Convert an equirectangular HDR image into specular and diffuse cubemaps.
pub fn build_environment_maps(
    source: &Image,
    specular_size: u32,
    diffuse_size: u32,
) -> Result<EnvironmentMaps, EnvironmentMapError> {
    for size in [specular_size, diffuse_size] {
        if !size.is_power_of_two() {
            return Err(EnvironmentMapError::InvalidFaceSize(size));
        }
    }

    let map = EquirectangularMap::from_image(source)?;
    let mut chain = vec![CubemapLevel::from_equirectangular(&map, specular_size)];
    while let Some(level) = chain.last().filter(|level| level.size() > 1) {
        let next = level.downsample();
        chain.push(next);
    }

    let diffuse = match chain
        .iter()
        .find(|level| level.size() <= IRRADIANCE_SOURCE_SIZE)
        .or(chain.last())
    {
        Some(level) => level.irradiance(diffuse_size),
        None => return Err(EnvironmentMapError::Empty),
    };

    Ok(EnvironmentMaps {
        specular: cubemap_image(&chain),
        diffuse: cubemap_image(std::slice::from_ref(&diffuse)),
    })
}
