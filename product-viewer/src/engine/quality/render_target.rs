use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat, TextureUsages};

use crate::engine::quality::viewport::Viewport;

/// Offscreen image the viewer camera renders into. Its size follows
/// `Viewport::physical_size`, so the window itself never changes.
#[derive(Resource, Debug, Clone, Default)]
pub struct ViewerRenderTarget(pub Handle<Image>);

fn extent(size: UVec2) -> Extent3d {
    Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    }
}

pub fn render_target_image(size: UVec2) -> Image {
    let mut image = Image::new_fill(
        extent(size),
        TextureDimension::D2,
        &[255, 255, 255, 255],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.texture_descriptor.label = Some("viewer_render_target");
    image.texture_descriptor.usage = TextureUsages::RENDER_ATTACHMENT
        | TextureUsages::TEXTURE_BINDING
        | TextureUsages::COPY_DST;
    image
}

pub fn create_render_target(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    viewport: Res<Viewport>,
) {
    let size = viewport.physical_size();
    let handle = images.add(render_target_image(size));
    commands.insert_resource(ViewerRenderTarget(handle));
    debug!("Render target allocated at {}x{}", size.x, size.y);
}

/// Reallocate the render target whenever the viewport's physical size moves,
/// either from a resize or from the adaptive pixel ratio.
pub fn resize_render_target(
    viewport: Res<Viewport>,
    target: Res<ViewerRenderTarget>,
    mut images: ResMut<Assets<Image>>,
) {
    if !viewport.is_changed() {
        return;
    }

    let size = viewport.physical_size();
    // Read first so an unchanged size does not mark the asset modified.
    let Some(current) = images.get(&target.0).map(Image::size) else {
        return;
    };
    if current == size {
        return;
    }

    if let Some(image) = images.get_mut(&target.0) {
        image.resize(extent(size));
        debug!(
            "Render target {}x{} -> {}x{} (pixel ratio {:.2})",
            current.x, current.y, size.x, size.y, viewport.pixel_ratio
        );
    }
}
