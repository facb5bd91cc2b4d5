use std::marker::PhantomData;

use bevy::{
    core_pipeline::fullscreen_vertex_shader::fullscreen_shader_vertex_state,
    ecs::query::QueryItem,
    prelude::*,
    render::{
        RenderApp,
        extract_component::{
            ComponentUniforms, DynamicUniformIndex, ExtractComponent, ExtractComponentPlugin,
            UniformComponentPlugin,
        },
        render_graph::{
            NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode,
            ViewNodeRunner,
        },
        render_resource::{
            binding_types::{sampler, texture_2d, uniform_buffer},
            encase::internal::WriteInto,
            *,
        },
        renderer::{RenderContext, RenderDevice},
        view::ViewTarget,
    },
};

/// Render graph labels of the stylistic passes.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, RenderLabel)]
pub enum StylisticPassLabel {
    DotScreen,
    Glitch,
    RgbShift,
}

/// A fullscreen colour effect driven by one uniform block.
///
/// The effect runs on a view only while its settings component is on the
/// camera, so removing the component disables the pass.
pub trait PostEffect:
    Component + ExtractComponent<Out = Self> + ShaderType + WriteInto + Clone
{
    const SHADER_PATH: &'static str;
    const LABEL: StylisticPassLabel;
    const NAME: &'static str;
}

/// Extracts, uploads and renders one [`PostEffect`]. Graph edges are added
/// by the caller so several effects can be chained in a fixed order.
pub struct PostEffectPlugin<E>(PhantomData<fn() -> E>);

impl<E> Default for PostEffectPlugin<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E: PostEffect> Plugin for PostEffectPlugin<E> {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ExtractComponentPlugin::<E>::default(),
            UniformComponentPlugin::<E>::default(),
        ));

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.add_render_graph_node::<ViewNodeRunner<PostEffectNode<E>>>(
            bevy::core_pipeline::core_3d::graph::Core3d,
            E::LABEL,
        );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<PostEffectPipeline<E>>();
    }
}

struct PostEffectNode<E>(PhantomData<fn() -> E>);

impl<E> Default for PostEffectNode<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E: PostEffect> ViewNode for PostEffectNode<E> {
    type ViewQuery = (&'static ViewTarget, &'static DynamicUniformIndex<E>);

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (view_target, settings_index): QueryItem<Self::ViewQuery>,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let effect_pipeline = world.resource::<PostEffectPipeline<E>>();
        let pipeline_cache = world.resource::<PipelineCache>();

        let Some(pipeline) = pipeline_cache.get_render_pipeline(effect_pipeline.pipeline_id) else {
            return Ok(());
        };

        let settings_uniforms = world.resource::<ComponentUniforms<E>>();
        let Some(settings_binding) = settings_uniforms.uniforms().binding() else {
            return Ok(());
        };

        let post_process = view_target.post_process_write();

        let bind_group = render_context.render_device().create_bind_group(
            E::NAME,
            &effect_pipeline.layout,
            &BindGroupEntries::sequential((
                post_process.source,
                &effect_pipeline.sampler,
                settings_binding.clone(),
            )),
        );

        let mut render_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some(E::NAME),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: post_process.destination,
                resolve_target: None,
                ops: Operations::default(),
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_render_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[settings_index.index()]);
        render_pass.draw(0..3, 0..1);

        Ok(())
    }
}

#[derive(Resource)]
struct PostEffectPipeline<E> {
    layout: BindGroupLayout,
    sampler: Sampler,
    pipeline_id: CachedRenderPipelineId,
    marker: PhantomData<fn() -> E>,
}

impl<E: PostEffect> FromWorld for PostEffectPipeline<E> {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();

        let layout = render_device.create_bind_group_layout(
            E::NAME,
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (
                    texture_2d(TextureSampleType::Float { filterable: true }),
                    sampler(SamplerBindingType::Filtering),
                    uniform_buffer::<E>(true),
                ),
            ),
        );

        let sampler = render_device.create_sampler(&SamplerDescriptor {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            ..default()
        });

        let shader = world.load_asset(E::SHADER_PATH);

        let pipeline_id =
            world
                .resource_mut::<PipelineCache>()
                .queue_render_pipeline(RenderPipelineDescriptor {
                    label: Some(E::NAME.into()),
                    layout: vec![layout.clone()],
                    vertex: fullscreen_shader_vertex_state(),
                    fragment: Some(FragmentState {
                        shader,
                        shader_defs: vec![],
                        entry_point: "fragment".into(),
                        // Stylistic passes run before tone mapping on an HDR view.
                        targets: vec![Some(ColorTargetState {
                            format: ViewTarget::TEXTURE_FORMAT_HDR,
                            blend: None,
                            write_mask: ColorWrites::ALL,
                        })],
                    }),
                    primitive: PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: MultisampleState::default(),
                    push_constant_ranges: vec![],
                    zero_initialize_workgroup_memory: false,
                });

        Self {
            layout,
            sampler,
            pipeline_id,
            marker: PhantomData,
        }
    }
}
