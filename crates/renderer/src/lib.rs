//! Renderer: wgpu init + depth + per-lesson pipelines.
//! Lessons: clear, flat triangle, triangle через MVP, lit OBJ mesh.

use std::num::NonZeroU64;
use std::sync::Arc;

use asset::{MeshData, MeshVertex};
use bytemuck::{Pod, Zeroable};
use corelib::{Camera, Transform, Vec3, vec3};
use wgpu::{
    util::DeviceExt, BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState,
    ColorWrites, CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexBufferLayout, VertexState, VertexStepMode,
};
use winit::{dpi::PhysicalSize, window::Window};

/// One incremental lesson, from clearing the window up to a lit mesh.
#[derive(Debug)]
pub enum Lesson {
    /// Clear to light gray, draw nothing.
    Clear,
    /// Flat-colored triangle in NDC, no transforms.
    Triangle,
    /// The same triangle through a model-view-projection transform.
    TriangleMvp,
    /// Lit OBJ mesh rendered from its interleaved position+normal buffer.
    Mesh(MeshData),
}

impl Lesson {
    pub fn name(&self) -> &'static str {
        match self {
            Lesson::Clear => "clear",
            Lesson::Triangle => "triangle",
            Lesson::TriangleMvp => "mvp",
            Lesson::Mesh(_) => "mesh",
        }
    }
}

/// Vertex: position + color (flat-triangle lessons).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ColorVertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}
impl ColorVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<ColorVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };
}

/// Layout over [`asset::MeshVertex`]: stride 24, position at byte offset 0,
/// normal at byte offset 12. Matches `ObjLoader::interleaved_data`.
pub const MESH_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
};

/// Camera UBO for the color pipeline (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    mvp: [[f32; 4]; 4],
}

/// Scene UBO for the mesh pipeline: transforms + Blinn-Phong parameters.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4],
    light_color: [f32; 4],
    /// rgb = object color, w = shininess.
    object_color: [f32; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const LIGHT_GRAY: wgpu::Color = wgpu::Color {
    r: 0.8,
    g: 0.8,
    b: 0.8,
    a: 1.0,
};
const DARK_GRAY: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};

// Mesh-lesson scene: point light, white light, orange object.
const LIGHT_POS: Vec3 = Vec3::new(10.0, 10.0, 3.0);
const LIGHT_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);
const OBJECT_COLOR: Vec3 = Vec3::new(0.965, 0.404, 0.2);
const SHININESS: f32 = 10.0;

const FOV_Y_RAD: f32 = std::f32::consts::FRAC_PI_4; // 45°
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

fn mvp_lesson_camera(aspect: f32) -> Camera {
    Camera::from_eye_yaw(
        vec3(0.0, 0.0, 8.0),
        25f32.to_radians(),
        FOV_Y_RAD,
        Z_NEAR,
        Z_FAR,
        aspect,
    )
}

fn mesh_lesson_camera(aspect: f32) -> Camera {
    Camera::from_eye_yaw(vec3(0.0, 1.0, 4.0), 0.0, FOV_Y_RAD, Z_NEAR, Z_FAR, aspect)
}

/// Triangle with red/green/blue corners.
fn triangle_vertices() -> Vec<ColorVertex> {
    vec![
        ColorVertex {
            pos: [0.0, 0.5, 0.0],
            color: [1.0, 0.0, 0.0],
        },
        ColorVertex {
            pos: [-0.5, -0.5, 0.0],
            color: [0.0, 1.0, 0.0],
        },
        ColorVertex {
            pos: [0.5, -0.5, 0.0],
            color: [0.0, 0.0, 1.0],
        },
    ]
}

/// What a frame draws, with the GPU objects it needs.
enum DrawCall {
    /// Clear only.
    None,
    /// Color pipeline; `camera: None` means identity MVP.
    Colored {
        pipeline: RenderPipeline,
        vertex_buf: Buffer,
        vertex_count: u32,
        camera_buf: Buffer,
        camera_bg: BindGroup,
        camera: Option<Camera>,
    },
    /// Mesh pipeline with lighting.
    Mesh {
        pipeline: RenderPipeline,
        vertex_buf: Buffer,
        vertex_count: u32,
        scene_buf: Buffer,
        scene_bg: BindGroup,
        camera: Camera,
        model: Transform,
    },
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    #[allow(dead_code)]
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Per-lesson draw state
    draw: DrawCall,
    clear_color: wgpu::Color,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, set up for one lesson.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends, lesson: Lesson) -> Self {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .expect("create_surface failed");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("No suitable GPU adapter");

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Lessons Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .expect("request_device failed");

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        // Configure surface
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // Depth texture
        let depth_view = create_depth_view(&device, &surface_config);

        let clear_color = match lesson {
            Lesson::Clear => LIGHT_GRAY,
            _ => DARK_GRAY,
        };
        let aspect = width as f32 / height as f32;

        let draw = match lesson {
            Lesson::Clear => DrawCall::None,
            Lesson::Triangle => {
                build_colored_draw(&device, surface_format, triangle_vertices(), None)
            }
            Lesson::TriangleMvp => build_colored_draw(
                &device,
                surface_format,
                triangle_vertices(),
                Some(mvp_lesson_camera(aspect)),
            ),
            Lesson::Mesh(mesh) => build_mesh_draw(
                &device,
                surface_format,
                &mesh,
                mesh_lesson_camera(aspect),
                Transform::from_yaw(90f32.to_radians()),
            ),
        };

        Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            draw,
            clear_color,
            depth_view,
            width,
            height,
        }
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: update uniforms + clear + draw.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let aspect = self.width as f32 / self.height as f32;

        // --- update uniforms for the current aspect
        match &self.draw {
            DrawCall::None => {}
            DrawCall::Colored {
                camera_buf, camera, ..
            } => {
                let mvp = match camera {
                    Some(cam) => cam.with_aspect(aspect).proj_view(),
                    None => corelib::Mat4::IDENTITY,
                };
                let uniform = CameraUniform {
                    mvp: mvp.to_cols_array_2d(),
                };
                self.queue
                    .write_buffer(camera_buf, 0, bytemuck::bytes_of(&uniform));
            }
            DrawCall::Mesh {
                scene_buf,
                camera,
                model,
                ..
            } => {
                let cam = camera.with_aspect(aspect);
                let model_mat = model.matrix();
                let uniform = SceneUniform {
                    mvp: (cam.proj_view() * model_mat).to_cols_array_2d(),
                    model: model_mat.to_cols_array_2d(),
                    camera_pos: cam.eye.extend(1.0).to_array(),
                    light_pos: LIGHT_POS.extend(1.0).to_array(),
                    light_color: LIGHT_COLOR.extend(1.0).to_array(),
                    object_color: OBJECT_COLOR.extend(SHININESS).to_array(),
                };
                self.queue
                    .write_buffer(scene_buf, 0, bytemuck::bytes_of(&uniform));
            }
        }

        // --- frame & pass
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            match &self.draw {
                DrawCall::None => {}
                DrawCall::Colored {
                    pipeline,
                    vertex_buf,
                    vertex_count,
                    camera_bg,
                    ..
                } => {
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, camera_bg, &[]);
                    rpass.set_vertex_buffer(0, vertex_buf.slice(..));
                    rpass.draw(0..*vertex_count, 0..1);
                }
                DrawCall::Mesh {
                    pipeline,
                    vertex_buf,
                    vertex_count,
                    scene_bg,
                    ..
                } => {
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, scene_bg, &[]);
                    rpass.set_vertex_buffer(0, vertex_buf.slice(..));
                    rpass.draw(0..*vertex_count, 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Uniform bind group layout with a single buffer binding at 0.
fn uniform_bgl(device: &Device, label: &str, size: u64) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX_FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        }],
    })
}

fn build_pipeline(
    device: &Device,
    label: &str,
    surface_format: TextureFormat,
    shader_src: &str,
    vertex_layout: VertexBufferLayout<'_>,
    bgl: &BindGroupLayout,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(shader_src.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            // Исходные уроки не включают culling.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn build_colored_draw(
    device: &Device,
    surface_format: TextureFormat,
    vertices: Vec<ColorVertex>,
    camera: Option<Camera>,
) -> DrawCall {
    let camera_bgl = uniform_bgl(
        device,
        "Camera BGL",
        std::mem::size_of::<CameraUniform>() as u64,
    );
    let camera_init = CameraUniform {
        mvp: corelib::Mat4::IDENTITY.to_cols_array_2d(),
    };
    let camera_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera UBO"),
        contents: bytemuck::bytes_of(&camera_init),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Camera BG"),
        layout: &camera_bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: camera_buf.as_entire_binding(),
        }],
    });
    let pipeline = build_pipeline(
        device,
        "Color Pipeline",
        surface_format,
        include_str!("shaders/color.wgsl"),
        ColorVertex::LAYOUT,
        &camera_bgl,
    );
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Triangle VB"),
        contents: bytemuck::cast_slice(&vertices),
        usage: BufferUsages::VERTEX,
    });
    DrawCall::Colored {
        pipeline,
        vertex_buf,
        vertex_count: vertices.len() as u32,
        camera_buf,
        camera_bg,
        camera,
    }
}

fn build_mesh_draw(
    device: &Device,
    surface_format: TextureFormat,
    mesh: &MeshData,
    camera: Camera,
    model: Transform,
) -> DrawCall {
    let scene_bgl = uniform_bgl(
        device,
        "Scene BGL",
        std::mem::size_of::<SceneUniform>() as u64,
    );
    let scene_init = SceneUniform::zeroed();
    let scene_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Scene UBO"),
        contents: bytemuck::bytes_of(&scene_init),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let scene_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Scene BG"),
        layout: &scene_bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: scene_buf.as_entire_binding(),
        }],
    });
    let pipeline = build_pipeline(
        device,
        "Mesh Pipeline",
        surface_format,
        include_str!("shaders/mesh.wgsl"),
        MESH_VERTEX_LAYOUT,
        &scene_bgl,
    );
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh VB"),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: BufferUsages::VERTEX,
    });
    log::info!("Mesh uploaded: {} vertices", mesh.vertex_count());
    DrawCall::Mesh {
        pipeline,
        vertex_buf,
        vertex_count: mesh.vertex_count() as u32,
        scene_buf,
        scene_bg,
        camera,
        model,
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_matches_lesson_geometry() {
        let v = triangle_vertices();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].pos, [0.0, 0.5, 0.0]);
        assert_eq!(v[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(v[1].pos, [-0.5, -0.5, 0.0]);
        assert_eq!(v[2].pos, [0.5, -0.5, 0.0]);
    }

    #[test]
    fn mesh_layout_matches_interleave_contract() {
        assert_eq!(MESH_VERTEX_LAYOUT.array_stride, 24);
        assert_eq!(MESH_VERTEX_LAYOUT.attributes[0].offset, 0);
        assert_eq!(MESH_VERTEX_LAYOUT.attributes[1].offset, 12);
    }

    #[test]
    fn scene_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn lesson_names() {
        assert_eq!(Lesson::Clear.name(), "clear");
        assert_eq!(Lesson::Mesh(MeshData::default()).name(), "mesh");
    }
}
