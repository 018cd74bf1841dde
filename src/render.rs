use crate::core::{CancelToken, OverlayError, SurfaceSize, CRT_WGSL};
use crate::dom;
use crate::frame::FrameLoop;
use crate::resize::ResizeCoordinator;
use instant::Instant;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CrtUniforms {
    resolution: [f32; 2],
    time: f32,
    _pad: f32,
}

// Two triangles covering clip space.
const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// GPU side of the CRT layer: one pipeline, one quad, two live uniforms.
pub struct CrtRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    quad: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    started: Instant,
}

impl CrtRenderer {
    pub async fn new(
        canvas: &web::HtmlCanvasElement,
        size: SurfaceSize,
    ) -> Result<Self, OverlayError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| OverlayError::Unsupported(format!("surface: {e}")))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| OverlayError::Unsupported("no WebGPU adapter".into()))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: Some("crt_device"),
                },
                None,
            )
            .await
            .map_err(|e| OverlayError::Unsupported(format!("request_device: {e:?}")))?;
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            log::error!("[crt] uncaptured GPU error: {}", e);
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| OverlayError::Unsupported("no surface formats".into()))?;
        // Blending over a transparent clear leaves premultiplied pixels.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|m| caps.alpha_modes.contains(m))
        .ok_or_else(|| OverlayError::Unsupported("canvas cannot composite with alpha".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("crt_shader"),
            source: wgpu::ShaderSource::Wgsl(CRT_WGSL.into()),
        });
        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("crt_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("crt_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("crt_pipeline"),
            layout: Some(&pl),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &QUAD_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            cache: None,
            multiview: None,
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(OverlayError::ShaderCompile(err.to_string()));
        }

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("crt_quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("crt_uniforms"),
            size: std::mem::size_of::<CrtUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("crt_bg"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            quad,
            uniform_buffer,
            bind_group,
            started: Instant::now(),
        })
    }

    pub fn resize_if_needed(&mut self, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if size.width != self.config.width || size.height != self.config.height {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Clear to transparent and draw one frame of the effect.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let uniforms = CrtUniforms {
            resolution: [self.config.width as f32, self.config.height as f32],
            time: self.started.elapsed().as_secs_f32(),
            _pad: 0.0,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("crt_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("crt_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad.slice(..));
            rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[derive(Default)]
struct EffectParts {
    resize: Option<ResizeCoordinator>,
    frames: Option<FrameLoop>,
}

/// The mounted CRT layer: a resize coordinator plus, once the GPU program is
/// ready, an animation loop. Failures leave the layer disabled, never thrown.
pub struct ShaderEffect {
    cancel: CancelToken,
    parts: Rc<RefCell<EffectParts>>,
}

impl ShaderEffect {
    pub fn mount(canvas: web::HtmlCanvasElement) -> Self {
        let cancel = CancelToken::new();
        dom::apply_overlay_style(&canvas);
        let resize = ResizeCoordinator::new(&canvas);
        let resolution = resize.shared_resolution();
        let parts = Rc::new(RefCell::new(EffectParts {
            resize: Some(resize),
            frames: None,
        }));

        let cancel_init = cancel.clone();
        let parts_init = parts.clone();
        spawn_local(async move {
            let renderer = CrtRenderer::new(&canvas, resolution.get()).await;
            if cancel_init.is_cancelled() {
                return;
            }
            match renderer {
                Ok(renderer) => {
                    let frames = start_render_loop(renderer, resolution);
                    parts_init.borrow_mut().frames = Some(frames);
                    log::info!("[crt] overlay running");
                }
                Err(e) => {
                    match &e {
                        OverlayError::ShaderCompile(_) => log::error!("[crt] disabled: {}", e),
                        _ => log::warn!("[crt] disabled: {}", e),
                    }
                    if let Some(mut r) = parts_init.borrow_mut().resize.take() {
                        r.teardown();
                    }
                }
            }
        });

        Self { cancel, parts }
    }

    pub fn is_running(&self) -> bool {
        self.parts
            .borrow()
            .frames
            .as_ref()
            .map(FrameLoop::is_running)
            .unwrap_or(false)
    }

    /// Cancel the loop and drop the resize listener. Idempotent; safe before
    /// the GPU program finished initializing.
    pub fn unmount(&self) {
        if !self.cancel.cancel() {
            return;
        }
        let (frames, resize) = {
            let mut p = self.parts.borrow_mut();
            (p.frames.take(), p.resize.take())
        };
        if let Some(f) = frames {
            f.cancel();
        }
        if let Some(mut r) = resize {
            r.teardown();
        }
    }
}

fn start_render_loop(mut renderer: CrtRenderer, resolution: Rc<Cell<SurfaceSize>>) -> FrameLoop {
    FrameLoop::start(move || {
        renderer.resize_if_needed(resolution.get());
        if let Err(e) = renderer.render() {
            log::error!("[crt] render error: {:?}", e);
        }
    })
}
