// src/renderer/primitive.rs - batched colored rects
use glam::Mat4;
use crate::errors::TentacleError;
use super::frame::Rect;

pub const MAX_RECTS: usize = 2048;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct PrimitiveVertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl PrimitiveVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x4,
    ];

    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PrimitiveVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PrimitiveUniform {
    view_proj: [[f32; 4]; 4],
}

/// Top-left origin, y down, one unit per view pixel.
pub fn view_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1) as f32, height.max(1) as f32, 0.0, -1.0, 1.0)
}

fn build_quads(rects: &[Rect], capacity: usize) -> (Vec<PrimitiveVertex>, Vec<u16>) {
    let count = rects.len().min(capacity);
    let mut vertices = Vec::with_capacity(count * 4);
    let mut indices = Vec::with_capacity(count * 6);

    for rect in &rects[..count] {
        let base = vertices.len() as u16;
        let color = rect.color;
        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);

        vertices.push(PrimitiveVertex { position: [x, y], color });
        vertices.push(PrimitiveVertex { position: [x + w, y], color });
        vertices.push(PrimitiveVertex { position: [x + w, y + h], color });
        vertices.push(PrimitiveVertex { position: [x, y + h], color });

        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    (vertices, indices)
}

pub struct PrimitiveRenderer {
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    index_count: u32,
}

impl PrimitiveRenderer {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> Result<Self, TentacleError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Primitive Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/primitive.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Primitive Uniform Buffer"),
            size: std::mem::size_of::<PrimitiveUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Primitive Uniform Bind Group Layout"),
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("Primitive Uniform Bind Group"),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Primitive Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Primitive Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[PrimitiveVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Primitive Vertex Buffer"),
            size: (MAX_RECTS * 4 * std::mem::size_of::<PrimitiveVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Primitive Index Buffer"),
            size: (MAX_RECTS * 6 * std::mem::size_of::<u16>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            render_pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            uniform_bind_group,
            index_count: 0,
        })
    }

    /// Uploads this frame's rects. Anything past `MAX_RECTS` is dropped.
    pub fn prepare(&mut self, queue: &wgpu::Queue, rects: &[Rect], view: (u32, u32)) {
        if rects.len() > MAX_RECTS {
            log::warn!("{} rects queued, drawing the first {}", rects.len(), MAX_RECTS);
        }

        let (vertices, indices) = build_quads(rects, MAX_RECTS);
        self.index_count = indices.len() as u32;
        if vertices.is_empty() {
            return;
        }

        let uniform = PrimitiveUniform {
            view_proj: view_projection(view.0, view.1).to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.index_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn rect(x: f32) -> Rect {
        Rect { x, y: 0.0, width: 10.0, height: 5.0, color: [1.0; 4] }
    }

    #[test]
    fn quads_share_corners_through_indices() {
        let (vertices, indices) = build_quads(&[rect(0.0), rect(20.0)], 16);
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(vertices[6].position, [30.0, 5.0]);
    }

    #[test]
    fn batch_is_capped() {
        let rects: Vec<Rect> = (0..5).map(|i| rect(i as f32)).collect();
        let (vertices, indices) = build_quads(&rects, 3);
        assert_eq!(vertices.len(), 12);
        assert_eq!(indices.len(), 18);
    }

    #[test]
    fn projection_maps_view_corners_to_clip_space() {
        let proj = view_projection(640, 360);
        let top_left = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = proj * Vec4::new(640.0, 360.0, 0.0, 1.0);

        assert!((top_left.x + 1.0).abs() < 1e-5 && (top_left.y - 1.0).abs() < 1e-5);
        assert!((bottom_right.x - 1.0).abs() < 1e-5 && (bottom_right.y + 1.0).abs() < 1e-5);
    }
}
