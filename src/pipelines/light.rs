use wgpu::util::DeviceExt;

/// Upper bound on lights per scene; the uniform array is fixed-size.
pub const MAX_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    pub position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub color: [f32; 3],
    _padding2: u32,
}

impl LightRaw {
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            _padding: 0,
            color,
            _padding2: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub lights: [LightRaw; MAX_LIGHTS],
    pub count: u32,
    _padding: [u32; 3],
}

impl LightUniform {
    /// Packs up to [`MAX_LIGHTS`] lights; the rest are ignored.
    pub fn new(lights: &[LightRaw]) -> Self {
        let mut uniform: LightUniform = bytemuck::Zeroable::zeroed();
        let count = lights.len().min(MAX_LIGHTS);
        uniform.lights[..count].copy_from_slice(&lights[..count]);
        uniform.count = count as u32;
        uniform
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(device: &wgpu::Device, light_buffer: &wgpu::Buffer) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &mk_bind_group_layout(device),
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_lights_are_dropped() {
        let lights: Vec<_> = (0..6)
            .map(|i| LightRaw::new([i as f32; 3], [1.0; 3]))
            .collect();
        let uniform = LightUniform::new(&lights);
        assert_eq!(uniform.count, MAX_LIGHTS as u32);
        assert_eq!(uniform.lights[3].position, [3.0; 3]);
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }
}
