/// Grey level of the cleared background for a brightness in `[0, 1]`.
pub(super) fn background_color(brightness: f32) -> wgpu::Color {
    let level = f64::from(brightness.clamp(0.0, 1.0));
    wgpu::Color {
        r: level,
        g: level,
        b: level,
        a: 1.0,
    }
}

/// Creates a render pass that clears the background to a specific color
pub(super) fn create_background_render_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    texture_view: &'a wgpu::TextureView,
    color: wgpu::Color,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Particle render pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: texture_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_opaque_grey() {
        let color = background_color(0.25);
        assert_eq!((color.r, color.g, color.b, color.a), (0.25, 0.25, 0.25, 1.0));
        assert_eq!(background_color(3.0).r, 1.0);
    }
}
