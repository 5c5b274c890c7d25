//! Texture readback for screenshots.

use anyhow::{anyhow, ensure, Result};

/// Round a row size up to the 256-byte alignment required for buffer copies.
pub(crate) fn align_bytes_per_row(value: usize) -> usize {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    value.div_ceil(align) * align
}

/// Strip row padding from a mapped buffer, yielding tightly packed rows.
pub(crate) fn depad_rows(padded: &[u8], tight_bpr: usize, padded_bpr: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(tight_bpr * height);
    for row in padded.chunks(padded_bpr).take(height) {
        out.extend_from_slice(&row[..tight_bpr.min(row.len())]);
    }
    out
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Swap the red and blue channels in place.
pub(crate) fn swap_bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &image::RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Copy an 8-bit color texture into an RGBA image. Blocks until the GPU is done.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn read_texture_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
) -> Result<image::RgbaImage> {
    let (width, height) = (texture.width(), texture.height());
    ensure!(width > 0 && height > 0, "readback size must be positive");
    ensure!(
        format.block_copy_size(None) == Some(4),
        "readback only supports 8-bit RGBA/BGRA formats, got {:?}",
        format
    );

    let tight_bpr = 4 * width as usize;
    let padded_bpr = align_bytes_per_row(tight_bpr);
    let buffer_size = (padded_bpr * height as usize) as wgpu::BufferAddress;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Screenshot Staging Buffer"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Screenshot Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr as u32),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    let submission = queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: Some(submission),
            timeout: None,
        })
        .map_err(|e| anyhow!("Device poll failed during readback: {e}"))?;
    rx.recv()
        .map_err(|_| anyhow!("map_async callback channel dropped"))??;

    let mut pixels = {
        let data = slice.get_mapped_range();
        depad_rows(&data, tight_bpr, padded_bpr, height as usize)
    };
    staging.unmap();

    if is_bgra(format) {
        swap_bgra_to_rgba(&mut pixels);
    }

    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Readback produced a buffer of the wrong size"))
}
