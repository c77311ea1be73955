use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::path::Path;
use wgpu::util::DeviceExt;

use crate::error::{Result, WalkthroughError};
use crate::model::scene::{SceneManifest, SceneObject};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

// Unit cube faces: normal, then corners counter-clockwise seen from outside
const CUBE_FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]]),
    ([-1.0, 0.0, 0.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]]),
    ([0.0, 1.0, 0.0], [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]]),
    ([0.0, -1.0, 0.0], [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]]),
    ([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
    ([0.0, 0.0, -1.0], [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
];

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Append a quad given counter-clockwise corners.
    pub fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, color: [f32; 3]) {
        let base = self.vertices.len() as u32;
        let color = [color[0], color[1], color[2], 1.0];
        for corner in corners {
            self.vertices.push(Vertex { pos: corner.to_array(), normal: normal.to_array(), color });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Append a unit cube centred on the origin, transformed by `transform`.
    pub fn push_box(&mut self, transform: Mat4, color: [f32; 3]) {
        let normal_matrix = transform.inverse().transpose();
        for (normal, corners) in CUBE_FACES.iter() {
            let n = normal_matrix.transform_vector3(Vec3::from(*normal)).normalize_or_zero();
            let corners = corners.map(|c| transform.transform_point3(Vec3::from(c)));
            self.push_quad(corners, n, color);
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Average colour of an image, linear-ish RGB in [0, 1].
pub fn load_texture_tint(path: &Path) -> Result<[f32; 3]> {
    let image = image::open(path)
        .map_err(|source| WalkthroughError::Texture { path: path.to_path_buf(), source })?
        .into_rgb8();
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return Ok([0.0; 3]);
    }
    let mut sum = [0u64; 3];
    for pixel in image.pixels() {
        for (acc, channel) in sum.iter_mut().zip(pixel.0) {
            *acc += u64::from(channel);
        }
    }
    Ok(sum.map(|s| (s as f64 / pixel_count as f64 / 255.0) as f32))
}

/// Colour for an object: its texture's average when it loads, else the material colour.
///
/// Without an asset root (no filesystem, e.g. in the browser) textures are not tried.
fn object_color(object: &SceneObject, asset_root: Option<&Path>) -> [f32; 3] {
    let (Some(texture), Some(asset_root)) = (&object.material.texture, asset_root) else {
        return object.material.color;
    };
    match load_texture_tint(&asset_root.join(texture)) {
        Ok(tint) => tint,
        Err(e) => {
            tracing::warn!(object = %object.name, error = %e, "texture unavailable, using material colour");
            object.material.color
        }
    }
}

/// Build proxy geometry for the whole scene: ground plane plus one box per object.
pub fn build_scene_mesh(manifest: &SceneManifest, asset_root: Option<&Path>) -> Mesh {
    let mut mesh = Mesh::default();

    if let Some(ground) = &manifest.ground {
        let (e, h) = (ground.extent, ground.height);
        mesh.push_quad(
            [Vec3::new(-e, h, e), Vec3::new(e, h, e), Vec3::new(e, h, -e), Vec3::new(-e, h, -e)],
            Vec3::Y,
            ground.color,
        );
    }

    for object in &manifest.objects {
        // Proxies sit on their placement point rather than straddling it
        let lift = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
        mesh.push_box(object.transform.matrix() * lift, object_color(object, asset_root));
    }

    tracing::debug!(
        vertices = mesh.vertices.len(),
        objects = manifest.objects.len(),
        "built scene mesh"
    );
    mesh
}
