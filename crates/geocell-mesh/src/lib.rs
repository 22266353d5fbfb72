#![warn(missing_docs)]

//! Triangle meshes for geocell primitives.
//!
//! Every primitive has a closed-form tessellator that builds its surface in
//! the primitive's local frame:
//! 1. Sample the profile (circle, latitude rings, box faces)
//! 2. Emit vertices with analytic outward normals
//! 3. Stitch neighbouring rings into counter-clockwise triangles
//!
//! Composite meshes are plain concatenations of child meshes mapped through
//! their transforms; seams are not merged.

use std::f64::consts::PI;

use geocell_math::{Aabb3, Transform, Vec3};

/// Output triangle mesh for rendering and export.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub vertices: Vec<f64>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
    /// Flat array of vertex normals: `[nx0, ny0, nz0, ...]`. Same length as vertices.
    pub normals: Vec<f64>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            normals: Vec::new(),
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// True when the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex with its normal, returning its index.
    pub fn push_vertex(&mut self, position: [f64; 3], normal: [f64; 3]) -> u32 {
        let index = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&position);
        self.normals.extend_from_slice(&normal);
        index
    }

    /// Append a triangle by vertex indices.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Position of vertex `i`.
    pub fn vertex(&self, i: usize) -> [f64; 3] {
        [
            self.vertices[3 * i],
            self.vertices[3 * i + 1],
            self.vertices[3 * i + 2],
        ]
    }

    /// Normal of vertex `i`.
    pub fn normal(&self, i: usize) -> [f64; 3] {
        [
            self.normals[3 * i],
            self.normals[3 * i + 1],
            self.normals[3 * i + 2],
        ]
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + offset));
    }

    /// A copy of this mesh with positions and normals mapped by `t`.
    pub fn transformed(&self, t: &Transform<f64>) -> TriangleMesh {
        if t.is_identity() {
            return self.clone();
        }
        let mut out = TriangleMesh {
            vertices: Vec::with_capacity(self.vertices.len()),
            indices: self.indices.clone(),
            normals: Vec::with_capacity(self.normals.len()),
        };
        for (p, n) in self
            .vertices
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
        {
            let p = t.apply_point(&Vec3::new(p[0], p[1], p[2]));
            let n = t.apply_vec(&Vec3::new(n[0], n[1], n[2]));
            out.vertices.extend_from_slice(&[p.x, p.y, p.z]);
            out.normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
        out
    }

    /// Box around all vertex positions (empty for an empty mesh).
    pub fn bounding_box(&self) -> Aabb3<f64> {
        let mut bbox = Aabb3::empty();
        for p in self.vertices.chunks_exact(3) {
            bbox.include_point(&Vec3::new(p[0], p[1], p[2]));
        }
        bbox
    }

    /// Signed enclosed volume via the divergence theorem.
    ///
    /// Positive for a closed mesh with outward winding.
    pub fn signed_volume(&self) -> f64 {
        let mut vol = 0.0;
        for tri in self.indices.chunks_exact(3) {
            let v0 = self.vertex(tri[0] as usize);
            let v1 = self.vertex(tri[1] as usize);
            let v2 = self.vertex(tri[2] as usize);
            vol += v0[0] * (v1[1] * v2[2] - v2[1] * v1[2])
                - v1[0] * (v0[1] * v2[2] - v2[1] * v0[2])
                + v2[0] * (v0[1] * v1[2] - v1[1] * v0[2]);
        }
        vol / 6.0
    }

    /// Total triangle area.
    pub fn surface_area(&self) -> f64 {
        let mut area = 0.0;
        for tri in self.indices.chunks_exact(3) {
            let v0 = self.vertex(tri[0] as usize);
            let v1 = self.vertex(tri[1] as usize);
            let v2 = self.vertex(tri[2] as usize);
            let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
            let cross = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            area += (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt() / 2.0;
        }
        area
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Tessellation parameters derived from a cell's resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessellationParams {
    /// Number of segments around circular features.
    pub circle_segments: u32,
    /// Number of latitude bands for spherical features (pole to pole).
    pub latitude_segments: u32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self::from_resolution(32)
    }
}

impl TessellationParams {
    /// Create params from a cell resolution (segments around the axis).
    pub fn from_resolution(resolution: u32) -> Self {
        Self {
            circle_segments: resolution.max(3),
            latitude_segments: (resolution / 2).max(2),
        }
    }
}

/// Map a point expressed with Z as the principal axis onto axis `axis`.
///
/// The permutation is cyclic, so handedness (and triangle winding) is kept.
fn place(axis: usize, local: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    out[(axis + 1) % 3] = local[0];
    out[(axis + 2) % 3] = local[1];
    out[axis] = local[2];
    out
}

/// Tessellate a closed cylinder around coordinate axis `axis`.
///
/// `segments` around the axis (min 3); lateral quads are split into two
/// triangles and each cap is a fan around its center.
pub fn tessellate_cylinder(
    axis: usize,
    radius: f64,
    half_height: f64,
    params: &TessellationParams,
) -> TriangleMesh {
    let n = params.circle_segments.max(3);
    let mut mesh = TriangleMesh::new();

    // Lateral band; the seam column is duplicated so normals stay radial.
    for i in 0..=n {
        let theta = 2.0 * PI * (i as f64) / (n as f64);
        let (s, c) = theta.sin_cos();
        let normal = place(axis, [c, s, 0.0]);
        mesh.push_vertex(place(axis, [radius * c, radius * s, -half_height]), normal);
        mesh.push_vertex(place(axis, [radius * c, radius * s, half_height]), normal);
    }
    for i in 0..n {
        let bl = 2 * i;
        let tl = bl + 1;
        let br = bl + 2;
        let tr = bl + 3;
        mesh.push_triangle(bl, br, tl);
        mesh.push_triangle(br, tr, tl);
    }

    push_cap(&mut mesh, axis, radius, half_height, n, true);
    push_cap(&mut mesh, axis, radius, half_height, n, false);
    mesh
}

fn push_cap(mesh: &mut TriangleMesh, axis: usize, radius: f64, z: f64, n: u32, top: bool) {
    let (z, nz) = if top { (z, 1.0) } else { (-z, -1.0) };
    let normal = place(axis, [0.0, 0.0, nz]);
    let center = mesh.push_vertex(place(axis, [0.0, 0.0, z]), normal);
    let first = center + 1;
    for i in 0..n {
        let theta = 2.0 * PI * (i as f64) / (n as f64);
        let (s, c) = theta.sin_cos();
        mesh.push_vertex(place(axis, [radius * c, radius * s, z]), normal);
    }
    for i in 0..n {
        let a = first + i;
        let b = first + (i + 1) % n;
        if top {
            mesh.push_triangle(center, a, b);
        } else {
            mesh.push_triangle(center, b, a);
        }
    }
}

/// Stitch latitude rings into a closed surface.
///
/// Each ring is `(polar angle from +Z, axial offset)`. Rings are emitted
/// top to bottom; the first and last ring must sit on the poles, whose
/// degenerate triangles are skipped.
fn latitude_surface(
    axis: usize,
    radius: f64,
    rings: &[(f64, f64)],
    segments: u32,
) -> TriangleMesh {
    let n = segments.max(3);
    let stride = n + 1;
    let mut mesh = TriangleMesh::new();

    for &(phi, offset) in rings {
        let (sp, cp) = phi.sin_cos();
        for i in 0..=n {
            let theta = 2.0 * PI * (i as f64) / (n as f64);
            let (st, ct) = theta.sin_cos();
            let dir = [sp * ct, sp * st, cp];
            mesh.push_vertex(
                place(axis, [radius * dir[0], radius * dir[1], radius * dir[2] + offset]),
                place(axis, dir),
            );
        }
    }

    let last_band = rings.len().saturating_sub(2);
    for j in 0..rings.len().saturating_sub(1) {
        for i in 0..n {
            let a = j as u32 * stride + i;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            if j != 0 {
                mesh.push_triangle(a, c, b);
            }
            if j != last_band {
                mesh.push_triangle(b, c, d);
            }
        }
    }
    mesh
}

/// Tessellate a UV sphere centered at the origin.
pub fn tessellate_sphere(radius: f64, params: &TessellationParams) -> TriangleMesh {
    let n_lat = params.latitude_segments.max(2);
    let rings: Vec<(f64, f64)> = (0..=n_lat)
        .map(|j| (PI * (j as f64) / (n_lat as f64), 0.0))
        .collect();
    latitude_surface(2, radius, &rings, params.circle_segments)
}

/// Tessellate a capsule: a cylinder band of half-height `half_height` capped
/// by two hemispheres of radius `radius`.
pub fn tessellate_capsule(
    axis: usize,
    radius: f64,
    half_height: f64,
    params: &TessellationParams,
) -> TriangleMesh {
    let k = (params.latitude_segments / 2).max(1);
    let mut rings = Vec::with_capacity(2 * k as usize + 2);
    for j in 0..=k {
        rings.push((0.5 * PI * (j as f64) / (k as f64), half_height));
    }
    for j in 0..=k {
        rings.push((0.5 * PI + 0.5 * PI * (j as f64) / (k as f64), -half_height));
    }
    latitude_surface(axis, radius, &rings, params.circle_segments)
}

/// Tessellate an axis-aligned box with the given half-extents.
///
/// Four vertices per face so every face keeps a flat normal.
pub fn tessellate_cuboid(half_extents: [f64; 3]) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for face_axis in 0..3 {
        let u = (face_axis + 1) % 3;
        let v = (face_axis + 2) % 3;
        for sign in [1.0, -1.0] {
            let mut normal = [0.0; 3];
            normal[face_axis] = sign;
            let mut quad = [0u32; 4];
            for (k, (su, sv)) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .iter()
                .enumerate()
            {
                let mut p = [0.0; 3];
                p[face_axis] = sign * half_extents[face_axis];
                p[u] = su * half_extents[u];
                p[v] = sv * half_extents[v];
                quad[k] = mesh.push_vertex(p, normal);
            }
            if sign > 0.0 {
                mesh.push_triangle(quad[0], quad[1], quad[2]);
                mesh.push_triangle(quad[0], quad[2], quad[3]);
            } else {
                mesh.push_triangle(quad[0], quad[2], quad[1]);
                mesh.push_triangle(quad[0], quad[3], quad[2]);
            }
        }
    }
    mesh
}
