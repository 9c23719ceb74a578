use glam::{Mat4, Vec3};

/// Descriptor for a shared, externally-owned vertex/index buffer pair.
///
/// The pipeline never touches the buffer contents; it only carries ranges
/// into it. Upload and destruction belong to the geometry manager that
/// registered the descriptor.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub label: String,
    pub vertex_count: u32,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
}

impl Geometry {
    pub fn new(label: impl Into<String>, vertex_count: u32, index_count: u32) -> Self {
        Self {
            label: label.into(),
            vertex_count,
            index_count,
            index_format: wgpu::IndexFormat::Uint32,
        }
    }

    pub fn with_index_format(mut self, format: wgpu::IndexFormat) -> Self {
        self.index_format = format;
        self
    }
}

/// Axis-aligned bounds in model space, used by the hit-testing step.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub const UNIT: Self = Self {
        min: Vec3::splat(-0.5),
        max: Vec3::splat(0.5),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab intersection of a world-space ray against these bounds under
    /// `world`, returning the entry distance along the ray.
    pub fn intersect_ray(&self, world: Mat4, origin: Vec3, dir: Vec3) -> Option<f32> {
        let inv = world.inverse();
        let local_origin = inv.transform_point3(origin);
        let local_dir = inv.transform_vector3(dir);

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = local_origin[axis];
            let d = local_dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let t0 = (lo - o) / d;
            let t1 = (hi - o) / d;
            let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::UNIT
    }
}
