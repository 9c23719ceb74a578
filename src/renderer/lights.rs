use bytemuck::{Pod, Zeroable};
use glam::Vec3;

pub const MAX_LIGHTS: usize = 16;
pub const MAX_SHADOW_CASTERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Clone, Copy, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub casts_shadows: bool,
}

impl Light {
    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize_or_zero(),
            color: Vec3::ONE,
            intensity: 1.0,
            range: 0.0,
            casts_shadows: false,
        }
    }

    pub fn point(position: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            casts_shadows: false,
        }
    }

    pub fn spot(position: Vec3, direction: Vec3) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            direction: direction.normalize_or_zero(),
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            casts_shadows: false,
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }
}

#[derive(Clone, Default)]
pub struct LightsData {
    lights: Vec<Light>,
}

impl LightsData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn add(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Shadow-casting lights, clamped to the caster budget.
    pub fn shadow_casters(&self) -> impl Iterator<Item = &Light> {
        self.lights
            .iter()
            .filter(|l| l.casts_shadows)
            .take(MAX_SHADOW_CASTERS)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightRaw {
    pub position_range: [f32; 4],
    pub direction_kind: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl LightRaw {
    pub fn from_light(light: &Light) -> Self {
        let kind = match light.kind {
            LightKind::Directional => 0.0,
            LightKind::Point => 1.0,
            LightKind::Spot => 2.0,
        };
        Self {
            position_range: [
                light.position.x,
                light.position.y,
                light.position.z,
                light.range,
            ],
            direction_kind: [
                light.direction.x,
                light.direction.y,
                light.direction.z,
                kind,
            ],
            color_intensity: [light.color.x, light.color.y, light.color.z, light.intensity],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub counts: [u32; 4],
    pub lights: [LightRaw; MAX_LIGHTS],
}

impl LightsUniform {
    pub fn from_data(data: &LightsData) -> Self {
        let mut uniform = Self::zeroed();

        let count = data.lights().len().min(MAX_LIGHTS);
        uniform.counts[0] = count as u32;
        for (dst, src) in uniform
            .lights
            .iter_mut()
            .zip(data.lights().iter())
            .take(count)
        {
            *dst = LightRaw::from_light(src);
        }

        uniform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_clamps_to_capacity() {
        let mut data = LightsData::new();
        for i in 0..(MAX_LIGHTS + 4) {
            data.add(Light::point(Vec3::splat(i as f32)));
        }
        let uniform = LightsUniform::from_data(&data);
        assert_eq!(uniform.counts[0] as usize, MAX_LIGHTS);
    }

    #[test]
    fn caster_iteration_respects_the_budget() {
        let mut data = LightsData::new();
        for _ in 0..(MAX_SHADOW_CASTERS + 2) {
            data.add(Light::directional(Vec3::NEG_Y).with_shadows());
        }
        data.add(Light::point(Vec3::ZERO));
        assert_eq!(data.shadow_casters().count(), MAX_SHADOW_CASTERS);
    }
}
