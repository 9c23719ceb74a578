use std::cmp::Ordering;

use glam::{Mat4, Vec3};
use hecs::{Entity, World};

use crate::asset::Handle;
use crate::renderer::{Model, ModelAssets};

use super::components::{InstanceTransform, ModelRef, Visible};

/// World-space query ray.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// One instance the ray passed through, nearest first after sorting.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub entity: Entity,
    pub model: Handle<Model>,
    pub distance: f32,
}

/// Intersect the ray against every registered instance's transformed
/// model bounds. This is the result-writing analogue of a render step's
/// entry walk: same membership, hits instead of pixels.
pub fn pick(world: &World, models: &ModelAssets, instances: &[Entity], ray: &Ray) -> Vec<RayHit> {
    let mut hits = Vec::new();

    for &entity in instances {
        let Ok(mut query) =
            world.query_one::<(&ModelRef, Option<&InstanceTransform>, Option<&Visible>)>(entity)
        else {
            continue;
        };
        let Some((model_ref, transform, visible)) = query.get() else {
            continue;
        };
        if matches!(visible, Some(Visible(false))) {
            continue;
        }
        let Some(model) = models.get(model_ref.0) else {
            continue;
        };

        let world_matrix = transform.map_or(Mat4::IDENTITY, |t| t.0.matrix());
        if let Some(distance) = model
            .bounds
            .intersect_ray(world_matrix, ray.origin, ray.direction)
        {
            hits.push(RayHit {
                entity,
                model: model_ref.0,
                distance,
            });
        }
    }

    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
    });
    hits
}
