//! Lights, material and camera of the fixed scene.

use glam::Vec3;

/// Point light with separate Phong colour terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

/// Surface response shared by every face in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

/// Fixed camera. `position` also feeds the `view_pos` uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::new(0.0, 0.5, 0.0),
        }
    }
}

/// Immutable lighting setup for the demo, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub camera: Camera,
    pub lights: [Light; 2],
    pub material: Material,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            lights: [
                Light {
                    position: Vec3::new(1.2, 1.0, 2.0),
                    ambient: Vec3::splat(0.2),
                    diffuse: Vec3::splat(0.5),
                    specular: Vec3::splat(1.0),
                },
                Light {
                    position: Vec3::new(0.3, 1.0, 1.0),
                    ambient: Vec3::splat(0.2),
                    diffuse: Vec3::splat(0.5),
                    specular: Vec3::splat(0.5),
                },
            ],
            material: Material {
                ambient: Vec3::new(0.5, 0.5, 0.31),
                diffuse: Vec3::new(0.5, 0.5, 0.31),
                specular: Vec3::splat(0.5),
                shininess: 32.0,
            },
        }
    }
}
