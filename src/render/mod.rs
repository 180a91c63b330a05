//! Per-frame transform and lighting upload.
//!
//! [`FrameRenderer`] owns the resolved uniform locations and their staging
//! storage. Each frame it rebuilds the transform set, writes every uniform
//! and hands a single draw to a [`RenderTarget`].

use std::ops::Range;

use anyhow::{Context, Result};

use crate::app::Viewport;
use crate::geometry::VERTEX_COUNT;
use crate::scene::{Light, Material, Scene};
use crate::shader::{build_program, LinkedProgram, ShaderSources};
use crate::transform::TransformSet;
use crate::uniforms::{
    LightLocations, MaterialLocations, UniformBindings, UniformLayout, UniformStorage,
};

pub mod native;

pub use native::Renderer;

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Everything a backend needs to draw one frame.
#[derive(Debug)]
pub struct FrameSubmission<'a> {
    pub viewport: Viewport,
    pub clear_color: wgpu::Color,
    pub uniforms: &'a UniformStorage,
    pub vertices: Range<u32>,
}

/// Backend that clears, uploads the staged uniforms and issues the draw.
pub trait RenderTarget {
    type Error;

    fn submit(&mut self, frame: &FrameSubmission<'_>) -> Result<(), Self::Error>;
}

pub struct FrameRenderer {
    bindings: UniformBindings,
    uniforms: UniformStorage,
    scene: Scene,
    vertex_count: u32,
}

impl FrameRenderer {
    /// Resolves uniform locations once for the linked program.
    pub fn new(layout: &UniformLayout, scene: Scene, vertex_count: u32) -> Self {
        Self {
            bindings: UniformBindings::resolve(layout),
            uniforms: UniformStorage::new(layout),
            scene,
            vertex_count,
        }
    }

    pub fn bindings(&self) -> &UniformBindings {
        &self.bindings
    }

    pub fn uniforms(&self) -> &UniformStorage {
        &self.uniforms
    }

    /// Renders the frame at `elapsed` seconds since start into `target`.
    pub fn render<T: RenderTarget>(
        &mut self,
        target: &mut T,
        viewport: Viewport,
        elapsed: f64,
    ) -> Result<TransformSet, T::Error> {
        let transforms = TransformSet::at(elapsed, &self.scene.camera, viewport);
        self.upload(&transforms);
        target.submit(&FrameSubmission {
            viewport,
            clear_color: CLEAR_COLOR,
            uniforms: &self.uniforms,
            vertices: 0..self.vertex_count,
        })?;
        Ok(transforms)
    }

    fn upload(&mut self, transforms: &TransformSet) {
        let bindings = self.bindings;
        let uniforms = &mut self.uniforms;
        uniforms.set(bindings.model, transforms.model);
        uniforms.set(bindings.view, transforms.view);
        uniforms.set(bindings.projection, transforms.projection);
        uniforms.set(bindings.normal_to_world, transforms.normal_to_world);
        uniforms.set(bindings.view_pos, self.scene.camera.position);
        for (locations, light) in bindings.lights.iter().zip(&self.scene.lights) {
            upload_light(uniforms, locations, light);
        }
        upload_material(uniforms, &bindings.material, &self.scene.material);
    }
}

/// A backend connected to a linked program, with its frame renderer.
pub struct Session<T> {
    pub frame: FrameRenderer,
    pub target: T,
}

impl<T: RenderTarget> Session<T> {
    pub fn render(&mut self, viewport: Viewport, elapsed: f64) -> Result<TransformSet, T::Error> {
        self.frame.render(&mut self.target, viewport, elapsed)
    }
}

/// Builds the program from `sources`, connects a backend to it and renders
/// the first frame.
///
/// `connect` only runs once the program has compiled and linked, so a
/// broken program never gets a target to draw into.
pub fn start<T, C>(
    sources: &ShaderSources,
    scene: Scene,
    viewport: Viewport,
    elapsed: f64,
    connect: C,
) -> Result<Session<T>>
where
    T: RenderTarget,
    T::Error: std::error::Error + Send + Sync + 'static,
    C: FnOnce(&LinkedProgram) -> Result<T>,
{
    let program = build_program(sources)?;
    let target = connect(&program)?;
    let mut session = Session {
        frame: FrameRenderer::new(&program.uniforms, scene, VERTEX_COUNT as u32),
        target,
    };
    session
        .render(viewport, elapsed)
        .context("failed to render the first frame")?;
    Ok(session)
}

fn upload_light(uniforms: &mut UniformStorage, locations: &LightLocations, light: &Light) {
    uniforms.set(locations.position, light.position);
    uniforms.set(locations.ambient, light.ambient);
    uniforms.set(locations.diffuse, light.diffuse);
    uniforms.set(locations.specular, light.specular);
}

fn upload_material(
    uniforms: &mut UniformStorage,
    locations: &MaterialLocations,
    material: &Material,
) {
    uniforms.set(locations.ambient, material.ambient);
    uniforms.set(locations.diffuse, material.diffuse);
    uniforms.set(locations.specular, material.specular);
    uniforms.set(locations.shininess, material.shininess);
}
