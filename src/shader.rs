//! Shader compilation and program linking.
//!
//! Sources are WGSL. Each stage is parsed and validated on its own with
//! naga, then the two stages are linked: their interface is checked and the
//! uniform blocks they declare are reflected into a [`UniformLayout`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use thiserror::Error;

use crate::uniforms::UniformLayout;

pub const DEFAULT_VERTEX_SHADER: &str = "shaders/spinningcube_withlight_vs.wgsl";
pub const DEFAULT_FRAGMENT_SHADER: &str = "shaders/spinningcube_withlight_fs.wgsl";

/// Attribute locations supplied by the scene vertex buffer.
const VERTEX_ATTRIBUTE_LOCATIONS: [u32; 2] = [0, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn to_naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("unable to read {stage} shader {}", path.display())]
    Io {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader compilation failed!\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program linking failed!\n{log}")]
    Link { log: String },
}

impl ShaderError {
    fn link(log: impl Into<String>) -> Self {
        Self::Link { log: log.into() }
    }
}

/// Vertex and fragment source text as read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn load(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: read_source(ShaderStage::Vertex, vertex_path.as_ref())?,
            fragment: read_source(ShaderStage::Fragment, fragment_path.as_ref())?,
        })
    }
}

fn read_source(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::Io {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

/// A single validated stage, alive only until the program is linked.
#[derive(Debug)]
pub struct CompiledShader {
    stage: ShaderStage,
    source: String,
    entry_point: String,
    module: naga::Module,
}

/// Source and entry point of one stage of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgram {
    pub source: String,
    pub entry_point: String,
}

/// Result of a successful link: everything the GPU pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    pub vertex: StageProgram,
    pub fragment: StageProgram,
    pub uniforms: UniformLayout,
}

/// Parses and validates one stage. The module must define an entry point
/// for `stage`.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledShader, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
        stage,
        log: err.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            stage,
            log: err.emit_to_string(source),
        })?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage.to_naga())
        .map(|entry| entry.name.clone())
        .ok_or_else(|| ShaderError::Compile {
            stage,
            log: format!("no @{stage} entry point defined"),
        })?;

    Ok(CompiledShader {
        stage,
        source: source.to_string(),
        entry_point,
        module,
    })
}

/// Links a vertex and a fragment stage into one program.
///
/// The compiled modules are consumed; only the sources, entry points and
/// reflected uniform layout survive.
pub fn link(vertex: CompiledShader, fragment: CompiledShader) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage != ShaderStage::Vertex {
        return Err(ShaderError::link(format!(
            "expected a vertex shader, got a {} shader",
            vertex.stage
        )));
    }
    if fragment.stage != ShaderStage::Fragment {
        return Err(ShaderError::link(format!(
            "expected a fragment shader, got a {} shader",
            fragment.stage
        )));
    }

    for (location, _) in stage_inputs(&vertex) {
        if !VERTEX_ATTRIBUTE_LOCATIONS.contains(&location) {
            return Err(ShaderError::link(format!(
                "vertex input at location {location} is not supplied by the vertex buffer"
            )));
        }
    }

    let outputs = stage_outputs(&vertex);
    for (location, ty) in stage_inputs(&fragment) {
        match outputs.iter().find(|(out, _)| *out == location) {
            None => {
                return Err(ShaderError::link(format!(
                    "fragment input at location {location} is not written by the vertex shader"
                )));
            }
            Some((_, out_ty)) if *out_ty != ty => {
                return Err(ShaderError::link(format!(
                    "type mismatch at location {location}: vertex writes {out_ty:?}, fragment reads {ty:?}"
                )));
            }
            Some(_) => {}
        }
    }

    let uniforms = UniformLayout::reflect(&[
        (ShaderStage::Vertex, &vertex.module),
        (ShaderStage::Fragment, &fragment.module),
    ])
    .map_err(ShaderError::link)?;
    debug!(
        "linked program {}/{} with {} uniform block(s)",
        vertex.entry_point,
        fragment.entry_point,
        uniforms.blocks().len()
    );

    Ok(LinkedProgram {
        vertex: StageProgram {
            source: vertex.source,
            entry_point: vertex.entry_point,
        },
        fragment: StageProgram {
            source: fragment.source,
            entry_point: fragment.entry_point,
        },
        uniforms,
    })
}

/// Compiles both stages and links them.
pub fn build_program(sources: &ShaderSources) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile(ShaderStage::Vertex, &sources.vertex)?;
    let fragment = compile(ShaderStage::Fragment, &sources.fragment)?;
    link(vertex, fragment)
}

type Interface = Vec<(u32, naga::TypeInner)>;

fn entry_point(shader: &CompiledShader) -> Option<&naga::EntryPoint> {
    shader
        .module
        .entry_points
        .iter()
        .find(|entry| entry.name == shader.entry_point)
}

fn stage_inputs(shader: &CompiledShader) -> Interface {
    let mut locations = Vec::new();
    if let Some(entry) = entry_point(shader) {
        for argument in &entry.function.arguments {
            collect_locations(
                &shader.module,
                argument.ty,
                argument.binding.as_ref(),
                &mut locations,
            );
        }
    }
    locations
}

fn stage_outputs(shader: &CompiledShader) -> Interface {
    let mut locations = Vec::new();
    if let Some(result) = entry_point(shader).and_then(|entry| entry.function.result.as_ref()) {
        collect_locations(
            &shader.module,
            result.ty,
            result.binding.as_ref(),
            &mut locations,
        );
    }
    locations
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Interface,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.push((*location, module.types[ty].inner.clone()));
        }
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const VERTEX_SOURCE: &str = include_str!("../shaders/spinningcube_withlight_vs.wgsl");
    pub(crate) const FRAGMENT_SOURCE: &str =
        include_str!("../shaders/spinningcube_withlight_fs.wgsl");

    pub(crate) fn default_sources() -> ShaderSources {
        ShaderSources {
            vertex: VERTEX_SOURCE.to_string(),
            fragment: FRAGMENT_SOURCE.to_string(),
        }
    }

    #[test]
    fn builds_default_program() {
        let program = build_program(&default_sources()).unwrap();
        assert_eq!(program.vertex.entry_point, "vs_main");
        assert_eq!(program.fragment.entry_point, "fs_main");
        assert_eq!(program.uniforms.blocks().len(), 2);
    }

    #[test]
    fn compile_error_carries_diagnostic() {
        let err = compile(ShaderStage::Vertex, "fn vs_main( -> {").unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn compile_requires_matching_entry_point() {
        let err = compile(ShaderStage::Fragment, VERTEX_SOURCE).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn link_rejects_unwritten_fragment_input() {
        let fragment = r#"
@fragment
fn fs_main(@location(2) tint: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(tint, 1.0);
}
"#;
        let vertex = compile(ShaderStage::Vertex, VERTEX_SOURCE).unwrap();
        let fragment = compile(ShaderStage::Fragment, fragment).unwrap();
        let err = link(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("location 2"), "{err}");
    }

    #[test]
    fn link_rejects_interface_type_mismatch() {
        let fragment = r#"
@fragment
fn fs_main(@location(1) normal: vec4<f32>) -> @location(0) vec4<f32> {
    return normal;
}
"#;
        let vertex = compile(ShaderStage::Vertex, VERTEX_SOURCE).unwrap();
        let fragment = compile(ShaderStage::Fragment, fragment).unwrap();
        let err = link(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("type mismatch"), "{err}");
    }

    #[test]
    fn link_rejects_unknown_vertex_attribute() {
        let vertex = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(3) uv: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position + vec3<f32>(uv, 0.0), 1.0);
}
"#;
        let fragment = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let vertex = compile(ShaderStage::Vertex, vertex).unwrap();
        let fragment = compile(ShaderStage::Fragment, fragment).unwrap();
        let err = link(vertex, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ShaderSources::load("does/not/exist.wgsl", "nor/this.wgsl").unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Io {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }
}
