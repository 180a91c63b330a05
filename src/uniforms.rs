//! Named uniform locations and the CPU-side staging storage behind them.
//!
//! Uniform blocks are reflected from the linked shader modules. Every leaf
//! member is addressable by its dotted path (`model`, `light.position`, ...),
//! mirroring how a GL program exposes its default-block uniforms.

use std::fmt;

use bytemuck::bytes_of;
use glam::{Mat3, Mat4, Vec3};
use log::{debug, warn};

use crate::shader::ShaderStage;

/// Every uniform the frame renderer sets, in upload order.
pub const UNIFORM_NAMES: [&str; 17] = [
    "model",
    "view",
    "projection",
    "normal_to_world",
    "view_pos",
    "light.position",
    "light.ambient",
    "light.diffuse",
    "light.specular",
    "light2.position",
    "light2.ambient",
    "light2.diffuse",
    "light2.specular",
    "material.ambient",
    "material.diffuse",
    "material.specular",
    "material.shininess",
];

/// Uniform struct prefixes for the two scene lights.
pub const LIGHT_UNIFORMS: [&str; 2] = ["light", "light2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Mat3,
    Vec3,
    Float,
    Other,
}

impl UniformKind {
    fn of(inner: &naga::TypeInner) -> Self {
        use naga::{TypeInner, VectorSize};
        match inner {
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if *scalar == naga::Scalar::F32 => Self::Mat4,
            TypeInner::Matrix {
                columns: VectorSize::Tri,
                rows: VectorSize::Tri,
                scalar,
            } if *scalar == naga::Scalar::F32 => Self::Mat3,
            TypeInner::Vector {
                size: VectorSize::Tri,
                scalar,
            } if *scalar == naga::Scalar::F32 => Self::Vec3,
            TypeInner::Scalar(scalar) if *scalar == naga::Scalar::F32 => Self::Float,
            _ => Self::Other,
        }
    }

    /// Bytes occupied in a uniform buffer; mat3 columns are padded to 16.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            Self::Mat4 => Some(64),
            Self::Mat3 => Some(48),
            Self::Vec3 => Some(12),
            Self::Float => Some(4),
            Self::Other => None,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mat4 => "mat4x4<f32>",
            Self::Mat3 => "mat3x3<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Float => "f32",
            Self::Other => "unsupported",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// One `var<uniform>` binding and its flattened members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u32,
    pub vertex: bool,
    pub fragment: bool,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    pub fn visibility(&self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.vertex {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.fragment {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        stages
    }
}

/// Uniform blocks declared by a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    blocks: Vec<UniformBlock>,
}

impl UniformLayout {
    /// Collects the uniform blocks of every stage. A block declared by both
    /// stages must have an identical definition.
    pub(crate) fn reflect(stages: &[(ShaderStage, &naga::Module)]) -> Result<Self, String> {
        let mut blocks: Vec<UniformBlock> = Vec::new();

        for (stage, module) in stages {
            for (_, var) in module.global_variables.iter() {
                if var.space != naga::AddressSpace::Uniform {
                    continue;
                }
                let name = var.name.clone().unwrap_or_default();
                let binding = var
                    .binding
                    .as_ref()
                    .ok_or_else(|| format!("uniform {name} has no @group/@binding"))?;
                if binding.group != 0 {
                    return Err(format!(
                        "uniform {name} uses bind group {}; only group 0 is supported",
                        binding.group
                    ));
                }

                let (size, members) = match &module.types[var.ty].inner {
                    naga::TypeInner::Struct { members, span } => {
                        let mut flat = Vec::new();
                        flatten_members(module, members, "", 0, &mut flat);
                        (*span, flat)
                    }
                    inner => {
                        let kind = UniformKind::of(inner);
                        let size = kind
                            .byte_size()
                            .ok_or_else(|| format!("uniform {name} has an unsupported type"))?;
                        let member = UniformMember {
                            name: name.clone(),
                            offset: 0,
                            kind,
                        };
                        (size as u32, vec![member])
                    }
                };

                let existing = blocks
                    .iter()
                    .position(|block| block.group == binding.group && block.binding == binding.binding);
                let index = match existing {
                    Some(index) => {
                        let block = &blocks[index];
                        if block.size != size || block.members != members {
                            return Err(format!(
                                "uniform block at binding {} is declared differently by the {stage} stage",
                                binding.binding
                            ));
                        }
                        index
                    }
                    None => {
                        blocks.push(UniformBlock {
                            name,
                            group: binding.group,
                            binding: binding.binding,
                            size,
                            vertex: false,
                            fragment: false,
                            members,
                        });
                        blocks.len() - 1
                    }
                };
                let block = &mut blocks[index];
                match stage {
                    ShaderStage::Vertex => block.vertex = true,
                    ShaderStage::Fragment => block.fragment = true,
                }
            }
        }

        blocks.sort_by_key(|block| block.binding);
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    /// Looks up a uniform by dotted path. Unknown names yield
    /// [`UniformLocation::INVALID`].
    pub fn location(&self, name: &str) -> UniformLocation {
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(index, block)| {
                block
                    .members
                    .iter()
                    .find(|member| member.name == name)
                    .map(|member| Slot {
                        block: index,
                        binding: block.binding,
                        offset: member.offset,
                        kind: member.kind,
                    })
            })
            .map_or(UniformLocation::INVALID, |slot| UniformLocation(Some(slot)))
    }
}

fn flatten_members(
    module: &naga::Module,
    members: &[naga::StructMember],
    prefix: &str,
    base: u32,
    out: &mut Vec<UniformMember>,
) {
    for member in members {
        let Some(name) = member.name.as_deref() else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let offset = base + member.offset;
        match &module.types[member.ty].inner {
            naga::TypeInner::Struct { members: nested, .. } => {
                flatten_members(module, nested, &path, offset, out)
            }
            inner => out.push(UniformMember {
                name: path,
                offset,
                kind: UniformKind::of(inner),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    block: usize,
    binding: u32,
    offset: u32,
    kind: UniformKind,
}

/// Resolved address of a uniform, or the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(Option<Slot>);

impl UniformLocation {
    pub const INVALID: Self = Self(None);

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn offset(&self) -> Option<u32> {
        self.0.map(|slot| slot.offset)
    }

    pub fn kind(&self) -> Option<UniformKind> {
        self.0.map(|slot| slot.kind)
    }
}

impl fmt::Display for UniformLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(slot) => write!(
                f,
                "binding {} offset {} ({})",
                slot.binding, slot.offset, slot.kind
            ),
            None => f.write_str("inactive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec3(Vec3),
    Float(f32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Mat4(_) => UniformKind::Mat4,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Float(_) => UniformKind::Float,
        }
    }

    fn write_to(&self, dst: &mut [u8]) {
        match self {
            Self::Mat4(matrix) => dst.copy_from_slice(bytes_of(&matrix.to_cols_array())),
            Self::Mat3(matrix) => {
                let columns = [
                    matrix.x_axis.extend(0.0).to_array(),
                    matrix.y_axis.extend(0.0).to_array(),
                    matrix.z_axis.extend(0.0).to_array(),
                ];
                dst.copy_from_slice(bytes_of(&columns));
            }
            Self::Vec3(vector) => dst.copy_from_slice(bytes_of(&vector.to_array())),
            Self::Float(value) => dst.copy_from_slice(bytes_of(value)),
        }
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

impl From<Mat3> for UniformValue {
    fn from(value: Mat3) -> Self {
        Self::Mat3(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

/// Staging bytes for every uniform block, uploaded once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformStorage {
    blocks: Vec<Vec<u8>>,
}

impl UniformStorage {
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            blocks: layout
                .blocks()
                .iter()
                .map(|block| vec![0; block.size as usize])
                .collect(),
        }
    }

    /// Writes `value` at `location`. Invalid locations are ignored.
    pub fn set(&mut self, location: UniformLocation, value: impl Into<UniformValue>) {
        let Some(slot) = location.0 else {
            return;
        };
        let value = value.into();
        if value.kind() != slot.kind {
            warn!(
                "ignoring {} value for uniform at binding {} offset {} declared as {}",
                value.kind(),
                slot.binding,
                slot.offset,
                slot.kind
            );
            return;
        }
        let Some(len) = slot.kind.byte_size() else {
            return;
        };
        let start = slot.offset as usize;
        if let Some(dst) = self
            .blocks
            .get_mut(slot.block)
            .and_then(|block| block.get_mut(start..start + len))
        {
            value.write_to(dst);
        }
    }

    pub fn blocks(&self) -> &[Vec<u8>] {
        &self.blocks
    }

    /// Reads back `len` floats starting at `location`.
    pub fn read_f32s(&self, location: UniformLocation, len: usize) -> Option<Vec<f32>> {
        let slot = location.0?;
        let start = slot.offset as usize;
        let bytes = self.blocks.get(slot.block)?.get(start..start + len * 4)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }
}

/// Locations of one light's uniform struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightLocations {
    pub position: UniformLocation,
    pub ambient: UniformLocation,
    pub diffuse: UniformLocation,
    pub specular: UniformLocation,
}

impl LightLocations {
    fn resolve(layout: &UniformLayout, prefix: &str) -> Self {
        Self {
            position: lookup(layout, &format!("{prefix}.position")),
            ambient: lookup(layout, &format!("{prefix}.ambient")),
            diffuse: lookup(layout, &format!("{prefix}.diffuse")),
            specular: lookup(layout, &format!("{prefix}.specular")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialLocations {
    pub ambient: UniformLocation,
    pub diffuse: UniformLocation,
    pub specular: UniformLocation,
    pub shininess: UniformLocation,
}

/// Uniform locations resolved once after linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBindings {
    pub model: UniformLocation,
    pub view: UniformLocation,
    pub projection: UniformLocation,
    pub normal_to_world: UniformLocation,
    pub view_pos: UniformLocation,
    pub lights: [LightLocations; 2],
    pub material: MaterialLocations,
}

impl UniformBindings {
    pub fn resolve(layout: &UniformLayout) -> Self {
        Self {
            model: lookup(layout, "model"),
            view: lookup(layout, "view"),
            projection: lookup(layout, "projection"),
            normal_to_world: lookup(layout, "normal_to_world"),
            view_pos: lookup(layout, "view_pos"),
            lights: LIGHT_UNIFORMS.map(|prefix| LightLocations::resolve(layout, prefix)),
            material: MaterialLocations {
                ambient: lookup(layout, "material.ambient"),
                diffuse: lookup(layout, "material.diffuse"),
                specular: lookup(layout, "material.specular"),
                shininess: lookup(layout, "material.shininess"),
            },
        }
    }
}

fn lookup(layout: &UniformLayout, name: &str) -> UniformLocation {
    let location = layout.location(name);
    if !location.is_valid() {
        debug!("uniform {name} is not active in the linked program");
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::tests::default_sources;
    use crate::shader::{build_program, ShaderSources};

    fn default_layout() -> UniformLayout {
        build_program(&default_sources()).unwrap().uniforms
    }

    #[test]
    fn resolves_every_named_uniform() {
        let layout = default_layout();
        for name in UNIFORM_NAMES {
            assert!(layout.location(name).is_valid(), "{name} not resolved");
        }
    }

    #[test]
    fn reflects_block_layout() {
        let layout = default_layout();
        let blocks = layout.blocks();
        assert_eq!(blocks[0].binding, 0);
        assert_eq!(blocks[0].size, 240);
        assert_eq!(blocks[0].visibility(), wgpu::ShaderStages::VERTEX);
        assert_eq!(blocks[1].binding, 1);
        assert_eq!(blocks[1].size, 192);
        assert_eq!(blocks[1].visibility(), wgpu::ShaderStages::FRAGMENT);

        assert_eq!(layout.location("normal_to_world").offset(), Some(192));
        assert_eq!(layout.location("light.position").offset(), Some(16));
        assert_eq!(layout.location("light2.position").offset(), Some(80));
        assert_eq!(layout.location("material.shininess").offset(), Some(188));
        assert_eq!(
            layout.location("material.shininess").kind(),
            Some(UniformKind::Float)
        );
    }

    #[test]
    fn missing_uniform_is_invalid_and_setting_it_is_a_no_op() {
        let sources = ShaderSources {
            fragment: r#"
struct Lighting {
    view_pos: vec3<f32>,
}

@group(0) @binding(1)
var<uniform> lighting: Lighting;

@fragment
fn fs_main(@location(0) frag_pos: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(normalize(lighting.view_pos - frag_pos), 1.0);
}
"#
            .to_string(),
            ..default_sources()
        };
        let layout = build_program(&sources).unwrap().uniforms;
        let bindings = UniformBindings::resolve(&layout);
        assert!(bindings.view_pos.is_valid());
        assert_eq!(bindings.lights[1].position, UniformLocation::INVALID);
        assert_eq!(bindings.material.shininess, UniformLocation::INVALID);

        let mut storage = UniformStorage::new(&layout);
        let before = storage.clone();
        storage.set(bindings.material.shininess, 32.0);
        storage.set(UniformLocation::INVALID, Mat4::IDENTITY);
        assert_eq!(storage, before);
    }

    #[test]
    fn mismatched_kind_is_ignored() {
        let layout = default_layout();
        let mut storage = UniformStorage::new(&layout);
        let before = storage.clone();
        storage.set(layout.location("model"), Vec3::ONE);
        assert_eq!(storage, before);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let layout = default_layout();
        let location = layout.location("normal_to_world");
        let mut storage = UniformStorage::new(&layout);
        storage.set(location, Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0));
        assert_eq!(
            storage.read_f32s(location, 12).unwrap(),
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0]
        );
    }

    #[test]
    fn invalid_location_displays_as_inactive() {
        assert_eq!(UniformLocation::INVALID.to_string(), "inactive");
        let layout = default_layout();
        assert_eq!(
            layout.location("view").to_string(),
            "binding 0 offset 64 (mat4x4<f32>)"
        );
    }
}
