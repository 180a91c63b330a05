use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

fn shader_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("shaders")
        .join(name)
}

fn write_shader(source: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp shader");
    tmp.write_all(source.as_bytes()).expect("write shader");
    tmp
}

fn check_shaders(vertex: &std::path::Path, fragment: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("spinning-cube").expect("binary exists");
    cmd.arg("--vertex")
        .arg(vertex)
        .arg("--fragment")
        .arg(fragment)
        .arg("--check-shaders");
    cmd
}

#[test]
fn check_shaders_prints_resolved_uniforms() {
    check_shaders(
        &shader_path("spinningcube_withlight_vs.wgsl"),
        &shader_path("spinningcube_withlight_fs.wgsl"),
    )
    .assert()
    .success()
    .stdout(contains("Linked shader program (vs_main / fs_main)"))
    .stdout(contains("model: binding 0 offset 0 (mat4x4<f32>)"))
    .stdout(contains("normal_to_world: binding 0 offset 192 (mat3x3<f32>)"))
    .stdout(contains("light2.specular: binding 1 offset 128 (vec3<f32>)"))
    .stdout(contains("material.shininess: binding 1 offset 188 (f32)"));
}

#[test]
fn vertex_compile_failure_exits_non_zero() {
    let broken = write_shader("@vertex fn vs_main( -> @builtin(position) vec4<f32> {");
    check_shaders(broken.path(), &shader_path("spinningcube_withlight_fs.wgsl"))
        .assert()
        .failure()
        .stderr(contains("vertex shader compilation failed"));
}

#[test]
fn fragment_compile_failure_exits_non_zero() {
    let broken = write_shader("@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0 }");
    check_shaders(&shader_path("spinningcube_withlight_vs.wgsl"), broken.path())
        .assert()
        .failure()
        .stderr(contains("fragment shader compilation failed"));
}

#[test]
fn link_failure_exits_non_zero() {
    let fragment = write_shader(
        r#"
@fragment
fn fs_main(@location(5) shade: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(shade, 1.0);
}
"#,
    );
    check_shaders(&shader_path("spinningcube_withlight_vs.wgsl"), fragment.path())
        .assert()
        .failure()
        .stderr(contains("shader program linking failed"))
        .stderr(contains("location 5"));
}

#[test]
fn missing_shader_file_exits_non_zero() {
    check_shaders(
        std::path::Path::new("no/such/vertex.wgsl"),
        &shader_path("spinningcube_withlight_fs.wgsl"),
    )
    .assert()
    .failure()
    .stderr(contains("unable to read vertex shader"));
}

#[test]
fn unknown_argument_is_rejected() {
    Command::cargo_bin("spinning-cube")
        .expect("binary exists")
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"));
}
