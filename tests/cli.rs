use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::{Cursor, Write};
use std::process::Command;
use tempfile::NamedTempFile;

const MANIFEST: &str = r#"<scene>
  <node>
    <name>baked</name>
    <mesh>meshes/baked.obj</mesh>
  </node>
  <node>
    <name>poleLightRight</name>
    <mesh>meshes/pole.obj</mesh>
  </node>
  <node>
    <name>poleLightLeft</name>
    <mesh>meshes/pole.obj</mesh>
  </node>
  <node>
    <name>portalLight</name>
    <mesh>meshes/portal.obj</mesh>
    <position>0 0.78 -1.7</position>
  </node>
</scene>
"#;

const MANIFEST_MISSING_POLE: &str = r#"<scene>
  <node>
    <name>baked</name>
    <mesh>meshes/baked.obj</mesh>
  </node>
  <node>
    <name>poleLightRight</name>
    <mesh>meshes/pole.obj</mesh>
  </node>
  <node>
    <name>portalLight</name>
    <mesh>meshes/portal.obj</mesh>
  </node>
</scene>
"#;

const QUAD_OBJ: &str = "v -1 0 -1\nv 1 0 -1\nv 1 0 1\nv -1 0 1\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n";

fn tiny_png() -> Vec<u8> {
    let mut image = image::RgbaImage::new(2, 2);
    for pixel in image.pixels_mut() {
        *pixel = image::Rgba([120, 90, 60, 255]);
    }
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .expect("encode test texture");
    bytes
}

fn build_archive(manifest: &str) -> NamedTempFile {
    let texture = tiny_png();
    let entries: Vec<(&str, &[u8])> = vec![
        ("meshes/baked.obj", QUAD_OBJ.as_bytes()),
        ("meshes/pole.obj", QUAD_OBJ.as_bytes()),
        ("meshes/portal.obj", QUAD_OBJ.as_bytes()),
        ("textures/baked.png", &texture),
    ];

    // Header: magic, version, TOC offset, manifest offset, manifest size.
    let mut buffer = vec![0u8; 32];
    buffer[..4].copy_from_slice(b"PRTL");
    buffer[4..8].copy_from_slice(&1u32.to_le_bytes());

    let mut placed = Vec::new();
    for (name, data) in &entries {
        placed.push((*name, buffer.len() as u64, data.len() as u64));
        buffer.extend_from_slice(data);
    }

    let manifest_offset = buffer.len() as u64;
    buffer.extend_from_slice(manifest.as_bytes());

    let toc_offset = buffer.len() as u64;
    buffer.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (name, offset, size) in &placed {
        buffer.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buffer.extend_from_slice(name.as_bytes());
        buffer.extend_from_slice(&offset.to_le_bytes());
        buffer.extend_from_slice(&size.to_le_bytes());
    }

    buffer[8..16].copy_from_slice(&toc_offset.to_le_bytes());
    buffer[16..24].copy_from_slice(&manifest_offset.to_le_bytes());
    buffer[24..32].copy_from_slice(&(manifest.len() as u64).to_le_bytes());

    let mut tmp = NamedTempFile::new().expect("temp archive");
    tmp.write_all(&buffer).expect("write archive");
    tmp
}

#[test]
fn summary_lists_nodes_and_materials() {
    let archive = build_archive(MANIFEST);
    let mut cmd = Command::cargo_bin("portal-runtime").expect("binary exists");
    cmd.arg(archive.path())
        .arg("--summary-only")
        .arg("--seed")
        .arg("7");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 4 nodes"))
        .stdout(contains(" - baked (baked)"))
        .stdout(contains(" - poleLightRight (flat)"))
        .stdout(contains(" - poleLightLeft (flat)"))
        .stdout(contains(" - portalLight (portal)"))
        .stdout(contains("Fireflies: 30 particles"));
}

#[test]
fn missing_required_node_fails_with_its_name() {
    let archive = build_archive(MANIFEST_MISSING_POLE);
    let mut cmd = Command::cargo_bin("portal-runtime").expect("binary exists");
    cmd.arg(archive.path()).arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("asset node not found in scene: poleLightLeft"));
}

#[test]
fn missing_archive_path_prints_usage() {
    let mut cmd = Command::cargo_bin("portal-runtime").expect("binary exists");
    cmd.assert()
        .failure()
        .stderr(contains("Usage: portal-runtime"));
}

#[test]
fn unknown_flag_is_rejected() {
    let archive = build_archive(MANIFEST);
    let mut cmd = Command::cargo_bin("portal-runtime").expect("binary exists");
    cmd.arg(archive.path()).arg("--frobnicate");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frobnicate"));
}
