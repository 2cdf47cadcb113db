use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use nalgebra_glm as glm;
use serde_json::json;

use skindeform::model::Rig;
use skindeform::parser::load_gltf;
use skindeform::Error;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("skindeform-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Two joints carrying one unindexed triangle; vertex 1 rides the child.
/// The child slides from (0,0,0) to (0,0,1), replacing its (0,1,0) rest offset.
fn write_chain(dir: &Path) -> PathBuf {
    let mut bin: Vec<u8> = Vec::new();
    // positions: 3 x VEC3 float, offset 0, 36 bytes
    bin.extend_from_slice(bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]));
    // joints: 3 x VEC4 u16, offset 36, 24 bytes
    bin.extend_from_slice(bytemuck::cast_slice(&[0u16, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]));
    // weights: 3 x VEC4 float, offset 60, 48 bytes
    bin.extend_from_slice(bytemuck::cast_slice(&[
        1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
    ]));
    // times: offset 108, 8 bytes
    bin.extend_from_slice(bytemuck::cast_slice(&[0.0f32, 1.0]));
    // translations: offset 116, 24 bytes
    bin.extend_from_slice(bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, 0.0, 0.0, 1.0]));

    let doc = json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "uri": "chain.bin", "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 108, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 116, "byteLength": 24 },
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0],
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "VEC4" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4" },
            { "bufferView": 3, "componentType": 5126, "count": 2, "type": "SCALAR" },
            { "bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC3" },
        ],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2 },
                "mode": 4,
            }],
        }],
        "nodes": [
            { "name": "root", "children": [1, 2] },
            { "name": "child", "translation": [0.0, 1.0, 0.0] },
            { "mesh": 0, "skin": 0 },
        ],
        "skins": [{ "joints": [0, 1] }],
        "animations": [{
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }],
            "samplers": [{ "input": 3, "output": 4 }],
        }],
    });

    fs::write(dir.join("chain.bin"), &bin).unwrap();
    let path = dir.join("chain.gltf");
    fs::write(&path, doc.to_string()).unwrap();
    path
}

#[test]
fn loads_and_plays_gltf_from_disk() {
    let dir = scratch_dir("chain");
    let path = write_chain(&dir);

    let data = load_gltf(&path).unwrap();
    assert_eq!(data.triangles, vec![[0, 1, 2]]);
    assert_eq!(data.bones[1].parent, Some(0));

    let rig = Rig::from_data(data).unwrap();
    assert_eq!(rig.duration(), 1.0);

    let frame = rig.frame(0.5);
    assert_relative_eq!(frame.positions[1], glm::vec3(0.0, 1.0, 0.5), epsilon = 1e-6);
    assert_relative_eq!(frame.positions[0], glm::vec3(0.0, 0.0, 0.0));
    assert_relative_eq!(frame.positions[2], glm::vec3(1.0, 0.0, 0.0));

    let looped = rig.looped_frame(1.5);
    assert_eq!(looped.positions, frame.positions);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_buffer_file_is_an_io_error() {
    let dir = scratch_dir("missing");
    let path = write_chain(&dir);
    fs::remove_file(dir.join("chain.bin")).unwrap();

    assert!(matches!(load_gltf(&path), Err(Error::Io(_))));
    fs::remove_dir_all(&dir).ok();
}
