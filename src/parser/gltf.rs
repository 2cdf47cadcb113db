//! glTF 2.0 rig loader.
//!
//! Reads mesh 0 / primitive 0, skin 0 and animation 0 of a document through
//! the `gltf` crate readers, so sparse accessors, byte strides and
//! normalized integers are handled there. Binary containers (`.glb`) and
//! embedded buffers are accepted as well.

use std::collections::HashMap;
use std::path::Path;

use gltf::accessor::{DataType, Dimensions};
use gltf::animation::util::ReadOutputs;
use gltf::animation::{Interpolation, Property};
use gltf::buffer::Data;
use gltf::mesh::Mode;
use gltf::{Accessor, Document, Gltf};
use nalgebra_glm as glm;

use crate::animation::{Bone, Channel, ChannelValues, Trs};
use crate::error::{Error, Result};
use crate::model::RigData;
use crate::skinning::VertexInfluences;

/// Float accessors are read through fixed-size items, so their layout is
/// checked before a reader touches them.
fn expect_float(accessor: &Accessor, dimensions: Dimensions, what: &str) -> Result<()> {
    if accessor.data_type() != DataType::F32 || accessor.dimensions() != dimensions {
        return Err(Error::Gltf(format!(
            "{what} accessor {} is {:?} {:?}, expected F32 {dimensions:?}",
            accessor.index(),
            accessor.data_type(),
            accessor.dimensions()
        )));
    }
    Ok(())
}

/// Dense accessors must lie inside their view and the view inside its
/// buffer before a reader slices them.
fn check_fits(accessor: &Accessor, buffers: &[Data]) -> Result<()> {
    let Some(view) = accessor.view() else {
        return Ok(());
    };
    let size = accessor.size();
    let stride = view.stride().unwrap_or(size);
    let extent = match accessor.count() {
        0 => 0,
        count => (count - 1) * stride + size,
    };
    if accessor.offset() + extent > view.length() {
        return Err(Error::Gltf(format!(
            "accessor {} does not fit its view",
            accessor.index()
        )));
    }
    let available = buffers.get(view.buffer().index()).map_or(0, |data| data.0.len());
    if view.offset() + view.length() > available {
        return Err(Error::Gltf(format!(
            "buffer view {} does not fit its buffer",
            view.index()
        )));
    }
    Ok(())
}

fn missing(what: &str) -> Error {
    Error::Gltf(format!("{what} data is missing or lies outside its buffer"))
}

fn rest_of(node: &gltf::Node) -> Trs {
    let (t, [x, y, z, w], s) = node.transform().decomposed();
    Trs {
        translation: glm::Vec3::from(t),
        rotation: glm::quat_normalize(&glm::quat(x, y, z, w)),
        scale: glm::Vec3::from(s),
    }
}

type Skinning = (Vec<Bone>, Vec<VertexInfluences>, HashMap<usize, usize>);

fn read_skin(
    skin: gltf::Skin,
    primitive: &gltf::Primitive,
    buffers: &[Data],
    num_vertices: usize,
) -> Result<Skinning> {
    let get = |buffer: gltf::Buffer| buffers.get(buffer.index()).map(|data| &data.0[..]);

    let joints: Vec<gltf::Node> = skin.joints().collect();
    let joint_of_node: HashMap<usize, usize> = joints
        .iter()
        .enumerate()
        .map(|(bone, node)| (node.index(), bone))
        .collect();

    let inverse_binds: Vec<glm::Mat4> = match skin.inverse_bind_matrices() {
        Some(accessor) => {
            expect_float(&accessor, Dimensions::Mat4, "inverse bind matrix")?;
            check_fits(&accessor, buffers)?;
            skin.reader(get)
                .read_inverse_bind_matrices()
                .ok_or_else(|| missing("inverse bind matrix"))?
                .map(glm::Mat4::from)
                .collect()
        }
        None => vec![glm::Mat4::identity(); joints.len()],
    };
    if inverse_binds.len() != joints.len() {
        return Err(Error::length(
            "inverse bind matrices",
            joints.len(),
            inverse_binds.len(),
        ));
    }

    let mut bones: Vec<Bone> = joints
        .iter()
        .zip(inverse_binds)
        .enumerate()
        .map(|(bone, (node, inverse_bind))| Bone {
            name: node
                .name()
                .map_or_else(|| format!("joint{bone}"), str::to_string),
            parent: None,
            inverse_bind,
            rest: rest_of(node),
        })
        .collect();

    // joints whose parent node is not a joint become roots
    for (bone, node) in joints.iter().enumerate() {
        for child in node.children() {
            if let Some(&child_bone) = joint_of_node.get(&child.index()) {
                bones[child_bone].parent = Some(bone);
            }
        }
    }

    for semantic in [gltf::Semantic::Joints(0), gltf::Semantic::Weights(0)] {
        if let Some(accessor) = primitive.get(&semantic) {
            check_fits(&accessor, buffers)?;
        }
    }
    let reader = primitive.reader(get);
    let indices: Vec<[u16; 4]> = reader
        .read_joints(0)
        .ok_or_else(|| Error::Gltf("skinned primitive has no JOINTS_0 attribute".into()))?
        .into_u16()
        .collect();
    let weights: Vec<[f32; 4]> = reader
        .read_weights(0)
        .ok_or_else(|| Error::Gltf("skinned primitive has no WEIGHTS_0 attribute".into()))?
        .into_f32()
        .collect();
    if indices.len() != num_vertices {
        return Err(Error::length("JOINTS_0", num_vertices, indices.len()));
    }
    if weights.len() != num_vertices {
        return Err(Error::length("WEIGHTS_0", num_vertices, weights.len()));
    }

    let influences = indices
        .into_iter()
        .zip(weights)
        .map(|(j, w)| VertexInfluences::new(j.map(u32::from), w))
        .collect();

    Ok((bones, influences, joint_of_node))
}

fn read_animation(
    animation: gltf::Animation,
    buffers: &[Data],
    joint_of_node: &HashMap<usize, usize>,
) -> Result<Vec<Channel>> {
    let get = |buffer: gltf::Buffer| buffers.get(buffer.index()).map(|data| &data.0[..]);

    let mut channels = Vec::new();
    for channel in animation.channels() {
        let target = channel.target();
        let node = target.node().index();
        let Some(&bone) = joint_of_node.get(&node) else {
            log::debug!("skipping channel targeting non-joint node {node}");
            continue;
        };
        let property = target.property();
        if property == Property::MorphTargetWeights {
            log::warn!("skipping unsupported morph weight channel on node {node}");
            continue;
        }

        let sampler = channel.sampler();
        let interpolation = sampler.interpolation();
        if interpolation != Interpolation::Linear {
            return Err(Error::Unsupported(format!(
                "{interpolation:?} keyframe interpolation"
            )));
        }
        expect_float(&sampler.input(), Dimensions::Scalar, "keyframe time")?;
        if property != Property::Rotation {
            expect_float(&sampler.output(), Dimensions::Vec3, "keyframe value")?;
        }
        check_fits(&sampler.input(), buffers)?;
        check_fits(&sampler.output(), buffers)?;

        let reader = channel.reader(get);
        let times: Vec<f32> = reader
            .read_inputs()
            .ok_or_else(|| missing("keyframe time"))?
            .collect();
        let values = match reader.read_outputs().ok_or_else(|| missing("keyframe value"))? {
            ReadOutputs::Translations(iter) => {
                ChannelValues::Translation(iter.map(glm::Vec3::from).collect())
            }
            ReadOutputs::Rotations(iter) => ChannelValues::Rotation(
                iter.into_f32()
                    .map(|[x, y, z, w]| glm::quat_normalize(&glm::quat(x, y, z, w)))
                    .collect(),
            ),
            ReadOutputs::Scales(iter) => ChannelValues::Scale(iter.map(glm::Vec3::from).collect()),
            ReadOutputs::MorphTargetWeights(_) => continue,
        };
        channels.push(Channel::new(bone, times, values)?);
    }
    Ok(channels)
}

fn build(document: &Document, buffers: &[Data]) -> Result<RigData> {
    let mesh = document
        .meshes()
        .next()
        .ok_or_else(|| Error::Gltf("document has no meshes".into()))?;
    let primitive = mesh
        .primitives()
        .next()
        .ok_or_else(|| Error::Gltf("mesh 0 has no primitives".into()))?;
    if primitive.mode() != Mode::Triangles {
        return Err(Error::Unsupported(format!("primitive mode {:?}", primitive.mode())));
    }

    let position = primitive
        .get(&gltf::Semantic::Positions)
        .ok_or_else(|| Error::Gltf("primitive has no POSITION attribute".into()))?;
    expect_float(&position, Dimensions::Vec3, "POSITION")?;
    check_fits(&position, buffers)?;

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<glm::Vec3> = reader
        .read_positions()
        .ok_or_else(|| missing("POSITION"))?
        .map(glm::Vec3::from)
        .collect();

    let indices: Vec<u32> = match primitive.indices() {
        Some(accessor) => {
            check_fits(&accessor, buffers)?;
            reader
                .read_indices()
                .ok_or_else(|| missing("index"))?
                .into_u32()
                .collect()
        }
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(Error::Gltf(format!(
            "{} indices do not form whole triangles",
            indices.len()
        )));
    }
    let triangles = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    let (bones, influences, joint_of_node) = match document.skins().next() {
        Some(skin) => read_skin(skin, &primitive, buffers, positions.len())?,
        None => {
            log::debug!("no skin, binding all vertices to a single root bone");
            let root = Bone {
                name: "root".into(),
                ..Default::default()
            };
            (
                vec![root],
                vec![VertexInfluences::single(0); positions.len()],
                HashMap::new(),
            )
        }
    };

    let channels = match document.animations().next() {
        Some(animation) => read_animation(animation, buffers, &joint_of_node)?,
        None => Vec::new(),
    };

    Ok(RigData {
        name: mesh.name().unwrap_or("gltf").to_string(),
        triangles,
        positions,
        influences,
        bones,
        channels,
    })
}

/// Parse a glTF JSON document whose buffer 0 holds `bin`.
pub fn parse_gltf(json: &str, bin: &[u8]) -> Result<RigData> {
    let gltf = Gltf::from_slice(json.as_bytes())?;
    build(&gltf.document, &[Data(bin.to_vec())])
}

/// Parse a binary glTF container.
pub fn parse_glb(bytes: &[u8]) -> Result<RigData> {
    if !bytes.starts_with(b"glTF") {
        return Err(Error::Gltf("missing glTF magic".into()));
    }
    let Gltf { document, blob } = Gltf::from_slice(bytes)?;
    let buffers: Vec<Data> = blob.map(Data).into_iter().collect();
    build(&document, &buffers)
}

/// Load a `.gltf` (buffers next to it or embedded) or `.glb` file.
pub fn load_gltf(path: impl AsRef<Path>) -> Result<RigData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)?;
    log::debug!(
        "read {} buffer(s), {} bytes for {}",
        buffers.len(),
        buffers.iter().map(|b| b.0.len()).sum::<usize>(),
        path.display()
    );
    build(&document, &buffers)
}
