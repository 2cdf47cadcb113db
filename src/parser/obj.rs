// Wavefront OBJ geometry: `v` and `f` records only

use std::fs;
use std::path::Path;

use nalgebra_glm as glm;

use crate::error::{Error, Result};
use crate::model::TriMesh;

/// Resolve one face corner (`7`, `7/1`, `7//3`, `-1`, ...) to a 0-based index.
fn corner(token: &str, line: usize, num_vertices: usize) -> Result<u32> {
    let head = token.split('/').next().unwrap_or_default();
    let index: i64 = head
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid vertex reference '{token}'")))?;

    // negative indices count back from the last vertex read so far
    let resolved = match index {
        0 => return Err(Error::parse(line, "vertex indices start at 1")),
        i if i > 0 => i - 1,
        i => num_vertices as i64 + i,
    };
    if resolved < 0 || resolved >= num_vertices as i64 {
        return Err(Error::parse(
            line,
            format!("vertex {index} out of range ({num_vertices} defined)"),
        ));
    }
    Ok(resolved as u32)
}

/// Parse OBJ text. Polygons are fan-triangulated.
pub fn parse_obj(text: &str) -> Result<TriMesh> {
    let mut positions = Vec::new();
    let mut triangles = Vec::new();

    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        let mut tokens = raw.split_whitespace();
        match tokens.next() {
            None => {}
            Some(t) if t.starts_with('#') => {}
            Some("v") => {
                let mut xyz = [0.0f32; 3];
                for c in &mut xyz {
                    let token = tokens
                        .next()
                        .ok_or_else(|| Error::parse(line, "vertex needs three coordinates"))?;
                    *c = token
                        .parse()
                        .map_err(|_| Error::parse(line, format!("invalid coordinate '{token}'")))?;
                }
                positions.push(glm::vec3(xyz[0], xyz[1], xyz[2]));
            }
            Some("f") => {
                let corners = tokens
                    .map(|t| corner(t, line, positions.len()))
                    .collect::<Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    return Err(Error::parse(line, "face needs at least three vertices"));
                }
                for i in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            Some(other) => log::trace!("obj line {line}: ignoring '{other}' record"),
        }
    }

    log::debug!(
        "obj: {} vertices, {} triangles",
        positions.len(),
        triangles.len()
    );
    TriMesh::new(triangles, positions)
}

pub fn load_obj(path: impl AsRef<Path>) -> Result<TriMesh> {
    let text = fs::read_to_string(path)?;
    parse_obj(&text)
}
