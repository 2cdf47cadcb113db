// Bone hierarchy and global transform composition

use std::collections::VecDeque;

use nalgebra_glm as glm;

use super::transform::compose;
use super::types::Trs;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Parent bone index, `None` for roots
    pub parent: Option<usize>,
    /// Maps bind-pose model space into this bone's space at bind time
    pub inverse_bind: glm::Mat4,
    /// Local transform used for properties no channel animates
    pub rest: Trs,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            inverse_bind: glm::identity(),
            rest: Trs::default(),
        }
    }
}

impl Bone {
    pub fn new(parent: Option<usize>, inverse_bind: glm::Mat4) -> Self {
        Self {
            parent,
            inverse_bind,
            ..Default::default()
        }
    }
}

/// Flat forest of bones with a precomputed parent-before-child order.
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    order: Vec<usize>,
}

impl Skeleton {
    /// Validate the parent graph and establish the evaluation order.
    pub fn new(bones: Vec<Bone>) -> Result<Self> {
        let n = bones.len();
        let mut children = vec![Vec::new(); n];
        let mut roots = VecDeque::new();

        for (i, bone) in bones.iter().enumerate() {
            match bone.parent {
                None => roots.push_back(i),
                Some(p) if p == i || p >= n => {
                    return Err(Error::InvalidParent {
                        bone: i,
                        parent: p as i64,
                    });
                }
                Some(p) => children[p].push(i),
            }
        }

        // Kahn's walk from the roots; bones on a cycle are never reached
        let mut order = Vec::with_capacity(n);
        while let Some(i) = roots.pop_front() {
            order.push(i);
            roots.extend(children[i].iter().copied());
        }

        if order.len() != n {
            return Err(Error::CyclicHierarchy {
                unreachable: n - order.len(),
            });
        }

        Ok(Self { bones, order })
    }

    /// Build from loader arrays where `-1` marks a root.
    pub fn from_parents(parents: &[i32], inverse_binds: &[glm::Mat4]) -> Result<Self> {
        if parents.len() != inverse_binds.len() {
            return Err(Error::length(
                "inverse bind matrices",
                parents.len(),
                inverse_binds.len(),
            ));
        }

        let bones = parents
            .iter()
            .zip(inverse_binds)
            .enumerate()
            .map(|(i, (&parent, inverse_bind))| {
                let parent = match parent {
                    -1 => None,
                    p if p >= 0 => Some(p as usize),
                    p => {
                        return Err(Error::InvalidParent {
                            bone: i,
                            parent: p as i64,
                        })
                    }
                };
                Ok(Bone::new(parent, *inverse_bind))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(bones)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bone indices ordered so every parent precedes its children.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn inverse_binds(&self) -> Vec<glm::Mat4> {
        self.bones.iter().map(|b| b.inverse_bind).collect()
    }

    /// Compose local transforms into model space.
    ///
    /// Roots keep their local transform; every other bone gets
    /// `global[parent] * local[bone]`.
    pub fn global_transforms(&self, locals: &[glm::Mat4]) -> Result<Vec<glm::Mat4>> {
        if locals.len() != self.bones.len() {
            return Err(Error::length("local transforms", self.bones.len(), locals.len()));
        }

        Ok(self.walk(locals))
    }

    pub(crate) fn walk(&self, locals: &[glm::Mat4]) -> Vec<glm::Mat4> {
        let mut global = vec![glm::Mat4::identity(); self.bones.len()];
        for &i in &self.order {
            global[i] = match self.bones[i].parent {
                None => locals[i],
                Some(p) => compose(&global[p], &locals[i]),
            };
        }
        global
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::transform::{from_quaternion, from_translation};
    use approx::assert_relative_eq;

    fn chain(parents: &[i32]) -> Skeleton {
        let binds = vec![glm::Mat4::identity(); parents.len()];
        Skeleton::from_parents(parents, &binds).unwrap()
    }

    #[test]
    fn parents_precede_children() {
        // children listed before their parents
        let skeleton = chain(&[3, 0, 0, -1, 1]);
        let position = |b: usize| skeleton.order().iter().position(|&i| i == b).unwrap();
        for (i, bone) in skeleton.bones().iter().enumerate() {
            if let Some(p) = bone.parent {
                assert!(position(p) < position(i));
            }
        }
    }

    #[test]
    fn hierarchy_composition() {
        let skeleton = chain(&[-1, 0, 1, -1]);
        let locals = vec![
            from_translation(&glm::vec3(1.0, 0.0, 0.0)),
            from_quaternion(&glm::quat_angle_axis(0.5, &glm::vec3(0.0, 0.0, 1.0))),
            from_translation(&glm::vec3(0.0, 2.0, 0.0)),
            from_translation(&glm::vec3(0.0, 0.0, 7.0)),
        ];
        let global = skeleton.global_transforms(&locals).unwrap();

        for (i, bone) in skeleton.bones().iter().enumerate() {
            match bone.parent {
                None => assert_eq!(global[i], locals[i]),
                Some(p) => {
                    assert_relative_eq!(global[i], compose(&global[p], &locals[i]), epsilon = 1e-6)
                }
            }
        }
    }

    #[test]
    fn rejects_cycles() {
        let binds = vec![glm::Mat4::identity(); 3];
        let err = Skeleton::from_parents(&[-1, 2, 1], &binds).unwrap_err();
        assert!(matches!(err, Error::CyclicHierarchy { unreachable: 2 }));
    }

    #[test]
    fn rejects_unrooted_graph() {
        let binds = vec![glm::Mat4::identity(); 2];
        let err = Skeleton::from_parents(&[1, 0], &binds).unwrap_err();
        assert!(matches!(err, Error::CyclicHierarchy { unreachable: 2 }));
    }

    #[test]
    fn rejects_bad_parents() {
        let binds = vec![glm::Mat4::identity(); 2];
        assert!(matches!(
            Skeleton::from_parents(&[-1, 5], &binds),
            Err(Error::InvalidParent { bone: 1, parent: 5 })
        ));
        assert!(matches!(
            Skeleton::from_parents(&[-2, 0], &binds),
            Err(Error::InvalidParent { bone: 0, parent: -2 })
        ));
        assert!(matches!(
            Skeleton::from_parents(&[-1, 1], &binds),
            Err(Error::InvalidParent { bone: 1, parent: 1 })
        ));
        assert!(matches!(
            Skeleton::from_parents(&[-1], &binds),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn mismatched_locals() {
        let skeleton = chain(&[-1, 0]);
        assert!(skeleton.global_transforms(&[glm::Mat4::identity()]).is_err());
    }
}
