use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::SceneGraph;

/// Node that carries the baked-lighting texture.
pub const BAKED_NODE: &str = "baked";
/// Right pole lamp head.
pub const POLE_LIGHT_RIGHT_NODE: &str = "poleLightRight";
/// Left pole lamp head.
pub const POLE_LIGHT_LEFT_NODE: &str = "poleLightLeft";
/// The portal surface driven by the animated shader.
pub const PORTAL_NODE: &str = "portalLight";

/// Archive entry holding the baked-lighting image.
pub const BAKED_TEXTURE_ENTRY: &str = "textures/baked.png";

/// Warm white of the pole lamp heads (0xffffe5).
pub const POLE_LIGHT_COLOR: Vec3 = Vec3::new(1.0, 1.0, 229.0 / 255.0);

/// Material bound to a scene node.
///
/// The fireflies are not part of the loaded scene graph, so their material
/// lives with the particle pipeline rather than here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Material {
    /// Unlit, textured with pre-computed lighting.
    Baked { texture: String },
    /// Unlit solid color.
    Flat { color: Vec3 },
    /// The animated two-color portal shader.
    Portal,
}

/// Error raised while binding materials to scene nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialError {
    /// A required node is absent from the loaded scene graph.
    #[error("asset node not found in scene: {name}")]
    NodeNotFound { name: String },
}

/// The fixed node-to-material mapping of the portal scene.
pub fn portal_assignments() -> Vec<(String, Material)> {
    vec![
        (
            BAKED_NODE.to_string(),
            Material::Baked {
                texture: BAKED_TEXTURE_ENTRY.to_string(),
            },
        ),
        (
            POLE_LIGHT_RIGHT_NODE.to_string(),
            Material::Flat {
                color: POLE_LIGHT_COLOR,
            },
        ),
        (
            POLE_LIGHT_LEFT_NODE.to_string(),
            Material::Flat {
                color: POLE_LIGHT_COLOR,
            },
        ),
        (PORTAL_NODE.to_string(), Material::Portal),
    ]
}

/// Binds each `{node name -> material}` entry to the node with that exact
/// name.
///
/// All names are validated before any node is touched, so a missing name
/// leaves the graph unmodified.
pub fn assign_materials(
    graph: &mut SceneGraph,
    assignments: &[(String, Material)],
) -> Result<(), MaterialError> {
    for (name, _) in assignments {
        if graph.find(name).is_none() {
            return Err(MaterialError::NodeNotFound { name: name.clone() });
        }
    }
    for (name, material) in assignments {
        let node = graph.find_mut(name).expect("validated above");
        node.material = Some(material.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneNode;

    fn make_graph(names: &[&str]) -> SceneGraph {
        SceneGraph {
            nodes: names
                .iter()
                .map(|name| SceneNode {
                    name: name.to_string(),
                    ..SceneNode::default()
                })
                .collect(),
        }
    }

    fn full_graph() -> SceneGraph {
        make_graph(&[
            BAKED_NODE,
            POLE_LIGHT_RIGHT_NODE,
            POLE_LIGHT_LEFT_NODE,
            PORTAL_NODE,
            "floorDecoration",
        ])
    }

    #[test]
    fn binds_each_required_node() {
        let mut graph = full_graph();
        assign_materials(&mut graph, &portal_assignments()).unwrap();

        assert!(matches!(
            graph.find(BAKED_NODE).unwrap().material,
            Some(Material::Baked { .. })
        ));
        assert_eq!(
            graph.find(POLE_LIGHT_RIGHT_NODE).unwrap().material,
            Some(Material::Flat {
                color: POLE_LIGHT_COLOR
            })
        );
        assert_eq!(
            graph.find(POLE_LIGHT_LEFT_NODE).unwrap().material,
            Some(Material::Flat {
                color: POLE_LIGHT_COLOR
            })
        );
        assert_eq!(
            graph.find(PORTAL_NODE).unwrap().material,
            Some(Material::Portal)
        );
    }

    #[test]
    fn leaves_unlisted_nodes_untouched() {
        let mut graph = full_graph();
        assign_materials(&mut graph, &portal_assignments()).unwrap();
        assert!(graph.find("floorDecoration").unwrap().material.is_none());
    }

    #[test]
    fn missing_node_reports_name_and_mutates_nothing() {
        let mut graph = make_graph(&[BAKED_NODE, POLE_LIGHT_RIGHT_NODE, PORTAL_NODE]);
        let err = assign_materials(&mut graph, &portal_assignments()).unwrap_err();
        assert_eq!(
            err,
            MaterialError::NodeNotFound {
                name: POLE_LIGHT_LEFT_NODE.to_string()
            }
        );
        assert!(graph.nodes.iter().all(|node| node.material.is_none()));
    }

    #[test]
    fn error_message_names_the_missing_node() {
        let err = MaterialError::NodeNotFound {
            name: "portalLight".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "asset node not found in scene: portalLight"
        );
    }
}
