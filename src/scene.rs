use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::material::Material;

/// Runtime representation of the loaded scene graph.
///
/// The portal scene is a flat collection of uniquely named nodes; nothing in
/// the runtime needs hierarchy, so none is modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
}

impl SceneGraph {
    /// Parses the scene manifest XML stored in the archive.
    ///
    /// Node names must be unique; the material binding step relies on exact
    /// single-match lookup.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene manifest XML")?;
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();

        for element in document.descendants().filter(|n| n.has_tag_name("node")) {
            let mut node = SceneNode::default();
            node.name = required_text(&element, "name")?;
            if !seen.insert(node.name.clone()) {
                return Err(anyhow!("duplicate node name in manifest: {}", node.name));
            }
            node.mesh = optional_text(&element, "mesh");
            node.position = parse_vec3(optional_text(&element, "position"), node.position)?;
            node.rotation = parse_vec3(optional_text(&element, "rotation"), node.rotation)?;
            node.scale = parse_vec3(optional_text(&element, "scale"), node.scale)?;
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    /// Looks up a node by exact, case-sensitive name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Mutable variant of [`SceneGraph::find`].
    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.name == name)
    }
}

/// A named node as described by the scene manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Bound by the material assignment pass; `None` straight after parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            material: None,
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>());
    let mut next = || {
        numbers
            .next()
            .ok_or_else(|| anyhow!("vector is missing components"))?
            .map_err(|err| anyhow!("failed to parse vector component: {err}"))
    };
    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Vec3::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <node>
            <name>baked</name>
            <mesh>meshes/baked.obj</mesh>
        </node>
        <node>
            <name>portalLight</name>
            <mesh>meshes/portal.obj</mesh>
            <position>0 0.78 -1.7</position>
        </node>
    </scene>
    "#;

    #[test]
    fn parse_manifest_populates_nodes() {
        let graph = SceneGraph::from_xml(SAMPLE).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        let portal = graph.find("portalLight").unwrap();
        assert_eq!(portal.mesh.as_deref(), Some("meshes/portal.obj"));
        assert_eq!(portal.position, Vec3::new(0.0, 0.78, -1.7));
        assert_eq!(portal.scale, Vec3::ONE);
        assert!(portal.material.is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let graph = SceneGraph::from_xml(SAMPLE).unwrap();
        assert!(graph.find("portalLight").is_some());
        assert!(graph.find("portallight").is_none());
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><node><mesh>meshes/baked.obj</mesh></node></scene>";
        assert!(SceneGraph::from_xml(bad).is_err());
    }

    #[test]
    fn duplicate_names_are_an_error() {
        let bad = "<scene><node><name>baked</name></node><node><name>baked</name></node></scene>";
        assert!(SceneGraph::from_xml(bad).is_err());
    }

    #[test]
    fn malformed_vector_is_an_error() {
        let bad = "<scene><node><name>baked</name><position>1 2</position></node></scene>";
        assert!(SceneGraph::from_xml(bad).is_err());
    }
}
