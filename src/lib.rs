//! Core modules for the portal scene runtime.
//!
//! The crate exposes the building blocks of a small baked-lighting scene
//! viewer: the `.portal` asset container, the scene graph and material
//! bindings, the firefly particle field, the orbit camera, and the wgpu
//! renderer.  Everything that can run without a GPU lives behind plain data
//! types so that loading and animation logic stays testable in headless
//! environments.

pub mod app;
pub mod archive;
pub mod controls;
pub mod fireflies;
pub mod material;
pub mod mesh;
pub mod panel;
pub mod render;
pub mod scene;
pub mod texture;
pub mod tweaks;
pub mod uniforms;

pub use app::{advance_frame, Viewport, MAX_PIXEL_RATIO};
pub use archive::{ArchiveEntry, PortalArchive};
pub use controls::OrbitControls;
pub use fireflies::FireflyField;
pub use material::{assign_materials, portal_assignments, Material, MaterialError};
pub use mesh::{decode_obj, MeshData};
pub use render::{CameraParams, Renderer};
pub use scene::{SceneGraph, SceneNode};
pub use texture::BakedTexture;
pub use tweaks::{parse_hex_color, TweakHandle, Tweaks};
pub use uniforms::{FirefliesUniforms, PortalUniforms, SceneUniforms};
