use glam::Vec3;

use crate::tweaks::Tweaks;

/// CPU-side mirror of the portal material's uniform set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalUniforms {
    pub time: f32,
    pub color_start: Vec3,
    pub color_end: Vec3,
}

impl Default for PortalUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            color_start: Vec3::ZERO,
            color_end: Vec3::ONE,
        }
    }
}

/// CPU-side mirror of the fireflies material's uniform set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirefliesUniforms {
    pub pixel_ratio: f32,
    /// Base billboard size in pixels before per-particle scaling.
    pub size: f32,
    pub time: f32,
}

impl Default for FirefliesUniforms {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            size: 100.0,
            time: 0.0,
        }
    }
}

/// Every uniform the frame loop writes, grouped so one `set_time` call keeps
/// both materials in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneUniforms {
    pub portal: PortalUniforms,
    pub fireflies: FirefliesUniforms,
}

impl SceneUniforms {
    /// Stamps the elapsed time into both animated materials.
    pub fn set_time(&mut self, elapsed_seconds: f32) {
        self.portal.time = elapsed_seconds;
        self.fireflies.time = elapsed_seconds;
    }

    /// Pulls the live-tweakable values out of the debug state.
    ///
    /// The clear color is applied by the renderer directly and is not part
    /// of either material.
    pub fn apply_tweaks(&mut self, tweaks: &Tweaks) {
        self.portal.color_start = tweaks.portal_color_start;
        self.portal.color_end = tweaks.portal_color_end;
        self.fireflies.size = tweaks.fireflies_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweaks::Tweaks;

    #[test]
    fn set_time_updates_both_materials() {
        let mut uniforms = SceneUniforms::default();
        uniforms.set_time(1.5);
        assert_eq!(uniforms.portal.time, 1.5);
        assert_eq!(uniforms.fireflies.time, 1.5);
    }

    #[test]
    fn latest_time_wins() {
        let mut uniforms = SceneUniforms::default();
        uniforms.set_time(0.4);
        uniforms.set_time(2.75);
        assert_eq!(uniforms.portal.time, 2.75);
        assert_eq!(uniforms.fireflies.time, 2.75);
    }

    #[test]
    fn tweaks_write_through() {
        let mut uniforms = SceneUniforms::default();
        let mut tweaks = Tweaks::default();
        tweaks.portal_color_start = Vec3::new(0.1, 0.2, 0.3);
        tweaks.fireflies_size = 250.0;
        uniforms.apply_tweaks(&tweaks);
        assert_eq!(uniforms.portal.color_start, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(uniforms.fireflies.size, 250.0);
    }
}
