use crate::controls::OrbitControls;
use crate::uniforms::SceneUniforms;

/// Device pixel ratios above this are clamped; denser buffers cost fill rate
/// without a visible payoff for this scene.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Tracked window dimensions and pixel density.
///
/// This is the single source for the pixel-ratio clamp: both the render
/// surface and the fireflies material read [`Viewport::pixel_ratio`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    scale_factor: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            scale_factor: scale_factor.max(1.0),
        }
    }

    /// Records a new window size, keeping both dimensions at least one pixel.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Records a monitor or DPI change.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor.max(1.0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Camera aspect ratio for the current size.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Device pixel ratio clamped to [`MAX_PIXEL_RATIO`].
    pub fn pixel_ratio(&self) -> f32 {
        self.scale_factor.min(MAX_PIXEL_RATIO) as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

/// One animation step, decoupled from the host scheduler.
///
/// Stamps the elapsed time into both animated materials, then integrates the
/// camera damping for this frame.  Rendering and rescheduling stay with the
/// caller.
pub fn advance_frame(
    elapsed_seconds: f32,
    dt: f32,
    uniforms: &mut SceneUniforms,
    controls: &mut OrbitControls,
) {
    uniforms.set_time(elapsed_seconds);
    controls.update(dt);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_matches_dimensions() {
        let viewport = Viewport::new(800, 600, 1.0);
        assert_eq!(viewport.aspect(), 800.0 / 600.0);
    }

    #[test]
    fn pixel_ratio_is_clamped_to_two() {
        for (scale, expected) in [(1.0, 1.0), (2.0, 2.0), (3.0, 2.0)] {
            let viewport = Viewport::new(800, 600, scale);
            assert_eq!(viewport.pixel_ratio(), expected);
        }
    }

    #[test]
    fn resize_never_reaches_zero() {
        let mut viewport = Viewport::default();
        viewport.resize(0, 0);
        assert_eq!((viewport.width(), viewport.height()), (1, 1));
    }

    #[test]
    fn later_steps_overwrite_earlier_times() {
        let mut uniforms = SceneUniforms::default();
        let mut controls = OrbitControls::portal_default();
        advance_frame(0.8, 0.016, &mut uniforms, &mut controls);
        advance_frame(2.4, 0.016, &mut uniforms, &mut controls);
        assert_eq!(uniforms.portal.time, 2.4);
        assert_eq!(uniforms.fireflies.time, 2.4);
    }
}
