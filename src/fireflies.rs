use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

/// Reference particle count of the portal scene.
pub const FIREFLY_COUNT: usize = 30;
/// Horizontal footprint of the field, centered on the origin.
pub const FIELD_EXTENT: f32 = 4.0;
/// Vertical span of the field, starting at ground level.
pub const FIELD_HEIGHT: f32 = 1.5;

/// Static firefly set dressing: parallel flat buffers of per-particle
/// positions and scales, generated once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct FireflyField {
    /// `x, y, z` triples, `count * 3` values.
    pub positions: Vec<f32>,
    /// One scale per particle in `[0, 1)`.
    pub scales: Vec<f32>,
}

impl FireflyField {
    /// Generates `count` particles inside the given extents.
    ///
    /// `x` and `z` are uniform in `[-extent / 2, extent / 2]`, `y` is uniform
    /// in `[0, height]`.  The seed pins the layout for tests; the binary
    /// seeds from wall-clock time to match the reference's unseeded source.
    pub fn generate(count: usize, extent: f32, height: f32, seed: u64) -> Self {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut positions = Vec::with_capacity(count * 3);
        let mut scales = Vec::with_capacity(count);

        for _ in 0..count {
            positions.push((rng.gen::<f32>() - 0.5) * extent);
            positions.push(rng.gen::<f32>() * height);
            positions.push((rng.gen::<f32>() - 0.5) * extent);
            scales.push(rng.gen::<f32>());
        }

        Self { positions, scales }
    }

    /// Generates the reference configuration.
    pub fn portal_default(seed: u64) -> Self {
        Self::generate(FIREFLY_COUNT, FIELD_EXTENT, FIELD_HEIGHT, seed)
    }

    /// Number of particles in the field.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_lengths_match_count() {
        for count in [0, 1, 7, 30, 256] {
            let field = FireflyField::generate(count, 4.0, 1.5, 9);
            assert_eq!(field.positions.len(), count * 3);
            assert_eq!(field.scales.len(), count);
            assert_eq!(field.len(), count);
        }
    }

    #[test]
    fn values_stay_inside_documented_ranges() {
        let extent = 4.0;
        let height = 1.5;
        let field = FireflyField::generate(500, extent, height, 42);
        for triple in field.positions.chunks_exact(3) {
            assert!(triple[0] >= -extent / 2.0 && triple[0] <= extent / 2.0);
            assert!(triple[1] >= 0.0 && triple[1] <= height);
            assert!(triple[2] >= -extent / 2.0 && triple[2] <= extent / 2.0);
        }
        for scale in &field.scales {
            assert!((0.0..1.0).contains(scale));
        }
    }

    #[test]
    fn same_seed_reproduces_the_field() {
        let a = FireflyField::generate(30, 4.0, 1.5, 7);
        let b = FireflyField::generate(30, 4.0, 1.5, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = FireflyField::generate(30, 4.0, 1.5, 7);
        let b = FireflyField::generate(30, 4.0, 1.5, 8);
        assert_ne!(a, b);
    }

    #[test]
    fn reference_configuration_shape() {
        let field = FireflyField::portal_default(1);
        assert_eq!(field.positions.len(), 90);
        assert_eq!(field.scales.len(), 30);
    }
}
