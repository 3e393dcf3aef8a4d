//! Stereo constant-Q projection onto the circle

use crate::tables::ConstantQTable;

/// Builds the circular band vector: left bands forward, then right bands reversed
///
/// Left therefore fills the first half of the circle and right mirrors it back to the
/// start, which keeps the stereo image symmetric around angle 0.
#[derive(Debug)]
pub struct ConstantQProjector {
    right_scratch: Vec<f32>,
    bands: Vec<f32>,
}

impl ConstantQProjector {
    pub fn new(table: &ConstantQTable) -> Self {
        Self {
            right_scratch: vec![0.0; table.num_band_bins],
            bands: vec![0.0; table.circular_band_count()],
        }
    }

    /// Project both channels and return the circular band vector
    pub fn project(&mut self, table: &ConstantQTable, left: &[f32], right: &[f32]) -> &[f32] {
        let half = table.num_band_bins;
        let (left_half, right_half) = self.bands.split_at_mut(half);

        table.project_into(left, left_half);
        table.project_into(right, &mut self.right_scratch);
        for (slot, &value) in right_half.iter_mut().zip(self.right_scratch.iter().rev()) {
            *slot = value;
        }

        &self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::uniform_table;

    #[test]
    fn test_left_forward_right_reversed() {
        let table = uniform_table(8, 4);
        let mut projector = ConstantQProjector::new(&table);

        let left = [0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4];
        let right = [0.5, 0.5, 0.6, 0.6, 0.7, 0.7, 0.8, 0.8];
        let bands = projector.project(&table, &left, &right).to_vec();

        let expected = [0.1, 0.2, 0.3, 0.4, 0.8, 0.7, 0.6, 0.5];
        assert_eq!(bands.len(), table.circular_band_count());
        for (got, want) in bands.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{:?}", bands);
        }
    }

    #[test]
    fn test_matches_concat_of_table_projections() {
        let table = uniform_table(512, 64);
        let mut projector = ConstantQProjector::new(&table);
        let left: Vec<f32> = (0..512).map(|i| (i as f32 / 512.0).sin().abs()).collect();
        let right: Vec<f32> = (0..512).map(|i| (i as f32 / 97.0).cos().abs()).collect();

        let mut expected = table.project(&left);
        expected.extend(table.project(&right).into_iter().rev());

        let bands = projector.project(&table, &left, &right);
        assert_eq!(bands.len(), 128);
        assert_eq!(bands, expected.as_slice());
    }
}
