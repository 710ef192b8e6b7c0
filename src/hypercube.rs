//! Layered view of the hypercube `[0, base)^dimension`.
//!
//! A vertex `a` sits in layer `d = sum(base - 1 - a_i)`, its distance from
//! the all-max vertex. The message encoding maps a bounded integer onto the
//! vertices of the top layers `0..=max_layer`; the functions here count those
//! vertices, locate the layer of a given index and unrank an in-layer offset
//! back into a vertex.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Counting tables for one `(base, dimension, max_layer)` shape.
///
/// `counts[m][s]` is the number of ways `m` coordinates, each in
/// `[0, base)`, can sum to `s`. Values grow far beyond `u128`, so the tables
/// hold big integers.
#[derive(Debug, Clone)]
pub struct HypercubeLayers {
    base: u8,
    dimension: usize,
    max_layer: u32,
    counts: Vec<Vec<BigUint>>,
    layer_sizes: Vec<BigUint>,
    part_size: BigUint,
}

impl HypercubeLayers {
    pub fn new(base: u8, dimension: usize, max_layer: u32) -> Self {
        let max_sum = max_layer as usize;
        let mut counts = vec![vec![BigUint::zero(); max_sum + 1]; dimension + 1];
        counts[0][0] = BigUint::one();
        for m in 1..=dimension {
            for s in 0..=max_sum {
                let mut total = BigUint::zero();
                for c in 0..(base as usize).min(s + 1) {
                    total += &counts[m - 1][s - c];
                }
                counts[m][s] = total;
            }
        }

        let layer_sizes: Vec<BigUint> =
            (0..=max_sum).map(|s| counts[dimension][s].clone()).collect();
        let part_size = layer_sizes.iter().sum();

        HypercubeLayers {
            base,
            dimension,
            max_layer,
            counts,
            layer_sizes,
            part_size,
        }
    }

    /// Number of vertices in layers `0..=max_layer`.
    pub fn part_size(&self) -> &BigUint {
        &self.part_size
    }

    pub fn layer_size(&self, layer: u32) -> &BigUint {
        &self.layer_sizes[layer as usize]
    }

    /// Splits an index below `part_size` into its layer and in-layer offset.
    pub fn find_layer(&self, mut index: BigUint) -> (u32, BigUint) {
        debug_assert!(index < self.part_size);
        for layer in 0..=self.max_layer {
            let size = &self.layer_sizes[layer as usize];
            if &index < size {
                return (layer, index);
            }
            index -= size;
        }
        unreachable!("index below part_size always lands in a layer")
    }

    /// Unranks `offset` within `layer` into vertex coordinates.
    ///
    /// Coordinates come out as chain positions `a_i` with
    /// `sum(base - 1 - a_i) == layer`.
    pub fn vertex(&self, layer: u32, mut offset: BigUint) -> Vec<u8> {
        debug_assert!(offset < self.layer_sizes[layer as usize]);
        let mut vertex = Vec::with_capacity(self.dimension);
        let mut remaining = layer as usize;
        for position in 0..self.dimension {
            let tail = self.dimension - position - 1;
            let mut chosen = 0u8;
            for candidate in 0..=(self.base as usize - 1).min(remaining) {
                let ways = &self.counts[tail][remaining - candidate];
                if &offset < ways {
                    chosen = candidate as u8;
                    break;
                }
                offset -= ways;
            }
            remaining -= chosen as usize;
            vertex.push(self.base - 1 - chosen);
        }
        debug_assert_eq!(remaining, 0);
        vertex
    }
}

/// Number of vertices within distance `max_layer` of the top vertex.
pub fn hypercube_part_size(base: u8, dimension: usize, max_layer: u32) -> BigUint {
    HypercubeLayers::new(base, dimension, max_layer)
        .part_size()
        .clone()
}

/// Layer and in-layer offset of `index`, which must be below the part size
/// of the full hypercube.
pub fn hypercube_find_layer(base: u8, dimension: usize, index: BigUint) -> (u32, BigUint) {
    let max_layer = dimension as u32 * (base as u32 - 1);
    HypercubeLayers::new(base, dimension, max_layer).find_layer(index)
}

/// The vertex of `layer` ranked `offset`, as chain positions.
pub fn map_to_vertex(base: u8, dimension: usize, layer: u32, offset: BigUint) -> Vec<u8> {
    HypercubeLayers::new(base, dimension, layer).vertex(layer, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn small_layer_sizes() {
        let layers = HypercubeLayers::new(8, 64, 2);
        assert_eq!(layers.layer_size(0).to_u64(), Some(1));
        assert_eq!(layers.layer_size(1).to_u64(), Some(64));
        // Two decrements over 64 coordinates: 64 twos or C(64, 2) pairs.
        assert_eq!(layers.layer_size(2).to_u64(), Some(64 + 64 * 63 / 2));
    }

    #[test]
    fn two_coordinates_count_linearly() {
        // With 2 coordinates of base 8, layer d <= 7 has d + 1 vertices.
        let layers = HypercubeLayers::new(8, 2, 7);
        for d in 0..=7u32 {
            assert_eq!(layers.layer_size(d).to_u64(), Some(d as u64 + 1));
        }
        assert_eq!(layers.part_size().to_u64(), Some((1..=8).sum()));
    }

    #[test]
    fn unranking_is_a_bijection_on_a_small_cube() {
        let base = 3u8;
        let dimension = 3usize;
        let max_layer = 6u32;
        let layers = HypercubeLayers::new(base, dimension, max_layer);
        let part = layers.part_size().to_u64().unwrap();
        // 3^3 vertices in total, every one within distance 6.
        assert_eq!(part, 27);

        let mut seen = HashSet::new();
        for index in 0..part {
            let (layer, offset) = layers.find_layer(BigUint::from(index));
            let vertex = layers.vertex(layer, offset);
            assert_eq!(vertex.len(), dimension);
            let distance: u32 = vertex.iter().map(|&a| (base - 1 - a) as u32).sum();
            assert_eq!(distance, layer);
            assert!(seen.insert(vertex));
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn vertices_respect_the_layer_invariant() {
        let layers = HypercubeLayers::new(8, 64, 77);
        let probe = [
            BigUint::zero(),
            layers.part_size() / 2u32,
            layers.part_size() - 1u32,
        ];
        for index in probe {
            let (layer, offset) = layers.find_layer(index);
            assert!(layer <= 77);
            let vertex = layers.vertex(layer, offset);
            let distance: u32 = vertex.iter().map(|&a| 7 - a as u32).sum();
            assert_eq!(distance, layer);
            assert!(vertex.iter().all(|&a| a < 8));
        }
    }

    #[test]
    fn free_functions_agree_with_the_table() {
        let layers = HypercubeLayers::new(8, 16, 10);
        assert_eq!(hypercube_part_size(8, 16, 10), *layers.part_size());

        let index = BigUint::from(12_345u32);
        let (layer, offset) = hypercube_find_layer(8, 16, index.clone());
        let (layer2, offset2) = {
            let full = HypercubeLayers::new(8, 16, 16 * 7);
            full.find_layer(index)
        };
        assert_eq!((layer, offset.clone()), (layer2, offset2));
        assert_eq!(
            map_to_vertex(8, 16, layer, offset.clone()),
            HypercubeLayers::new(8, 16, layer).vertex(layer, offset)
        );
    }
}
