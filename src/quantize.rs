use rayon::prelude::*;

use crate::block::BlockVectors;
use crate::error::{Result, SomifyError};
use crate::som::Codebook;

/// 各ベクトルに最も近いコードワードの番号を返す (入力と同じ順序)。
/// ベクトル同士は独立なので並列に探索する。
pub fn quantize(vectors: &BlockVectors, codebook: &Codebook) -> Result<Vec<usize>> {
    if vectors.dimension() != codebook.dimension() {
        return Err(SomifyError::ShapeMismatch(format!(
            "vectors have dimension {}, codewords {}",
            vectors.dimension(),
            codebook.dimension()
        )));
    }
    Ok((0..vectors.len())
        .into_par_iter()
        .map(|i| codebook.locate(vectors.vector(i)).index)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::decompose;
    use crate::bmu;
    use crate::raster::Raster;
    use crate::som::{GridSize, Initialization, SomTrainer, TrainingParams};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn matches_sequential_search() {
        let data: Vec<u8> = (0..16 * 16).map(|v| (v * 13 % 256) as u8).collect();
        let img = Raster::new(16, 16, 1, data).unwrap();
        let vectors = decompose(&img, 2, 2).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let codebook = SomTrainer::new(
            GridSize::for_bits(3),
            vectors.dimension(),
            TrainingParams { epochs: 2, alpha: 0.3 },
            &Initialization::full_range(),
            &mut rng,
        )
        .unwrap()
        .train(&vectors)
        .unwrap();

        let indices = quantize(&vectors, &codebook).unwrap();
        assert_eq!(indices.len(), vectors.len());
        for (i, &idx) in indices.iter().enumerate() {
            assert_eq!(idx, bmu::locate(vectors.vector(i), codebook.weights()).index);
            assert!(idx < codebook.len());
        }
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let img = Raster::filled(4, 4, 1, 0).unwrap();
        let vectors = decompose(&img, 2, 2).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let codebook = SomTrainer::new(
            GridSize::for_bits(1),
            3,
            TrainingParams { epochs: 1, alpha: 0.5 },
            &Initialization::full_range(),
            &mut rng,
        )
        .unwrap()
        .train(&decompose(&Raster::filled(3, 1, 1, 0).unwrap(), 1, 3).unwrap())
        .unwrap();
        assert!(quantize(&vectors, &codebook).is_err());
    }
}
