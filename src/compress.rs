use std::ops::ControlFlow;

use rand::Rng;
use tracing::info;

use crate::block::{decompose, reassemble};
use crate::config::CompressionConfig;
use crate::error::Result;
use crate::metric::mse;
use crate::quantize::quantize;
use crate::raster::Raster;
use crate::som::{EpochReport, GridSize, Initialization, SomTrainer, TrainingParams};

/// 圧縮結果
#[derive(Debug, Clone)]
pub struct Compression {
    /// 入力と同じ形状の再構成画像
    pub image: Raster,
    /// 平均二乗誤差
    pub mse: f64,
    pub grid: GridSize,
    pub epochs: Vec<EpochReport>,
}

/// 画像をブロックに分割 → SOM 学習 → 量子化 → 再構成 → 誤差評価
pub fn compress<R: Rng>(image: &Raster, config: &CompressionConfig, rng: &mut R) -> Result<Compression> {
    config.validate()?;
    config.check_tiling(image.shape())?;

    // グレースケール指定なら輝度 1 チャンネルで学習する
    let source = if config.grayscale {
        image.to_luma()
    } else {
        image.clone()
    };

    let vectors = decompose(&source, config.block_width, config.block_height)?;
    let grid = GridSize::for_bits(config.bits_per_codevector);
    info!(
        blocks = vectors.len(),
        dimension = vectors.dimension(),
        codewords = grid.len(),
        "compressing image"
    );

    let trainer = SomTrainer::new(
        grid,
        vectors.dimension(),
        TrainingParams {
            epochs: config.epochs,
            alpha: config.alpha,
        },
        &Initialization::data_range(&vectors),
        rng,
    )?;

    let mut epochs = Vec::with_capacity(config.epochs);
    let codebook = trainer.train_with(&vectors, |report| {
        epochs.push(*report);
        ControlFlow::Continue(())
    })?;

    let indices = quantize(&vectors, &codebook)?;
    let reconstructed = reassemble(
        &indices,
        codebook.weights(),
        config.block_width,
        config.block_height,
        image.shape(),
    )?;

    let reference = source.expand_channels(image.channels())?;
    let error = mse(&reference, &reconstructed)?;
    info!(mse = error, "compression finished");

    Ok(Compression {
        image: reconstructed,
        mse: error,
        grid,
        epochs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SomifyError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn uniform_image_reconstructs_exactly() {
        let img = Raster::filled(4, 4, 1, 100).unwrap();
        let config = CompressionConfig::new(2, 2, 1).with_epochs(1).with_alpha(0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let out = compress(&img, &config, &mut rng).unwrap();
        assert_eq!(out.image, img);
        assert_eq!(out.mse, 0.0);
        assert_eq!(out.grid, GridSize { rows: 1, columns: 2 });
        assert_eq!(out.epochs.len(), 1);
    }

    #[test]
    fn grayscale_output_keeps_input_shape() {
        let data: Vec<u8> = (0..4 * 4 * 3).map(|v| (v * 5 % 256) as u8).collect();
        let img = Raster::new(4, 4, 3, data).unwrap();
        let config = CompressionConfig::new(2, 2, 2).with_grayscale(true);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let out = compress(&img, &config, &mut rng).unwrap();
        assert_eq!(out.image.shape(), img.shape());
        // 各画素は 3 チャンネルとも同じ値
        for px in out.image.as_slice().chunks_exact(3) {
            assert!(px[0] == px[1] && px[1] == px[2]);
        }
    }

    #[test]
    fn rejects_bad_tiling_before_training() {
        let img = Raster::filled(4, 6, 1, 0).unwrap();
        let config = CompressionConfig::new(4, 4, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            compress(&img, &config, &mut rng),
            Err(SomifyError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let img = Raster::filled(4, 4, 1, 0).unwrap();
        let config = CompressionConfig::new(2, 2, 30);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            compress(&img, &config, &mut rng),
            Err(SomifyError::Configuration { parameter: "bits_per_codevector", .. })
        ));
    }
}
