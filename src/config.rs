use crate::error::{Result, SomifyError};
use crate::raster::Shape;

// --- 定数 ---
pub const DEFAULT_EPOCHS: usize = 10; // デフォルトのエポック数
pub const DEFAULT_ALPHA: f64 = 0.3; // デフォルトの初期学習率
pub const MIN_BITS: u32 = 1;
pub const MAX_BITS: u32 = 24; // コードブックサイズ 2^24 まで

/// 圧縮の設定値。範囲チェックは [`CompressionConfig::validate`] で行う。
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    pub block_width: usize,
    pub block_height: usize,
    pub bits_per_codevector: u32,
    pub epochs: usize,
    pub alpha: f64,
    pub grayscale: bool,
}

impl CompressionConfig {
    pub fn new(block_width: usize, block_height: usize, bits_per_codevector: u32) -> Self {
        CompressionConfig {
            block_width,
            block_height,
            bits_per_codevector,
            epochs: DEFAULT_EPOCHS,
            alpha: DEFAULT_ALPHA,
            grayscale: false,
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// パラメータ範囲の検証 (画像に依存しない部分)
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BITS..=MAX_BITS).contains(&self.bits_per_codevector) {
            return Err(SomifyError::config(
                "bits_per_codevector",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_BITS, MAX_BITS, self.bits_per_codevector
                ),
            ));
        }
        if self.block_width == 0 {
            return Err(SomifyError::config("block_width", "must be positive"));
        }
        if self.block_height == 0 {
            return Err(SomifyError::config("block_height", "must be positive"));
        }
        if self.epochs == 0 {
            return Err(SomifyError::config("epochs", "must be positive"));
        }
        // NaN もここで弾かれる
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SomifyError::config(
                "alpha",
                format!("must be in (0, 1], got {}", self.alpha),
            ));
        }
        Ok(())
    }

    /// ブロックが画像をちょうど敷き詰めるか
    pub fn check_tiling(&self, shape: Shape) -> Result<()> {
        check_tiling(shape, self.block_width, self.block_height)
    }
}

pub(crate) fn check_tiling(shape: Shape, block_width: usize, block_height: usize) -> Result<()> {
    if block_width == 0 || block_height == 0 {
        return Err(SomifyError::config(
            "block size",
            format!("{}*{} has a zero dimension", block_width, block_height),
        ));
    }
    if block_width > shape.width || block_height > shape.height {
        return Err(SomifyError::ShapeMismatch(format!(
            "block {}*{} must not exceed image {}*{}",
            block_width, block_height, shape.width, shape.height
        )));
    }
    if shape.width % block_width != 0 || shape.height % block_height != 0 {
        return Err(SomifyError::ShapeMismatch(format!(
            "inconsistent dimensions {}*{} for image {}*{}",
            block_width, block_height, shape.width, shape.height
        )));
    }
    Ok(())
}

/// アスペクト比からブロックの高さを求める: floor(block_width * height / width)
pub fn derive_block_height(block_width: usize, image_width: usize, image_height: usize) -> Result<usize> {
    if image_width == 0 {
        return Err(SomifyError::config("image size", "width is zero"));
    }
    let block_height = block_width * image_height / image_width;
    if block_height == 0 {
        return Err(SomifyError::config(
            "block_width",
            format!(
                "{} yields a zero block height for a {}x{} image",
                block_width, image_width, image_height
            ),
        ));
    }
    Ok(block_height)
}

/// 幅と高さの両方を割り切るブロック幅の候補 (画像全幅を含む)
pub fn block_width_candidates(image_width: usize, image_height: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = (1..image_width)
        .filter(|&w| image_width % w == 0 && image_height % w == 0)
        .collect();
    widths.push(image_width);
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(height: usize, width: usize) -> Shape {
        Shape { height, width, channels: 3 }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(CompressionConfig::new(2, 2, 8).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let base = CompressionConfig::new(2, 2, 8);
        let cases = [
            (CompressionConfig { bits_per_codevector: 0, ..base.clone() }, "bits_per_codevector"),
            (CompressionConfig { bits_per_codevector: 25, ..base.clone() }, "bits_per_codevector"),
            (base.clone().with_epochs(0), "epochs"),
            (base.clone().with_alpha(0.0), "alpha"),
            (base.clone().with_alpha(1.5), "alpha"),
            (base.clone().with_alpha(f64::NAN), "alpha"),
            (CompressionConfig::new(0, 2, 8), "block_width"),
            (CompressionConfig::new(2, 0, 8), "block_height"),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(SomifyError::Configuration { parameter, .. }) => assert_eq!(parameter, expected),
                other => panic!("expected configuration error for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn alpha_of_one_is_allowed() {
        assert!(CompressionConfig::new(2, 2, 1).with_alpha(1.0).validate().is_ok());
    }

    #[test]
    fn tiling_checks() {
        assert!(check_tiling(shape(4, 4), 2, 2).is_ok());
        assert!(check_tiling(shape(4, 4), 4, 4).is_ok());
        assert!(matches!(check_tiling(shape(4, 4), 3, 2), Err(SomifyError::ShapeMismatch(_))));
        assert!(matches!(check_tiling(shape(4, 4), 8, 2), Err(SomifyError::ShapeMismatch(_))));
        assert!(matches!(check_tiling(shape(4, 4), 0, 2), Err(SomifyError::Configuration { .. })));
    }

    #[test]
    fn block_height_follows_aspect_ratio() {
        assert_eq!(derive_block_height(4, 640, 480).unwrap(), 3);
        assert_eq!(derive_block_height(8, 100, 100).unwrap(), 8);
        assert!(derive_block_height(1, 640, 480).is_err());
    }

    #[test]
    fn candidates_divide_both_sides() {
        assert_eq!(block_width_candidates(12, 8), vec![1, 2, 4, 12]);
    }
}
