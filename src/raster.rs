use crate::error::{Result, SomifyError};

/// 画像の形状 (高さ × 幅 × チャンネル)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape {
    pub fn sample_count(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// デコード済みの画素配列。行優先 (行, 列, チャンネル) で格納する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    shape: Shape,
    data: Vec<u8>,
}

impl Raster {
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(SomifyError::config(
                "image size",
                format!("{}x{} has a zero dimension", width, height),
            ));
        }
        if channels != 1 && channels != 3 {
            return Err(SomifyError::config(
                "channels",
                format!("expected 1 or 3, got {}", channels),
            ));
        }
        let shape = Shape { height, width, channels };
        if data.len() != shape.sample_count() {
            return Err(SomifyError::ShapeMismatch(format!(
                "{} samples for a {}x{}x{} image",
                data.len(),
                height,
                width,
                channels
            )));
        }
        Ok(Raster { shape, data })
    }

    /// 全サンプルが `value` の画像
    pub fn filled(height: usize, width: usize, channels: usize, value: u8) -> Result<Self> {
        Raster::new(height, width, channels, vec![value; height * width * channels])
    }

    pub(crate) fn zeros(shape: Shape) -> Self {
        Raster {
            shape,
            data: vec![0; shape.sample_count()],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.shape.width + col) * self.shape.channels + channel
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize, channel: usize) -> u8 {
        self.data[self.offset(row, col, channel)]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, channel: usize, value: u8) {
        let i = self.offset(row, col, channel);
        self.data[i] = value;
    }

    /// 輝度 (BT.601) に変換した 1 チャンネル画像。既に 1 チャンネルならそのまま複製。
    pub fn to_luma(&self) -> Raster {
        if self.shape.channels == 1 {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(3)
            .map(|px| {
                let y = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Raster {
            shape: Shape {
                channels: 1,
                ..self.shape
            },
            data,
        }
    }

    /// 1 チャンネル画像を `channels` チャンネルに複製展開する
    pub fn expand_channels(&self, channels: usize) -> Result<Raster> {
        if channels == self.shape.channels {
            return Ok(self.clone());
        }
        if self.shape.channels != 1 || channels != 3 {
            return Err(SomifyError::ShapeMismatch(format!(
                "cannot expand {} channel(s) to {}",
                self.shape.channels, channels
            )));
        }
        let data = self.data.iter().flat_map(|&v| [v, v, v]).collect();
        Ok(Raster {
            shape: Shape {
                channels,
                ..self.shape
            },
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_sample_count() {
        let err = Raster::new(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(matches!(err, SomifyError::ShapeMismatch(_)));
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let err = Raster::new(2, 2, 4, vec![0; 16]).unwrap_err();
        assert!(matches!(err, SomifyError::Configuration { parameter: "channels", .. }));
    }

    #[test]
    fn indexing_is_row_major() {
        let data: Vec<u8> = (0..12).collect();
        let img = Raster::new(2, 2, 3, data).unwrap();
        assert_eq!(img.get(0, 0, 0), 0);
        assert_eq!(img.get(0, 1, 2), 5);
        assert_eq!(img.get(1, 0, 1), 7);
    }

    #[test]
    fn luma_of_gray_pixels_is_identity() {
        let img = Raster::new(1, 2, 3, vec![10, 10, 10, 200, 200, 200]).unwrap();
        let luma = img.to_luma();
        assert_eq!(luma.channels(), 1);
        assert_eq!(luma.as_slice(), &[10, 200]);
    }

    #[test]
    fn luma_weights_channels() {
        let img = Raster::new(1, 1, 3, vec![255, 0, 0]).unwrap();
        // 0.299 * 255 = 76.245
        assert_eq!(img.to_luma().as_slice(), &[76]);
    }

    #[test]
    fn expand_replicates_single_channel() {
        let img = Raster::new(1, 2, 1, vec![7, 9]).unwrap();
        let rgb = img.expand_channels(3).unwrap();
        assert_eq!(rgb.as_slice(), &[7, 7, 7, 9, 9, 9]);
        assert!(rgb.expand_channels(1).is_err());
    }
}
