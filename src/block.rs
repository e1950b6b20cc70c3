use nalgebra::{DMatrix, DVectorView};

use crate::config::check_tiling;
use crate::error::{Result, SomifyError};
use crate::raster::{Raster, Shape};

/// ブロックの左上座標 (画素単位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    pub top: usize,
    pub left: usize,
    pub width: usize,
    pub height: usize,
}

/// ブロック番号 <-> 矩形 の対応。分解と再構成はどちらもこれだけを使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    block_width: usize,
    block_height: usize,
    blocks_per_row: usize,
    blocks_per_column: usize,
}

impl BlockGrid {
    pub fn new(shape: Shape, block_width: usize, block_height: usize) -> Result<Self> {
        check_tiling(shape, block_width, block_height)?;
        Ok(BlockGrid {
            block_width,
            block_height,
            blocks_per_row: shape.width / block_width,
            blocks_per_column: shape.height / block_height,
        })
    }

    /// ブロック総数
    pub fn len(&self) -> usize {
        self.blocks_per_row * self.blocks_per_column
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks_per_row(&self) -> usize {
        self.blocks_per_row
    }

    pub fn blocks_per_column(&self) -> usize {
        self.blocks_per_column
    }

    /// ブロック行・列から通し番号へ (行優先)
    #[inline]
    pub fn index_of(&self, block_row: usize, block_col: usize) -> usize {
        block_row * self.blocks_per_row + block_col
    }

    /// 通し番号から矩形へ
    #[inline]
    pub fn rect(&self, index: usize) -> BlockRect {
        let block_row = index / self.blocks_per_row;
        let block_col = index % self.blocks_per_row;
        BlockRect {
            top: block_row * self.block_height,
            left: block_col * self.block_width,
            width: self.block_width,
            height: self.block_height,
        }
    }

    /// 1 ブロック分のベクトル次元
    pub fn dimension(&self, channels: usize) -> usize {
        self.block_width * self.block_height * channels
    }
}

/// 画像から切り出した特徴ベクトル群。列 i がブロック i。
#[derive(Debug, Clone)]
pub struct BlockVectors {
    grid: BlockGrid,
    channels: usize,
    data: DMatrix<f64>,
}

impl BlockVectors {
    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn dimension(&self) -> usize {
        self.data.nrows()
    }

    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }

    pub fn vector(&self, index: usize) -> DVectorView<'_, f64> {
        self.data.column(index)
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// 画像を重ならないブロックに分割し、行優先順にベクトル化する
pub fn decompose(image: &Raster, block_width: usize, block_height: usize) -> Result<BlockVectors> {
    let grid = BlockGrid::new(image.shape(), block_width, block_height)?;
    let channels = image.channels();
    let dimension = grid.dimension(channels);

    let mut data = Vec::with_capacity(dimension * grid.len());
    for index in 0..grid.len() {
        let rect = grid.rect(index);
        for y in rect.top..rect.top + rect.height {
            for x in rect.left..rect.left + rect.width {
                for c in 0..channels {
                    data.push(image.get(y, x, c) as f64);
                }
            }
        }
    }

    Ok(BlockVectors {
        grid,
        channels,
        // from_vec は列優先なので 1 列 = 1 ブロック
        data: DMatrix::from_vec(dimension, grid.len(), data),
    })
}

/// 各ブロックに選ばれたコードワードを書き戻して画像を組み立てる
pub fn reassemble(
    indices: &[usize],
    codewords: &DMatrix<f64>,
    block_width: usize,
    block_height: usize,
    shape: Shape,
) -> Result<Raster> {
    let grid = BlockGrid::new(shape, block_width, block_height)?;
    if indices.len() != grid.len() {
        return Err(SomifyError::ShapeMismatch(format!(
            "{} indices for {} blocks",
            indices.len(),
            grid.len()
        )));
    }

    let pixels = block_width * block_height;
    let dimension = codewords.nrows();
    if dimension % pixels != 0 {
        return Err(SomifyError::ShapeMismatch(format!(
            "codeword dimension {} is not a multiple of block size {}",
            dimension, pixels
        )));
    }
    let source_channels = dimension / pixels;
    let replicate = source_channels == 1 && shape.channels == 3;
    if source_channels != shape.channels && !replicate {
        return Err(SomifyError::ShapeMismatch(format!(
            "{} channel codewords for a {} channel image",
            source_channels, shape.channels
        )));
    }

    let mut out = Raster::zeros(shape);
    for (index, &code) in indices.iter().enumerate() {
        if code >= codewords.ncols() {
            return Err(SomifyError::ShapeMismatch(format!(
                "codeword index {} out of range ({} codewords)",
                code,
                codewords.ncols()
            )));
        }
        let codeword = codewords.column(code);
        let rect = grid.rect(index);
        for dy in 0..rect.height {
            for dx in 0..rect.width {
                for c in 0..shape.channels {
                    let src_c = if replicate { 0 } else { c };
                    let k = (dy * rect.width + dx) * source_channels + src_c;
                    out.set(rect.top + dy, rect.left + dx, c, to_sample(codeword[k]));
                }
            }
        }
    }
    Ok(out)
}

#[inline]
fn to_sample(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
