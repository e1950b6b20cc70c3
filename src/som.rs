use std::ops::ControlFlow;

use nalgebra::{DMatrix, DVectorView, Point2};
use rand::Rng;
use tracing::{debug, info};

use crate::block::BlockVectors;
use crate::bmu::{self, BestMatch};
use crate::error::{Result, SomifyError};

/// ニューロン格子の大きさ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub rows: usize,
    pub columns: usize,
}

/// 格子上の座標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

impl GridCoord {
    pub fn point(&self) -> Point2<f64> {
        Point2::new(self.row as f64, self.col as f64)
    }
}

impl GridSize {
    /// 2^bits 個を目標に rows = floor(2^(bits/2)), columns = floor(2^bits / rows)。
    /// bits が奇数だと目標を下回ることがある (例: 5 -> 5x6)。
    pub fn for_bits(bits: u32) -> Self {
        let target = 1usize << bits;
        let rows = if bits % 2 == 0 {
            1usize << (bits / 2)
        } else {
            2f64.powf(bits as f64 / 2.0).floor() as usize
        };
        GridSize {
            rows,
            columns: target / rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows * self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn coord(&self, index: usize) -> GridCoord {
        GridCoord {
            row: index / self.columns,
            col: index % self.columns,
        }
    }

    /// 近傍半径の初期値 σ0 = max(rows, columns) / 2
    pub fn initial_radius(&self) -> f64 {
        self.rows.max(self.columns) as f64 / 2.0
    }
}

/// コードブックの初期化方法
#[derive(Debug, Clone, PartialEq)]
pub enum Initialization {
    /// 全成分を [low, high) から一様に
    Uniform { low: f64, high: f64 },
    /// 成分ごとに [low[i], high[i]] から一様に
    PerFeature { low: Vec<f64>, high: Vec<f64> },
}

impl Initialization {
    /// 0..255 の一様乱数
    pub fn full_range() -> Self {
        Initialization::Uniform { low: 0.0, high: 255.0 }
    }

    /// 学習データの成分ごとの最小値・最大値の範囲
    pub fn data_range(vectors: &BlockVectors) -> Self {
        let data = vectors.as_matrix();
        let low = data.row_iter().map(|row| row.min()).collect();
        let high = data.row_iter().map(|row| row.max()).collect();
        Initialization::PerFeature { low, high }
    }

    fn bounds(&self, feature: usize) -> (f64, f64) {
        match self {
            Initialization::Uniform { low, high } => (*low, *high),
            Initialization::PerFeature { low, high } => (low[feature], high[feature]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    /// 初期学習率 α0
    pub alpha: f64,
}

/// エポック終了ごとの学習状況
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// このエポック終了時点の累積反復数
    pub iterations: usize,
    /// エポック最後の反復で使った α_t
    pub learning_rate: f64,
    /// エポック最後の反復で使った σ_t
    pub radius: f64,
    /// 勝者までの二乗距離の平均
    pub mean_squared_distance: f64,
}

/// 学習済みのコードブック (読み取り専用)
#[derive(Debug, Clone, PartialEq)]
pub struct Codebook {
    grid: GridSize,
    weights: DMatrix<f64>,
}

impl Codebook {
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// D x (rows*columns)。列 j がニューロン j。
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.ncols() == 0
    }

    pub fn dimension(&self) -> usize {
        self.weights.nrows()
    }

    pub fn codeword(&self, index: usize) -> DVectorView<'_, f64> {
        self.weights.column(index)
    }

    pub fn locate(&self, query: DVectorView<'_, f64>) -> BestMatch {
        bmu::locate(query, &self.weights)
    }
}

/// 近傍関数 h = exp(-0.5 d² / σ²)。
/// σ² が 0 (アンダーフロー含む) のときは勝者だけを更新するディラック型にする。
#[inline]
pub fn neighborhood(dist_sq: f64, sigma: f64) -> f64 {
    let sigma_sq = sigma * sigma;
    if !(sigma_sq > 0.0 && sigma_sq.is_finite()) {
        return if dist_sq == 0.0 { 1.0 } else { 0.0 };
    }
    (-0.5 * dist_sq / sigma_sq).exp()
}

/// 競合学習でコードブックを作る。`train` で消費されるので一度きり。
#[derive(Debug, Clone)]
pub struct SomTrainer {
    grid: GridSize,
    params: TrainingParams,
    sigma0: f64,
    weights: DMatrix<f64>,
    positions: Vec<Point2<f64>>,
}

impl SomTrainer {
    pub fn new<R: Rng>(
        grid: GridSize,
        dimension: usize,
        params: TrainingParams,
        init: &Initialization,
        rng: &mut R,
    ) -> Result<Self> {
        if grid.is_empty() {
            return Err(SomifyError::config("grid", format!("{}x{} is empty", grid.rows, grid.columns)));
        }
        if dimension == 0 {
            return Err(SomifyError::config("dimension", "must be positive"));
        }
        if let Initialization::PerFeature { low, high } = init {
            if low.len() != dimension || high.len() != dimension {
                return Err(SomifyError::ShapeMismatch(format!(
                    "initialization bounds cover {} features, codewords have {}",
                    low.len().min(high.len()),
                    dimension
                )));
            }
        }

        // 列優先: ニューロンごとに dimension 個ずつ乱数を引く
        let mut data = Vec::with_capacity(dimension * grid.len());
        for _ in 0..grid.len() {
            for feature in 0..dimension {
                let (low, high) = init.bounds(feature);
                let u: f64 = rng.gen_range(0.0..1.0);
                data.push(low + u * (high - low));
            }
        }

        let positions = (0..grid.len()).map(|i| grid.coord(i).point()).collect();

        Ok(SomTrainer {
            grid,
            params,
            sigma0: grid.initial_radius(),
            weights: DMatrix::from_vec(dimension, grid.len(), data),
            positions,
        })
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// 学習途中のコードブック
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    pub fn train(self, vectors: &BlockVectors) -> Result<Codebook> {
        self.train_with(vectors, |_| ControlFlow::Continue(()))
    }

    /// 各エポック後に `observer` を呼ぶ。`Break` を返すとそのエポックで打ち切る。
    pub fn train_with<F>(mut self, vectors: &BlockVectors, mut observer: F) -> Result<Codebook>
    where
        F: FnMut(&EpochReport) -> ControlFlow<()>,
    {
        if vectors.dimension() != self.weights.nrows() {
            return Err(SomifyError::ShapeMismatch(format!(
                "vectors have dimension {}, codewords {}",
                vectors.dimension(),
                self.weights.nrows()
            )));
        }
        if vectors.is_empty() {
            return Err(SomifyError::ShapeMismatch("no vectors to train on".to_string()));
        }

        let n = vectors.len();
        let total = self.params.epochs * n;
        info!(
            rows = self.grid.rows,
            columns = self.grid.columns,
            vectors = n,
            epochs = self.params.epochs,
            "training SOM"
        );

        let mut iter_no = 0;
        for epoch in 0..self.params.epochs {
            let mut dist_sum = 0.0;
            let mut last = (0.0, 0.0);
            // 分解時の順序 (行優先) で 1 本ずつ更新する
            for i in 0..n {
                let (best, alpha_t, sigma_t) = self.step(vectors.vector(i), iter_no, total);
                dist_sum += best.squared_distance;
                last = (alpha_t, sigma_t);
                iter_no += 1;
            }

            let report = EpochReport {
                epoch,
                iterations: iter_no,
                learning_rate: last.0,
                radius: last.1,
                mean_squared_distance: dist_sum / n as f64,
            };
            debug!(
                epoch,
                learning_rate = report.learning_rate,
                radius = report.radius,
                mean_squared_distance = report.mean_squared_distance,
                "epoch finished"
            );
            if observer(&report).is_break() {
                info!(epoch, "training stopped by observer");
                break;
            }
        }

        Ok(Codebook {
            grid: self.grid,
            weights: self.weights,
        })
    }

    // 1 反復: 勝者探索 → 全ニューロン更新
    fn step(&mut self, input: DVectorView<'_, f64>, iter_no: usize, total: usize) -> (BestMatch, f64, f64) {
        let decay = 1.0 - iter_no as f64 / total as f64;
        let alpha_t = self.params.alpha * decay;
        let sigma_t = self.sigma0 * decay;

        let best = bmu::locate(input, &self.weights);
        let bmu_pos = self.positions[best.index];

        for (mut weights, pos) in self.weights.column_iter_mut().zip(self.positions.iter()) {
            let dist_sq = nalgebra::distance_squared(pos, &bmu_pos);
            let rate = alpha_t * neighborhood(dist_sq, sigma_t);
            if rate == 0.0 {
                continue;
            }
            for (w, x) in weights.iter_mut().zip(input.iter()) {
                *w += rate * (x - *w);
            }
        }

        (best, alpha_t, sigma_t)
    }
}
