//! SOM (自己組織化マップ) によるベクトル量子化で画像を非可逆圧縮する。
//!
//! 画像を固定サイズのブロックに分割し、各ブロックを特徴ベクトルとして
//! 小さなニューロン格子 (コードブック) を競合学習させる。学習後は各ブロックを
//! 最も近いコードワードで置き換えて画像を再構成し、平均二乗誤差を返す。

pub mod block;
pub mod bmu;
pub mod compress;
pub mod config;
pub mod error;
pub mod metric;
pub mod quantize;
pub mod raster;
pub mod som;
pub mod utils;

pub use compress::{compress, Compression};
pub use config::CompressionConfig;
pub use error::{Result, SomifyError};
pub use raster::{Raster, Shape};
pub use som::{Codebook, EpochReport, GridSize, Initialization, SomTrainer, TrainingParams};
