use crate::error::{Result, SomifyError};
use crate::raster::Raster;

/// 平均二乗誤差 (全画素・全チャンネル)
pub fn mse(a: &Raster, b: &Raster) -> Result<f64> {
    if a.shape() != b.shape() {
        return Err(SomifyError::ShapeMismatch(format!(
            "cannot compare {:?} with {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let sum: f64 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / a.as_slice().len() as f64)
}
