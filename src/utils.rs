use image::{DynamicImage, GrayImage, RgbImage};
use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;

use crate::error::{Result, SomifyError};
use crate::raster::Raster;
use crate::som::EpochReport;

// 画像ファイルを読み込んで RGB の Raster にする (アルファは捨てる)
pub fn load_raster<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let img = image::open(path)?;
    raster_from_image(&img)
}

pub fn raster_from_image(img: &DynamicImage) -> Result<Raster> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Raster::new(height as usize, width as usize, 3, rgb.into_raw())
}

// Raster を画像ファイルに保存する (形式は拡張子から決まる)
pub fn save_raster<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<()> {
    let width = raster.width() as u32;
    let height = raster.height() as u32;
    let data = raster.as_slice().to_vec();
    let img = match raster.channels() {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
    };
    let img = img.ok_or_else(|| {
        SomifyError::ShapeMismatch(format!("buffer does not fit a {}x{} image", width, height))
    })?;
    img.save(path)?;
    Ok(())
}

// --- エポックごとの平均二乗距離をプロットする ---
pub fn plot_training_curve(
    filename: &str,
    reports: &[EpochReport],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?; // 背景を白に

    let (min_y, max_y) = find_bounds(reports);
    let x_max = reports.len().max(1) as f64;
    let margin = (max_y - min_y) * 0.05 + 1.0; // 少しマージンを追加

    let mut chart = ChartBuilder::on(&root)
        .caption("SOM training - mean squared BMU distance", ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, (min_y - margin).max(0.0)..(max_y + margin))?;

    chart
        .configure_mesh()
        .x_desc("epoch")
        .y_desc("mean squared distance")
        .draw()?;

    let points: Vec<(f64, f64)> = reports
        .iter()
        .map(|r| ((r.epoch + 1) as f64, r.mean_squared_distance))
        .collect();

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new(*p, 3, ShapeStyle::from(&RED).filled())),
    )?;

    root.present()?; // 描画を確定
    Ok(())
}

// --- 描画範囲を計算するヘルパー関数 ---
fn find_bounds(reports: &[EpochReport]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for r in reports {
        min_y = min_y.min(r.mean_squared_distance);
        max_y = max_y.max(r.mean_squared_distance);
    }

    // データがない場合のデフォルト値
    if min_y == f64::INFINITY { min_y = 0.0; }
    if max_y == f64::NEG_INFINITY { max_y = 1.0; }

    (min_y, max_y)
}
