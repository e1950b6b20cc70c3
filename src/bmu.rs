use nalgebra::{DMatrix, DVectorView};

use crate::som::{GridCoord, GridSize};

/// 勝者ニューロン (Best Matching Unit)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub index: usize,
    pub squared_distance: f64,
}

impl BestMatch {
    pub fn coord(&self, grid: GridSize) -> GridCoord {
        grid.coord(self.index)
    }
}

#[inline]
pub fn squared_distance(a: DVectorView<'_, f64>, b: DVectorView<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// 総当たりで最近傍を探す。コードブックは毎反復で変わるので索引は作らない。
// 同距離の場合は添字の小さい方が勝つ (厳密な < 比較)。
pub fn locate(query: DVectorView<'_, f64>, codewords: &DMatrix<f64>) -> BestMatch {
    debug_assert_eq!(query.len(), codewords.nrows(), "query and codeword dimensions must match");

    let mut best = BestMatch {
        index: 0,
        squared_distance: f64::INFINITY,
    };
    for (idx, codeword) in codewords.column_iter().enumerate() {
        let dist_sq = squared_distance(query, codeword);
        if dist_sq < best.squared_distance {
            best = BestMatch {
                index: idx,
                squared_distance: dist_sq,
            };
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn codebook(columns: &[&[f64]]) -> DMatrix<f64> {
        let dim = columns[0].len();
        let data: Vec<f64> = columns.iter().flat_map(|c| c.iter().copied()).collect();
        DMatrix::from_vec(dim, columns.len(), data)
    }

    #[test]
    fn finds_nearest_codeword() {
        let cb = codebook(&[&[0.0, 0.0], &[10.0, 10.0], &[4.0, 5.0]]);
        let q = DVector::from_vec(vec![5.0, 5.0]);
        let best = locate(q.column(0), &cb);
        assert_eq!(best.index, 2);
        assert_eq!(best.squared_distance, 1.0);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let cb = codebook(&[&[0.0], &[2.0], &[2.0], &[0.0]]);
        let q = DVector::from_vec(vec![1.0]);
        assert_eq!(locate(q.column(0), &cb).index, 0);
        let q = DVector::from_vec(vec![2.0]);
        assert_eq!(locate(q.column(0), &cb).index, 1);
    }

    #[test]
    fn coordinate_is_row_major() {
        let grid = GridSize { rows: 2, columns: 4 };
        let best = BestMatch { index: 6, squared_distance: 0.0 };
        assert_eq!(best.coord(grid), GridCoord { row: 1, col: 2 });
    }
}
