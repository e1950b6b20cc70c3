use thiserror::Error;

/// 圧縮パイプライン全体のエラー
#[derive(Debug, Error)]
pub enum SomifyError {
    /// パラメータの範囲外 (計算開始前に検出)
    #[error("invalid {parameter}: {message}")]
    Configuration {
        parameter: &'static str,
        message: String,
    },

    /// ブロックが画像を割り切れない、形状の不一致など
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SomifyError {
    pub(crate) fn config(parameter: &'static str, message: impl Into<String>) -> Self {
        SomifyError::Configuration {
            parameter,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SomifyError>;
