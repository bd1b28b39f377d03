use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::DMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Row-major dense matrix as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl DenseMatrixRecord {
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Self {
        let (rows, cols) = matrix.shape();
        let data = (0..rows)
            .flat_map(|i| (0..cols).map(move |j| matrix[(i, j)]))
            .collect();
        Self { rows, cols, data }
    }

    pub fn to_matrix(&self) -> EvalResult<DMatrix<f64>> {
        if self.data.len() != self.rows * self.cols {
            return Err(EvalError::ShapeMismatch(format!(
                "matrix record declares {}x{} but holds {} values",
                self.rows,
                self.cols,
                self.data.len()
            )));
        }
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &self.data))
    }
}

pub fn read_json<T>(path: &Path) -> EvalResult<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path).map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| EvalError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T>(path: &Path, value: &T) -> EvalResult<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| EvalError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer(BufWriter::new(file), value).map_err(|source| EvalError::Json {
        path: path.to_path_buf(),
        source,
    })
}
