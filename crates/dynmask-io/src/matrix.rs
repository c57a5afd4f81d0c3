use std::{fs, path::Path};

use crate::error::IoError;

/// Read every whitespace separated number of a text file, in reading order.
///
/// Blank lines are ignored, so both one-value-per-line and row-per-line files
/// are accepted.
pub fn read_values(path: impl AsRef<Path>) -> Result<Vec<f64>, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }

    fs::read_to_string(path)?
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| IoError::ParseError(path.to_path_buf(), format!("{token}: {e}")))
        })
        .collect()
}

/// Read a 4x4 row-major matrix from a text file.
///
/// # Errors
///
/// Fails with [`IoError::ParseError`] unless the file holds exactly 16 numbers.
pub fn read_matrix4(path: impl AsRef<Path>) -> Result<[[f64; 4]; 4], IoError> {
    let path = path.as_ref();
    let values = read_values(path)?;
    if values.len() != 16 {
        return Err(IoError::ParseError(
            path.to_path_buf(),
            format!("expected 16 values for a 4x4 matrix, got {}", values.len()),
        ));
    }

    let mut matrix = [[0.0; 4]; 4];
    for (i, v) in values.into_iter().enumerate() {
        matrix[i / 4][i % 4] = v;
    }
    Ok(matrix)
}

/// Write a 4x4 matrix as four whitespace separated rows.
pub fn write_matrix4(path: impl AsRef<Path>, matrix: &[[f64; 4]; 4]) -> Result<(), IoError> {
    let text = matrix
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(path, text + "\n")?;
    Ok(())
}
