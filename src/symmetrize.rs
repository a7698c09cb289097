use crate::validation::MatrixValidator;
use crate::HgcError;

/// Makes a square matrix symmetric in place. For every pair `i < j` the smaller of
/// `matrix[i][j]` and `matrix[j][i]` is written to both cells; equal pairs and the diagonal
/// are left alone. Because the minimum is commutative the result does not depend on the
/// iteration order, and applying this twice gives the same matrix as applying it once.
///
/// # Parameters
/// * `matrix` - the matrix to symmetrize.
///
/// # Returns
/// * `ShapeError` if the matrix is ragged or not square.
pub fn symmetrize<T: PartialOrd + Copy>(matrix: &mut [Vec<T>]) -> Result<(), HgcError> {
    MatrixValidator::new(matrix).validate_square()?;
    let n = matrix.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let upper = matrix[i][j];
            let lower = matrix[j][i];
            if upper > lower {
                matrix[i][j] = lower;
            } else if lower > upper {
                matrix[j][i] = upper;
            }
        }
    }
    Ok(())
}

/// Flattens the strict upper triangle of a square matrix, row by row, into the condensed
/// pairwise form consumed by linkage engines. Entry `(i, j)` with `i < j` lands at
/// [`condensed_index`]`(n, i, j)`.
pub fn condense<T: Copy>(matrix: &[Vec<T>]) -> Result<Vec<T>, HgcError> {
    MatrixValidator::new(matrix).validate_square()?;
    let n = matrix.len();
    let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for (i, row) in matrix.iter().enumerate() {
        condensed.extend_from_slice(&row[i + 1..]);
    }
    Ok(condensed)
}

/// Position of the pair `(i, j)` in a condensed matrix over `n` entities. The pair is
/// unordered; `i` and `j` must differ.
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}
