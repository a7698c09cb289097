use crate::HgcError;
use num_traits::Float;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MatrixValidator<'a, T> {
    data: &'a [Vec<T>],
}

impl<'a, T> MatrixValidator<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>]) -> Self {
        Self { data }
    }

    pub(crate) fn validate_square(&self) -> Result<(), HgcError> {
        let n = self.data.len();
        for (i, row) in self.data.iter().enumerate() {
            if row.len() != n {
                return Err(HgcError::ShapeError(format!(
                    "matrix has {n} rows, but row {i} has {} entries",
                    row.len()
                )));
            }
        }
        Ok(())
    }
}

impl<'a, T: Float> MatrixValidator<'a, T> {
    /// Checks the matrix is square and holds only finite, non-negative distances.
    pub(crate) fn validate_distances(&self) -> Result<(), HgcError> {
        self.validate_square()?;
        for (i, row) in self.data.iter().enumerate() {
            for (j, &element) in row.iter().enumerate() {
                if !element.is_finite() || element < T::zero() {
                    return Err(HgcError::InvalidDistance(format!(
                        "entry ({i}, {j}) is not a finite non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn is_symmetrical_matrix(&self) -> bool {
        if self.validate_square().is_err() {
            return false;
        }
        let n = self.data.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if (self.data[i][j] - self.data[j][i]).abs() > T::epsilon() {
                    return false;
                }
            }
        }
        true
    }
}
