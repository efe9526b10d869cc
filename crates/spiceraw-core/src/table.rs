//! Row-major sample table and its split into vectors

use crate::types::{NumberKind, Vector, VectorData};
use num_complex::Complex64;

/// Decoded data body: `num_points` rows of one scalar per real variable, or
/// a (real, imaginary) pair per complex variable.
#[derive(Debug)]
pub(crate) struct SampleTable {
    values: Vec<f64>,
    number: NumberKind,
    num_variables: usize,
    num_points: usize,
}

impl SampleTable {
    /// Number of scalars a body with these counts holds
    pub(crate) fn scalar_count(
        number: NumberKind,
        num_variables: usize,
        num_points: usize,
    ) -> usize {
        let per_value = match number {
            NumberKind::Real => 1,
            NumberKind::Complex => 2,
        };
        num_variables
            .saturating_mul(num_points)
            .saturating_mul(per_value)
    }

    pub(crate) fn new(
        values: Vec<f64>,
        number: NumberKind,
        num_variables: usize,
        num_points: usize,
    ) -> Self {
        debug_assert_eq!(
            values.len(),
            Self::scalar_count(number, num_variables, num_points)
        );
        Self {
            values,
            number,
            num_variables,
            num_points,
        }
    }

    #[inline]
    fn num_columns(&self) -> usize {
        match self.number {
            NumberKind::Real => self.num_variables,
            NumberKind::Complex => 2 * self.num_variables,
        }
    }

    fn column(&self, index: usize) -> Vec<f64> {
        let columns = self.num_columns();
        if index >= columns {
            return Vec::new();
        }
        self.values
            .iter()
            .skip(index)
            .step_by(columns)
            .copied()
            .collect()
    }

    fn complex_column(&self, variable: usize) -> Vec<Complex64> {
        let columns = self.num_columns();
        if 2 * variable + 1 >= columns {
            return Vec::new();
        }
        self.values
            .chunks_exact(columns)
            .map(|row| Complex64::new(row[2 * variable], row[2 * variable + 1]))
            .collect()
    }

    /// Samples of the scale. For complex bodies only the real half of the
    /// first pair is kept.
    pub(crate) fn scale_column(&self) -> Vec<f64> {
        let column = self.column(0);
        debug_assert!(column.is_empty() || column.len() == self.num_points);
        column
    }

    fn variable_data(&self, variable: usize) -> VectorData {
        match self.number {
            NumberKind::Real => VectorData::Real(self.column(variable)),
            NumberKind::Complex => VectorData::Complex(self.complex_column(variable)),
        }
    }

    /// Attach columns to the declared vectors by position.
    ///
    /// The first declared vector becomes the scale. When fewer vectors were
    /// declared than the body has columns, the surplus columns are dropped.
    pub(crate) fn assemble(&self, declared: Vec<Vector>) -> (Option<Vector>, Vec<Vector>) {
        let mut vectors = declared.into_iter().enumerate();

        let scale = vectors
            .next()
            .map(|(_, v)| v.with_data(VectorData::Real(self.scale_column())));

        let data = vectors
            .take_while(|(n, _)| *n < self.num_variables)
            .map(|(n, v)| v.with_data(self.variable_data(n)))
            .collect();

        (scale, data)
    }
}
