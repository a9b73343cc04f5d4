use crate::errors::{
    MemoError,
    Result,
};
use std::collections::{
    HashMap,
    HashSet,
};
use std::fmt::{
    Debug,
    Display,
};
use std::hash::Hash;

/// Anything that can label a column: feature ids for feature tables,
/// token strings for MEMO matrices.
pub trait ColumnKey: Clone + Eq + Hash + Display + Debug + Send + Sync {}

impl<T> ColumnKey for T where T: Clone + Eq + Hash + Display + Debug + Send + Sync {}

/// How the columns of two tables are reconciled when stacking rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnJoin {
    /// Keep every column of either table, zero-filling the gaps.
    Union,
    /// Keep only the columns both tables have.
    Intersection,
}

/// Dense sample x column table of `f64` values.
///
/// Rows are samples, labelled by name. Values are stored row-major so a
/// sample vector is a contiguous slice, which is what distance and
/// clustering routines want.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable<C: ColumnKey> {
    row_labels: Vec<String>,
    col_labels: Vec<C>,
    values: Vec<f64>,
}

impl<C: ColumnKey> Default for LabeledTable<C> {
    fn default() -> Self {
        Self {
            row_labels: Vec::new(),
            col_labels: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<C: ColumnKey> LabeledTable<C> {
    /// Builds a table from row-major values.
    ///
    /// Column labels must be unique. Row labels are not checked, stacking
    /// two matrices with a shared sample name is allowed. Missing (NaN)
    /// cells are stored as 0, so every non-zero cell is a detection.
    pub fn new(row_labels: Vec<String>, col_labels: Vec<C>, mut values: Vec<f64>) -> Result<Self> {
        let expected = row_labels.len() * col_labels.len();
        if values.len() != expected {
            return Err(MemoError::data(format!(
                "expected {} values for a {}x{} table, got {}",
                expected,
                row_labels.len(),
                col_labels.len(),
                values.len()
            )));
        }
        let mut seen = HashSet::with_capacity(col_labels.len());
        for col in col_labels.iter() {
            if !seen.insert(col) {
                return Err(MemoError::data(format!("duplicated column label {}", col)));
            }
        }
        for v in values.iter_mut().filter(|v| v.is_nan()) {
            *v = 0.0;
        }
        Ok(Self {
            row_labels,
            col_labels,
            values,
        })
    }

    pub fn from_rows(
        row_labels: Vec<String>,
        col_labels: Vec<C>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if rows.len() != row_labels.len() {
            return Err(MemoError::data(format!(
                "got {} row labels for {} rows",
                row_labels.len(),
                rows.len()
            )));
        }
        let ncols = col_labels.len();
        let mut values = Vec::with_capacity(rows.len() * ncols);
        for (label, row) in row_labels.iter().zip(rows) {
            if row.len() != ncols {
                return Err(MemoError::data(format!(
                    "row {} has {} values, expected {}",
                    label,
                    row.len(),
                    ncols
                )));
            }
            values.extend(row);
        }
        Self::new(row_labels, col_labels, values)
    }

    pub fn nrows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn ncols(&self) -> usize {
        self.col_labels.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() || self.col_labels.is_empty()
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[C] {
        &self.col_labels
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let ncols = self.ncols();
        &self.values[idx * ncols..(idx + 1) * ncols]
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        (0..self.nrows()).map(|i| (self.row_labels[i].as_str(), self.row(i)))
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols() + col]
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.row_labels.iter().position(|x| x == label)
    }

    pub fn column_index(&self, col: &C) -> Option<usize> {
        self.col_labels.iter().position(|x| x == col)
    }

    /// Value at (sample, column), looked up by label. The first row with a
    /// matching label wins.
    pub fn get(&self, row_label: &str, col: &C) -> Option<f64> {
        let row = self.row_index(row_label)?;
        let col = self.column_index(col)?;
        Some(self.value(row, col))
    }

    /// Row-major copy of the values, one `Vec` per sample.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.nrows()).map(|i| self.row(i).to_vec()).collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of non-zero cells per column, counting only `rows`.
    pub fn nonzero_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.ncols()];
        for &r in rows {
            for (count, v) in counts.iter_mut().zip(self.row(r)) {
                if *v != 0.0 {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Sub-table made of the given rows and columns, in the given order.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for &r in rows {
            let row = self.row(r);
            values.extend(cols.iter().map(|&c| row[c]));
        }
        Self {
            row_labels: rows.iter().map(|&r| self.row_labels[r].clone()).collect(),
            col_labels: cols.iter().map(|&c| self.col_labels[c].clone()).collect(),
            values,
        }
    }

    /// Same table with every sample row scaled to sum to one. All-zero
    /// rows are left untouched.
    pub fn row_normalized(&self) -> Self {
        let mut out = self.clone();
        let ncols = self.ncols();
        if ncols == 0 {
            return out;
        }
        for row in out.values.chunks_mut(ncols) {
            let total: f64 = row.iter().sum();
            if total != 0.0 {
                row.iter_mut().for_each(|v| *v /= total);
            }
        }
        out
    }

    /// Stacks the rows of `other` below the rows of `self`.
    ///
    /// Column order follows `self`, with the columns only `other` has
    /// appended in `other`'s order when doing a union.
    pub fn concat_rows(&self, other: &Self, join: ColumnJoin) -> Self {
        let other_positions: HashMap<&C, usize> = other
            .col_labels
            .iter()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();

        let mut col_labels: Vec<C> = match join {
            ColumnJoin::Union => self.col_labels.clone(),
            ColumnJoin::Intersection => self
                .col_labels
                .iter()
                .filter(|c| other_positions.contains_key(c))
                .cloned()
                .collect(),
        };
        if join == ColumnJoin::Union {
            let own: HashSet<&C> = self.col_labels.iter().collect();
            col_labels.extend(
                other
                    .col_labels
                    .iter()
                    .filter(|c| !own.contains(c))
                    .cloned(),
            );
        }

        let self_positions: HashMap<&C, usize> = self
            .col_labels
            .iter()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        let left_map: Vec<Option<usize>> = col_labels
            .iter()
            .map(|c| self_positions.get(c).copied())
            .collect();
        let right_map: Vec<Option<usize>> = col_labels
            .iter()
            .map(|c| other_positions.get(c).copied())
            .collect();

        let nrows = self.nrows() + other.nrows();
        let mut values = Vec::with_capacity(nrows * col_labels.len());
        for (table, mapping) in [(self, &left_map), (other, &right_map)] {
            for r in 0..table.nrows() {
                let row = table.row(r);
                values.extend(mapping.iter().map(|m| m.map(|c| row[c]).unwrap_or(0.0)));
            }
        }

        let mut row_labels = self.row_labels.clone();
        row_labels.extend(other.row_labels.iter().cloned());
        Self {
            row_labels,
            col_labels,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LabeledTable<String> {
        LabeledTable::from_rows(
            vec!["s1".into(), "s2".into()],
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 0.0, 3.0], vec![0.0, 0.0, 2.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let t = table();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.row(1), &[0.0, 0.0, 2.0]);
        assert_eq!(t.get("s1", &"c".to_string()), Some(3.0));
        assert_eq!(t.get("s3", &"c".to_string()), None);
        assert_eq!(t.nonzero_counts(&[0, 1]), vec![1, 0, 2]);
        assert_eq!(t.to_rows()[0], vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_missing_cells_are_zero() {
        let t = LabeledTable::from_rows(
            vec!["s1".into(), "s2".into()],
            vec![1u32, 2],
            vec![vec![f64::NAN, 4.0], vec![0.0, f64::NAN]],
        )
        .unwrap();
        assert_eq!(t.to_rows(), vec![vec![0.0, 4.0], vec![0.0, 0.0]]);
        assert_eq!(t.nonzero_counts(&[0, 1]), vec![0, 1]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let res = LabeledTable::<u32>::new(vec!["s1".into()], vec![1, 2], vec![1.0]);
        assert!(matches!(res, Err(MemoError::Data { .. })));
        let res = LabeledTable::<u32>::new(vec!["s1".into()], vec![1, 1], vec![1.0, 2.0]);
        assert!(matches!(res, Err(MemoError::Data { .. })));
    }

    #[test]
    fn test_select() {
        let t = table().select(&[1], &[2, 0]);
        assert_eq!(t.row_labels(), &["s2".to_string()]);
        assert_eq!(t.col_labels(), &["c".to_string(), "a".to_string()]);
        assert_eq!(t.row(0), &[2.0, 0.0]);
    }

    #[test]
    fn test_row_normalized() {
        let t = table().row_normalized();
        assert_eq!(t.row(0), &[0.25, 0.0, 0.75]);
        assert_eq!(t.row(1), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_concat_rows() {
        let left = table();
        let right = LabeledTable::from_rows(
            vec!["s3".into()],
            vec!["c".into(), "d".into()],
            vec![vec![5.0, 6.0]],
        )
        .unwrap();

        let union = left.concat_rows(&right, ColumnJoin::Union);
        assert_eq!(union.col_labels(), &["a", "b", "c", "d"].map(String::from));
        assert_eq!(union.row(0), &[1.0, 0.0, 3.0, 0.0]);
        assert_eq!(union.row(2), &[0.0, 0.0, 5.0, 6.0]);

        let inter = left.concat_rows(&right, ColumnJoin::Intersection);
        assert_eq!(inter.col_labels(), &["c".to_string()]);
        assert_eq!(inter.to_rows(), vec![vec![3.0], vec![2.0], vec![5.0]]);
    }
}
