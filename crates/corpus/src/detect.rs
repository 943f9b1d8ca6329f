use crate::matrix::CorpusMatrix;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-row verdict from a novelty detector, the usual −1/+1 convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Anomaly,
    Normal,
}

impl Verdict {
    pub fn from_sign(value: i8) -> Self {
        if value < 0 {
            Self::Anomaly
        } else {
            Self::Normal
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Anomaly => -1,
            Self::Normal => 1,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Anomaly => "anomaly",
            Self::Normal => "normal",
        };
        f.write_str(s)
    }
}

/// Interface the trained estimators expose to this pipeline.
///
/// The concrete estimators (a local-density model and a tree ensemble)
/// live outside this crate; callers fit them on the training matrix and
/// score held-out matrices. Implementations must refuse a zero-row
/// matrix with [`Error::EmptyCorpus`] — "nothing to train on" beats an
/// obscure numeric failure downstream.
pub trait NoveltyDetector {
    fn fit(&mut self, matrix: &CorpusMatrix) -> Result<()>;

    /// One verdict per row of `matrix`.
    fn predict(&self, matrix: &CorpusMatrix) -> Result<Vec<Verdict>>;

    /// Continuous anomaly score per row; lower means more anomalous.
    fn decision_function(&self, matrix: &CorpusMatrix) -> Result<Vec<f64>>;
}

/// Guard shared by detector implementations.
pub fn require_rows(matrix: &CorpusMatrix) -> Result<()> {
    if matrix.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Flags rows whose first column strays more than one from the
    /// fitted mean. Stands in for the real estimators in tests.
    #[derive(Default)]
    struct MeanGate {
        center: f64,
    }

    impl NoveltyDetector for MeanGate {
        fn fit(&mut self, matrix: &CorpusMatrix) -> Result<()> {
            require_rows(matrix)?;
            let first: Vec<f64> = matrix.rows().iter().map(|r| r[0]).collect();
            self.center = first.iter().sum::<f64>() / first.len() as f64;
            Ok(())
        }

        fn predict(&self, matrix: &CorpusMatrix) -> Result<Vec<Verdict>> {
            require_rows(matrix)?;
            Ok(matrix
                .rows()
                .iter()
                .map(|r| {
                    if (r[0] - self.center).abs() > 1.0 {
                        Verdict::Anomaly
                    } else {
                        Verdict::Normal
                    }
                })
                .collect())
        }

        fn decision_function(&self, matrix: &CorpusMatrix) -> Result<Vec<f64>> {
            require_rows(matrix)?;
            Ok(matrix
                .rows()
                .iter()
                .map(|r| 1.0 - (r[0] - self.center).abs())
                .collect())
        }
    }

    fn matrix_of(values: &[f64]) -> CorpusMatrix {
        let mut matrix = CorpusMatrix::new(vec!["x".into()]);
        for &v in values {
            matrix.push_row(vec![v]).unwrap();
        }
        matrix
    }

    #[test]
    fn verdict_sign_convention() {
        assert_eq!(Verdict::from_sign(-1), Verdict::Anomaly);
        assert_eq!(Verdict::from_sign(1), Verdict::Normal);
        assert_eq!(Verdict::Anomaly.as_i8(), -1);
        assert_eq!(Verdict::Normal.as_i8(), 1);
    }

    #[test]
    fn fit_refuses_empty_matrix() {
        let mut detector = MeanGate::default();
        let err = detector.fit(&matrix_of(&[])).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[test]
    fn predict_scores_each_row() {
        let mut detector = MeanGate::default();
        detector.fit(&matrix_of(&[1.0, 1.2, 0.8])).unwrap();

        let verdicts = detector.predict(&matrix_of(&[1.0, 5.0])).unwrap();
        assert_eq!(verdicts, vec![Verdict::Normal, Verdict::Anomaly]);

        let scores = detector.decision_function(&matrix_of(&[1.0, 5.0])).unwrap();
        assert!(scores[0] > scores[1]);
    }
}
