use super::{ConsolidatedClassifier, ConsolidatedModel};
use crate::data::Dataset;
use crate::errors::ConsolidatedError;
use crate::utils::first_max_index;
use rayon::prelude::*;

impl ConsolidatedModel {
    fn distribution_row(&self, row: &[f64], laplace: bool) -> Vec<f64> {
        if self.hybrid {
            self.tree.predict_hybrid_row(row, self.missing, laplace)
        } else {
            self.tree.predict_consolidated_row(row, self.missing, laplace)
        }
    }

    fn value_row(&self, row: &[f64], laplace: bool) -> f64 {
        if !self.class_is_nominal {
            if self.hybrid {
                self.tree.predict_hybrid_value(row, self.missing)
            } else {
                self.tree.predict_consolidated_value(row, self.missing)
            }
        } else {
            first_max_index(&self.distribution_row(row, laplace)) as f64
        }
    }
}

impl ConsolidatedClassifier {
    /// Class probabilities of one row, given in attribute order.
    ///
    /// * `row` - Attribute values, with the training missing value marking unknowns.
    pub fn predict_distribution(&self, row: &[f64]) -> Result<Vec<f64>, ConsolidatedError> {
        let model = self.fitted()?;
        Ok(model.distribution_row(row, self.cfg.tree.laplace))
    }

    /// Most probable class of one row, ties to the lowest class index.
    pub fn classify(&self, row: &[f64]) -> Result<usize, ConsolidatedError> {
        let model = self.fitted()?;
        if !model.class_is_nominal {
            return Err(ConsolidatedError::IncompatibleParameters(
                "classify needs a nominal class, use predict_value for a numeric class".to_string(),
            ));
        }
        Ok(first_max_index(&model.distribution_row(row, self.cfg.tree.laplace)))
    }

    /// Predicted target of one row: the class index for a nominal class, the mean
    /// for a numeric class.
    pub fn predict_value(&self, row: &[f64]) -> Result<f64, ConsolidatedError> {
        let model = self.fitted()?;
        Ok(model.value_row(row, self.cfg.tree.laplace))
    }

    /// Class probabilities of every row of a dataset.
    ///
    /// * `data` - Rows to predict, with the training schema.
    /// * `parallel` - Predict rows in parallel.
    pub fn predict_proba(&self, data: &Dataset, parallel: bool) -> Result<Vec<Vec<f64>>, ConsolidatedError> {
        let model = self.fitted()?;
        let laplace = self.cfg.tree.laplace;
        let probs = if parallel {
            (0..data.rows())
                .into_par_iter()
                .map(|r| model.distribution_row(&data.get_row(r), laplace))
                .collect()
        } else {
            (0..data.rows())
                .map(|r| model.distribution_row(&data.get_row(r), laplace))
                .collect()
        };
        Ok(probs)
    }

    /// Predicted target of every row of a dataset.
    ///
    /// * `data` - Rows to predict, with the training schema.
    /// * `parallel` - Predict rows in parallel.
    pub fn predict(&self, data: &Dataset, parallel: bool) -> Result<Vec<f64>, ConsolidatedError> {
        let model = self.fitted()?;
        let laplace = self.cfg.tree.laplace;
        let preds = if parallel {
            (0..data.rows())
                .into_par_iter()
                .map(|r| model.value_row(&data.get_row(r), laplace))
                .collect()
        } else {
            (0..data.rows())
                .map(|r| model.value_row(&data.get_row(r), laplace))
                .collect()
        };
        Ok(preds)
    }
}
