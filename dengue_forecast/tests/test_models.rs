mod common;

use assert_approx_eq::assert_approx_eq;
use dengue_forecast::frame::{self, TARGET};
use dengue_forecast::models::{
    DecisionTreeRegressor, ForestConfig, GradientBoostingRegressor, RandomForestRegressor,
    RidgeRegression, TreeConfig,
};
use dengue_forecast::trainer::{best_model, importance_frame, training_matrix, IMPORTANCE};
use dengue_forecast::{FeatureEngineer, ForecastError, ModelTrainer, Regressor};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn features() -> (DataFrame, Vec<String>) {
    let data = common::write_synthetic_data();
    let df = data.loader().load_and_prepare_data().unwrap();
    FeatureEngineer::new().create_features(&df).unwrap()
}

fn small_trainer() -> ModelTrainer {
    let mut trainer = ModelTrainer::empty();
    trainer.insert("ridge", Box::new(RidgeRegression::default()));
    trainer.insert(
        "random_forest",
        Box::new(
            RandomForestRegressor::new(ForestConfig {
                n_trees: 20,
                ..Default::default()
            })
            .unwrap(),
        ),
    );
    trainer
}

#[test]
fn test_evaluate_year_scores_every_model() {
    let (df_feat, cols) = features();
    let trainer = ModelTrainer::new();

    let evaluations = trainer.evaluate_year(&df_feat, &cols, 2024, &[]).unwrap();
    let names: Vec<&str> = evaluations.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["gradient_boosting", "random_forest", "decision_tree", "ridge"]
    );

    for eval in &evaluations {
        assert_eq!(eval.year, 2024);
        assert_eq!(eval.test_frame.height(), 4);
        assert_eq!(eval.predictions.len(), 4);
        assert!(eval.predictions.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert!(eval.metrics.mae >= 0.0);
        assert!(eval.metrics.rmse >= eval.metrics.mae);

        let importance = eval.importance.as_ref().unwrap();
        assert_eq!(importance.height(), cols.len());
        let total: f64 = frame::f64_column(importance, IMPORTANCE)
            .unwrap()
            .iter()
            .flatten()
            .sum();
        assert_approx_eq!(total, 1.0, 1e-9);
    }
}

#[test]
fn test_registered_models_stay_unfitted() {
    let (df_feat, cols) = features();
    let trainer = small_trainer();

    trainer.evaluate_year(&df_feat, &cols, 2023, &[]).unwrap();
    assert!(trainer.models().all(|(_, model)| !model.is_fitted()));
}

#[test]
fn test_test_year_rows_are_never_trained_on() {
    let (df_feat, cols) = features();

    let train = training_matrix(&df_feat, &cols, |year| year < 2024).unwrap();
    let years = frame::i32_column(&df_feat, "year").unwrap();
    assert!(train.rows.iter().all(|&row| years[row].unwrap() < 2024));

    // the first year has no lag-4 inputs
    assert!(train.rows.iter().all(|&row| years[row].unwrap() > 2015));
    assert_eq!(train.x.ncols(), cols.len());
}

#[test]
fn test_excluded_years_shrink_training_set() {
    let (df_feat, cols) = features();

    let all = training_matrix(&df_feat, &cols, |year| year < 2025).unwrap();
    let without_2024 = training_matrix(&df_feat, &cols, |year| year < 2025 && year != 2024).unwrap();
    assert_eq!(all.rows.len() - without_2024.rows.len(), 4);
}

#[test]
fn test_evaluate_year_without_rows() {
    let (df_feat, cols) = features();
    let trainer = small_trainer();

    let err = trainer.evaluate_year(&df_feat, &cols, 2030, &[]).unwrap_err();
    assert!(matches!(err, ForecastError::ValidationError(_)));

    let err = trainer.evaluate_year(&df_feat, &cols, 2015, &[]).unwrap_err();
    assert!(err.to_string().contains("No complete training rows before 2015"));
}

#[test]
fn test_best_model_over_years() {
    let (df_feat, cols) = features();
    let trainer = small_trainer();

    let mut evaluations = trainer.evaluate_year(&df_feat, &cols, 2023, &[]).unwrap();
    evaluations.extend(trainer.evaluate_year(&df_feat, &cols, 2024, &[]).unwrap());

    let best = best_model(&evaluations).unwrap();
    let mean_mae = |name: &str| {
        let maes: Vec<f64> = evaluations
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.metrics.mae)
            .collect();
        maes.iter().sum::<f64>() / maes.len() as f64
    };
    for name in trainer.model_names() {
        assert!(mean_mae(&best) <= mean_mae(&name));
    }
}

#[rstest]
#[case(Box::new(DecisionTreeRegressor::new(TreeConfig { max_depth: 4, ..Default::default() }).unwrap()))]
#[case(Box::new(RandomForestRegressor::default()))]
#[case(Box::new(GradientBoostingRegressor::default()))]
#[case(Box::new(RidgeRegression::default()))]
fn test_models_track_seasonal_signal(#[case] model: Box<dyn Regressor>) {
    // target follows the quarter with a small trend
    let n = 40;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
        0 => (i % 4 == 1) as u8 as f64,
        1 => (i % 4 == 2) as u8 as f64,
        _ => i as f64,
    });
    let y: Array1<f64> = (0..n)
        .map(|i| [10.0, 40.0, 25.0, 5.0][i % 4] + 0.1 * i as f64)
        .collect();

    let mut fitted = model.unfitted();
    assert!(!fitted.is_fitted());
    fitted.fit(&x, &y).unwrap();
    assert!(fitted.is_fitted());

    let predictions = fitted.predict(&x).unwrap();
    let mae = (&predictions - &y).mapv(f64::abs).mean().unwrap();
    let baseline = (&y - y.mean().unwrap()).mapv(f64::abs).mean().unwrap();
    assert!(mae < baseline, "{}: {} >= {}", fitted.name(), mae, baseline);
}

#[test]
fn test_predict_before_fit_fails() {
    let x = Array2::<f64>::zeros((2, 3));
    for model in [
        Box::new(DecisionTreeRegressor::default()) as Box<dyn Regressor>,
        Box::new(RidgeRegression::default()),
    ] {
        assert!(matches!(model.predict(&x), Err(ForecastError::ModelError(_))));
    }
}

#[test]
fn test_importance_frame_top_n() {
    let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let df = importance_frame(&names, &[0.2, 0.5, 0.3], 2).unwrap();

    assert_eq!(df.height(), 2);
    assert_eq!(
        frame::str_column(&df, "Feature").unwrap(),
        vec![Some("b".to_string()), Some("c".to_string())]
    );
    assert!(importance_frame(&names, &[1.0], 3).is_err());
    assert!(!frame::has_column(&df, TARGET));
}
