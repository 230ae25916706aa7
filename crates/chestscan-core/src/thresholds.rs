//! Per-class decision thresholds and optional calibration.
//!
//! Loaded once at start-up and shared read-only with every evaluation. The
//! store is immutable after construction, so `&ThresholdStore` (or an
//! `Arc<ThresholdStore>`) can be handed to any number of threads.

use std::path::Path;

use tracing::info;

use crate::{CLASS_COUNT, CalibrationParameters, ClassLabel, DecisionError, npy};

/// Decision thresholds, one per [`ClassLabel`], plus calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdStore {
    thresholds: Vec<f32>,
    calibration: Option<CalibrationParameters>,
}

impl ThresholdStore {
    /// Build a store from in-memory values, validating them as `load` would.
    pub fn new(
        thresholds: Vec<f32>,
        calibration: Option<CalibrationParameters>,
    ) -> Result<Self, DecisionError> {
        if thresholds.len() != CLASS_COUNT {
            return Err(DecisionError::config(format!(
                "threshold table has {} values, expected {CLASS_COUNT}",
                thresholds.len()
            )));
        }
        if let Some((i, t)) = thresholds
            .iter()
            .enumerate()
            .find(|(_, t)| !(0.0..=1.0).contains(*t))
        {
            return Err(DecisionError::config(format!(
                "threshold for {} (index {i}) is outside [0, 1]: {t}",
                ClassLabel::ALL[i]
            )));
        }
        if let Some(cal) = &calibration {
            cal.validate()?;
        }
        Ok(Self {
            thresholds,
            calibration,
        })
    }

    /// Same threshold for every class, no calibration.
    pub fn uniform(threshold: f32) -> Result<Self, DecisionError> {
        Self::new(vec![threshold; CLASS_COUNT], None)
    }

    /// Load thresholds from `.npy` or `.json`, and calibration from JSON if given.
    ///
    /// A missing or malformed file is an error; there is no fallback table.
    pub fn load(
        thresholds_path: &Path,
        calibration_path: Option<&Path>,
    ) -> Result<Self, DecisionError> {
        let thresholds = read_threshold_file(thresholds_path)?;
        let calibration = calibration_path
            .map(CalibrationParameters::load)
            .transpose()?;
        let store = Self::new(thresholds, calibration)?;
        info!(
            count = store.class_count(),
            path = %thresholds_path.display(),
            calibrated = store.calibration.is_some(),
            "loaded thresholds"
        );
        Ok(store)
    }

    pub fn class_count(&self) -> usize {
        self.thresholds.len()
    }

    /// Threshold for the class at `index`.
    pub fn threshold_for(&self, index: usize) -> Result<f32, DecisionError> {
        self.thresholds
            .get(index)
            .copied()
            .ok_or(DecisionError::Index {
                index,
                len: self.thresholds.len(),
            })
    }

    pub fn threshold_for_label(&self, label: ClassLabel) -> f32 {
        self.thresholds[label.index()]
    }

    /// Temperature used for calibration; 1.0 when none was loaded.
    pub fn calibration_scale(&self) -> f32 {
        self.calibration
            .as_ref()
            .map(|c| c.temperature)
            .unwrap_or(1.0)
    }

    pub fn calibration(&self) -> Option<&CalibrationParameters> {
        self.calibration.as_ref()
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Calibrated score for one class; raw score when uncalibrated.
    pub(crate) fn calibrate(&self, index: usize, raw: f32) -> f32 {
        match &self.calibration {
            Some(cal) => cal.apply(index, raw),
            None => raw,
        }
    }
}

fn read_threshold_file(path: &Path) -> Result<Vec<f32>, DecisionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("npy") => npy::read_f32_vector(path),
        Some("json") => {
            let text = std::fs::read_to_string(path).map_err(|source| DecisionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str::<Vec<f32>>(&text).map_err(|e| {
                DecisionError::config(format!(
                    "{} is not a JSON array of numbers: {e}",
                    path.display()
                ))
            })
        }
        _ => Err(DecisionError::config(format!(
            "unsupported threshold file {}, expected .npy or .json",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npy::tests::f4_npy;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    fn sample_thresholds() -> Vec<f32> {
        (0..CLASS_COUNT).map(|i| 0.1 + i as f32 * 0.05).collect()
    }

    #[test]
    fn new_accepts_fourteen_values() {
        let store = ThresholdStore::new(sample_thresholds(), None).unwrap();
        assert_eq!(store.class_count(), CLASS_COUNT);
        assert_eq!(store.threshold_for(0).unwrap(), 0.1);
        assert_eq!(
            store.threshold_for_label(ClassLabel::Hernia),
            store.threshold_for(13).unwrap()
        );
    }

    #[test]
    fn wrong_length_is_config_error() {
        for len in [0, 13, 15] {
            let err = ThresholdStore::new(vec![0.5; len], None).unwrap_err();
            assert!(matches!(err, DecisionError::Config(_)), "len={len}: {err}");
        }
    }

    #[test]
    fn out_of_range_value_is_config_error() {
        let mut t = vec![0.5; CLASS_COUNT];
        t[7] = 1.5;
        let err = ThresholdStore::new(t, None).unwrap_err();
        assert!(matches!(err, DecisionError::Config(_)));
        assert!(err.to_string().contains("Effusion"), "got: {err}");

        let mut t = vec![0.5; CLASS_COUNT];
        t[0] = -0.01;
        assert!(ThresholdStore::new(t, None).is_err());

        let mut t = vec![0.5; CLASS_COUNT];
        t[2] = f32::NAN;
        assert!(ThresholdStore::new(t, None).is_err());
    }

    #[test]
    fn boundary_values_are_allowed() {
        let mut t = vec![0.0; CLASS_COUNT];
        t[1] = 1.0;
        assert!(ThresholdStore::new(t, None).is_ok());
    }

    #[test]
    fn invalid_calibration_is_config_error() {
        let cal = CalibrationParameters {
            temperature: 0.0,
            bias: None,
        };
        let err = ThresholdStore::new(vec![0.5; CLASS_COUNT], Some(cal)).unwrap_err();
        assert!(matches!(err, DecisionError::Config(_)));
    }

    #[test]
    fn index_out_of_range() {
        let store = ThresholdStore::uniform(0.5).unwrap();
        let err = store.threshold_for(14).unwrap_err();
        assert!(matches!(err, DecisionError::Index { index: 14, len: 14 }));
    }

    #[test]
    fn calibration_scale_defaults_to_identity() {
        let store = ThresholdStore::uniform(0.5).unwrap();
        assert_eq!(store.calibration_scale(), 1.0);
        assert!(store.calibration().is_none());

        let cal = CalibrationParameters::with_temperature(1.8).unwrap();
        let store = ThresholdStore::new(vec![0.5; CLASS_COUNT], Some(cal)).unwrap();
        assert_eq!(store.calibration_scale(), 1.8);
    }

    #[test]
    fn load_npy_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let values = sample_thresholds();
        let path = write_file(&dir, "optimal_thresholds.npy", &f4_npy(&values));

        let store = ThresholdStore::load(&path, None).unwrap();
        assert_eq!(store.thresholds(), values.as_slice());
    }

    #[test]
    fn load_json_thresholds_with_calibration() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::to_string(&vec![0.3f32; CLASS_COUNT]).unwrap();
        let t_path = write_file(&dir, "thresholds.json", json.as_bytes());
        let c_path = write_file(&dir, "calibration.json", br#"{"temperature": 1.5}"#);

        let store = ThresholdStore::load(&t_path, Some(&c_path)).unwrap();
        assert_eq!(store.threshold_for(5).unwrap(), 0.3);
        assert_eq!(store.calibration_scale(), 1.5);
    }

    #[test]
    fn load_rejects_short_npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t.npy", &f4_npy(&[0.5; 13]));
        let err = ThresholdStore::load(&path, None).unwrap_err();
        assert!(err.is_config(), "got: {err}");
    }

    #[test]
    fn load_rejects_out_of_range_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut values = vec![0.5f32; CLASS_COUNT];
        values[3] = 1.5;
        let json = serde_json::to_string(&values).unwrap();
        let path = write_file(&dir, "t.json", json.as_bytes());
        assert!(matches!(
            ThresholdStore::load(&path, None),
            Err(DecisionError::Config(_))
        ));
    }

    #[test]
    fn load_missing_file_fails_without_fallback() {
        let err = ThresholdStore::load(Path::new("/nonexistent/t.npy"), None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t.csv", b"0.5,0.5");
        let err = ThresholdStore::load(&path, None).unwrap_err();
        assert!(err.to_string().contains(".npy or .json"), "got: {err}");
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ThresholdStore>();
    }
}
