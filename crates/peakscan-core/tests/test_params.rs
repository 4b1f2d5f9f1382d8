use std::sync::Arc;
use std::thread;

use peakscan_core::error::PeakScanError;
use peakscan_core::params::*;
use peakscan_core::peak::Feature;
use peakscan_core::roi::Roi;

fn custom() -> Parameters {
    Parameters {
        buffer_source: BufferSource::Raw,
        feature: Feature::MaxValue,
        roi: Roi::new(-4, 12, 300, -20),
        frame_nr: 3,
        buffer_nr: 7,
        min_threshold: 12.5,
        show_min_threshold: true,
        auto_scaling_enabled: false,
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_default_parameters() {
    let p = Parameters::default();
    assert_eq!(p.buffer_source, BufferSource::Processed);
    assert_eq!(p.feature, Feature::MaxValue);
    assert_eq!(p.roi, Roi::new(50, 50, 400, 800));
    assert_eq!(p.frame_nr, 0);
    assert_eq!(p.buffer_nr, -1);
    assert_eq!(p.min_threshold, 0.0);
    assert!(!p.show_min_threshold);
    assert!(p.auto_scaling_enabled);
}

#[test]
fn test_buffer_source_index() {
    assert_eq!(BufferSource::Raw.to_index(), 0);
    assert_eq!(BufferSource::Processed.to_index(), 1);
    assert_eq!(BufferSource::from_index(0).unwrap(), BufferSource::Raw);
    assert_eq!(BufferSource::from_index(1).unwrap(), BufferSource::Processed);
    assert!(matches!(
        BufferSource::from_index(2),
        Err(PeakScanError::UnknownVariant { value: 2, .. })
    ));
    assert_eq!(BufferSource::Raw.to_string(), "raw");
}

// ---------------------------------------------------------------------------
// Settings persistence
// ---------------------------------------------------------------------------

#[test]
fn test_settings_roundtrip() {
    let params = custom();
    let settings = params.to_settings();
    assert_eq!(settings.len(), 11);
    assert_eq!(Parameters::from_settings(&settings).unwrap(), params);
}

#[test]
fn test_settings_keys() {
    let settings = custom().to_settings();
    assert_eq!(settings[KEY_SOURCE], SettingValue::Int(0));
    assert_eq!(settings[KEY_FEATURE], SettingValue::Int(0));
    assert_eq!(settings[KEY_FRAME], SettingValue::Int(3));
    assert_eq!(settings[KEY_BUFFER], SettingValue::Int(7));
    assert_eq!(settings[KEY_ROI_X], SettingValue::Int(-4));
    assert_eq!(settings[KEY_ROI_HEIGHT], SettingValue::Int(-20));
    assert_eq!(settings[KEY_MIN_THRESHOLD], SettingValue::Float(12.5));
    assert_eq!(settings[KEY_SHOW_MIN_THRESHOLD], SettingValue::Bool(true));
    assert_eq!(settings[KEY_AUTO_SCALING_ENABLED], SettingValue::Bool(false));
}

#[test]
fn test_empty_settings_give_defaults() {
    let params = Parameters::from_settings(&Settings::new()).unwrap();
    assert_eq!(params, Parameters::default());
}

#[test]
fn test_missing_key_keeps_default() {
    let mut settings = custom().to_settings();
    settings.remove(KEY_ROI_WIDTH);
    settings.remove(KEY_MIN_THRESHOLD);

    let params = Parameters::from_settings(&settings).unwrap();
    assert_eq!(params.roi.width, Roi::default().width);
    assert_eq!(params.min_threshold, 0.0);
    assert_eq!(params.roi.x, -4);
    assert_eq!(params.buffer_source, BufferSource::Raw);
}

#[test]
fn test_integer_threshold_is_accepted() {
    let mut settings = Settings::new();
    settings.insert(KEY_MIN_THRESHOLD.into(), SettingValue::Int(40));
    let params = Parameters::from_settings(&settings).unwrap();
    assert_eq!(params.min_threshold, 40.0);
}

#[test]
fn test_wrong_type_is_rejected() {
    let mut settings = Settings::new();
    settings.insert(KEY_ROI_X.into(), SettingValue::Float(1.5));
    let err = Parameters::from_settings(&settings).unwrap_err();
    match err {
        PeakScanError::InvalidSetting { key, .. } => assert_eq!(key, KEY_ROI_X),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bool_key_rejects_float() {
    let mut settings = Settings::new();
    settings.insert(KEY_AUTO_SCALING_ENABLED.into(), SettingValue::Float(1.0));
    assert!(Parameters::from_settings(&settings).is_err());
}

#[test]
fn test_unknown_source_index_is_rejected() {
    let mut settings = Settings::new();
    settings.insert(KEY_SOURCE.into(), SettingValue::Int(5));
    let err = Parameters::from_settings(&settings).unwrap_err();
    assert!(matches!(err, PeakScanError::InvalidSetting { ref key, .. } if key == KEY_SOURCE));
}

#[test]
fn test_unknown_feature_index_is_rejected() {
    let mut settings = Settings::new();
    settings.insert(KEY_FEATURE.into(), SettingValue::Int(-1));
    assert!(Parameters::from_settings(&settings).is_err());
}

#[test]
fn test_settings_json_roundtrip() {
    let settings = custom().to_settings();
    let json = serde_json::to_string(&settings).unwrap();
    let parsed: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(Parameters::from_settings(&parsed).unwrap(), custom());
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

#[test]
fn test_parameters_toml_roundtrip() {
    let text = toml::to_string(&custom()).unwrap();
    let parsed: Parameters = toml::from_str(&text).unwrap();
    assert_eq!(parsed, custom());
}

#[test]
fn test_parameters_partial_toml_uses_defaults() {
    let parsed: Parameters = toml::from_str("min_threshold = 7.0\nbuffer_source = \"Raw\"\n").unwrap();
    assert_eq!(parsed.min_threshold, 7.0);
    assert_eq!(parsed.buffer_source, BufferSource::Raw);
    assert_eq!(parsed.roi, Roi::default());
    assert_eq!(parsed.buffer_nr, -1);
}

// ---------------------------------------------------------------------------
// ParameterStore
// ---------------------------------------------------------------------------

#[test]
fn test_store_snapshot_is_a_copy() {
    let store = ParameterStore::new(Parameters::default());
    let before = store.snapshot();
    store.replace(custom());
    assert_eq!(before, Parameters::default());
    assert_eq!(store.snapshot(), custom());
}

#[test]
fn test_store_update_returns_stored_value() {
    let store = ParameterStore::default();
    let stored = store.update(|p| p.min_threshold = 3.0);
    assert_eq!(stored.min_threshold, 3.0);
    assert_eq!(store.snapshot().min_threshold, 3.0);
}

#[test]
fn test_store_clones_share_state() {
    let store = ParameterStore::default();
    let control = store.clone();
    control.update(|p| p.frame_nr = 9);
    assert_eq!(store.snapshot().frame_nr, 9);
}

#[test]
fn test_store_snapshots_are_never_torn() {
    let a = Parameters::default();
    let b = custom();
    let store = Arc::new(ParameterStore::new(a));

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..2000 {
                store.replace(if i % 2 == 0 { b } else { a });
            }
        })
    };

    for _ in 0..2000 {
        let snap = store.snapshot();
        assert!(snap == a || snap == b, "torn snapshot: {snap:?}");
    }
    writer.join().unwrap();
}
