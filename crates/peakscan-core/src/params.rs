use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::consts::ALL_BUFFERS;
use crate::error::{PeakScanError, Result};
use crate::peak::Feature;
use crate::roi::Roi;

pub const KEY_SOURCE: &str = "image_source";
pub const KEY_FEATURE: &str = "feature";
pub const KEY_FRAME: &str = "frame_number";
pub const KEY_BUFFER: &str = "buffer_number";
pub const KEY_ROI_X: &str = "roi_x";
pub const KEY_ROI_Y: &str = "roi_y";
pub const KEY_ROI_WIDTH: &str = "roi_width";
pub const KEY_ROI_HEIGHT: &str = "roi_height";
pub const KEY_MIN_THRESHOLD: &str = "min_threshold";
pub const KEY_SHOW_MIN_THRESHOLD: &str = "show_min_threshold";
pub const KEY_AUTO_SCALING_ENABLED: &str = "auto_scaling_enabled";

/// Which acquisition stream the detector analyses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferSource {
    Raw,
    #[default]
    Processed,
}

impl BufferSource {
    pub fn to_index(self) -> i64 {
        match self {
            Self::Raw => 0,
            Self::Processed => 1,
        }
    }

    pub fn from_index(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Processed),
            _ => Err(PeakScanError::UnknownVariant {
                kind: "buffer source",
                value,
            }),
        }
    }
}

impl std::fmt::Display for BufferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Complete detector configuration, replaced as a whole on every change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub buffer_source: BufferSource,
    pub feature: Feature,
    pub roi: Roi,
    /// Frame inside the selected buffer.
    pub frame_nr: i32,
    /// Buffer inside the volume, `-1` for every buffer.
    pub buffer_nr: i32,
    pub min_threshold: f64,
    pub show_min_threshold: bool,
    pub auto_scaling_enabled: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            buffer_source: BufferSource::Processed,
            feature: Feature::MaxValue,
            roi: Roi::default(),
            frame_nr: 0,
            buffer_nr: ALL_BUFFERS,
            min_threshold: 0.0,
            show_min_threshold: false,
            auto_scaling_enabled: true,
        }
    }
}

/// A single persisted settings value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Key-value settings as stored by the host.
pub type Settings = BTreeMap<String, SettingValue>;

impl Parameters {
    /// Flatten into host settings, one key per field.
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::new();
        let mut put = |key: &str, value: SettingValue| {
            settings.insert(key.to_string(), value);
        };
        put(KEY_BUFFER, self.buffer_nr.into());
        put(KEY_SOURCE, self.buffer_source.to_index().into());
        put(KEY_FEATURE, self.feature.to_index().into());
        put(KEY_FRAME, self.frame_nr.into());
        put(KEY_ROI_X, self.roi.x.into());
        put(KEY_ROI_Y, self.roi.y.into());
        put(KEY_ROI_WIDTH, self.roi.width.into());
        put(KEY_ROI_HEIGHT, self.roi.height.into());
        put(KEY_MIN_THRESHOLD, self.min_threshold.into());
        put(KEY_SHOW_MIN_THRESHOLD, self.show_min_threshold.into());
        put(KEY_AUTO_SCALING_ENABLED, self.auto_scaling_enabled.into());
        settings
    }

    /// Rebuild parameters from host settings.
    ///
    /// Keys that are absent keep their default value; an empty map gives
    /// [`Parameters::default`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut params = Self::default();

        if let Some(v) = read_int(settings, KEY_BUFFER)? {
            params.buffer_nr = v;
        }
        if let Some(v) = read_int(settings, KEY_SOURCE)? {
            params.buffer_source = BufferSource::from_index(i64::from(v))
                .map_err(|e| invalid(KEY_SOURCE, e.to_string()))?;
        }
        if let Some(v) = read_int(settings, KEY_FEATURE)? {
            params.feature = Feature::from_index(i64::from(v))
                .map_err(|e| invalid(KEY_FEATURE, e.to_string()))?;
        }
        if let Some(v) = read_int(settings, KEY_FRAME)? {
            params.frame_nr = v;
        }
        if let Some(v) = read_int(settings, KEY_ROI_X)? {
            params.roi.x = v;
        }
        if let Some(v) = read_int(settings, KEY_ROI_Y)? {
            params.roi.y = v;
        }
        if let Some(v) = read_int(settings, KEY_ROI_WIDTH)? {
            params.roi.width = v;
        }
        if let Some(v) = read_int(settings, KEY_ROI_HEIGHT)? {
            params.roi.height = v;
        }
        if let Some(v) = read_float(settings, KEY_MIN_THRESHOLD)? {
            params.min_threshold = v;
        }
        if let Some(v) = read_bool(settings, KEY_SHOW_MIN_THRESHOLD)? {
            params.show_min_threshold = v;
        }
        if let Some(v) = read_bool(settings, KEY_AUTO_SCALING_ENABLED)? {
            params.auto_scaling_enabled = v;
        }

        Ok(params)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> PeakScanError {
    PeakScanError::InvalidSetting {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_int(settings: &Settings, key: &str) -> Result<Option<i32>> {
    match settings.get(key) {
        None => Ok(None),
        Some(SettingValue::Int(v)) => i32::try_from(*v)
            .map(Some)
            .map_err(|_| invalid(key, format!("{v} does not fit in a 32-bit integer"))),
        Some(other) => Err(invalid(key, format!("expected an integer, got {other:?}"))),
    }
}

fn read_float(settings: &Settings, key: &str) -> Result<Option<f64>> {
    match settings.get(key) {
        None => Ok(None),
        Some(SettingValue::Float(v)) => Ok(Some(*v)),
        Some(SettingValue::Int(v)) => Ok(Some(*v as f64)),
        Some(other) => Err(invalid(key, format!("expected a number, got {other:?}"))),
    }
}

fn read_bool(settings: &Settings, key: &str) -> Result<Option<bool>> {
    match settings.get(key) {
        None => Ok(None),
        Some(SettingValue::Bool(v)) => Ok(Some(*v)),
        Some(SettingValue::Int(v @ (0 | 1))) => Ok(Some(*v == 1)),
        Some(other) => Err(invalid(key, format!("expected a boolean, got {other:?}"))),
    }
}

/// Latest parameters, written by the control context and copied out once
/// per analysis cycle.
///
/// Cloning the store shares the same underlying record.
#[derive(Clone, Debug, Default)]
pub struct ParameterStore {
    inner: Arc<RwLock<Parameters>>,
}

impl ParameterStore {
    pub fn new(params: Parameters) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Consistent copy of the current parameters.
    pub fn snapshot(&self) -> Parameters {
        *self.inner.read()
    }

    /// Replace the whole record.
    pub fn replace(&self, params: Parameters) {
        *self.inner.write() = params;
    }

    /// Copy, modify and store back; returns the stored value.
    pub fn update(&self, f: impl FnOnce(&mut Parameters)) -> Parameters {
        let mut guard = self.inner.write();
        let mut next = *guard;
        f(&mut next);
        *guard = next;
        next
    }
}
