//! C ABI for native presenters.
//!
//! A presenter creates one classifier handle per model directory, asks it for
//! the top category or a JSON encoded ranking, and frees every returned string
//! with [`txcat_string_free`]. Invalid arguments never abort: they produce the
//! same degraded values as an unavailable model (`"unknown"` and an empty
//! ranking).

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use log::warn;

use crate::classifier::{CategoryClassifier, OnnxModelProvider, PredictionResult};
use crate::config::ClassifierConfig;

/// Opaque classifier handle.
pub struct TxcatClassifier {
    inner: CategoryClassifier<OnnxModelProvider>,
}

unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn into_c_string(value: String) -> *mut c_char {
    // Interior NULs cannot cross the boundary; drop them rather than failing.
    let cleaned: String = value.chars().filter(|&c| c != '\0').collect();
    CString::new(cleaned).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

fn ranking_json(result: &PredictionResult) -> String {
    serde_json::to_string(result)
        .unwrap_or_else(|_| r#"{"hypotheses":[],"top_label":"unknown"}"#.to_string())
}

/// Creates a classifier for the model bundle in `model_dir`. The model is
/// loaded lazily on the first prediction. Returns NULL if `model_dir` is NULL
/// or not valid UTF-8.
///
/// # Safety
/// `model_dir` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn txcat_classifier_new(model_dir: *const c_char) -> *mut TxcatClassifier {
    let Some(dir) = read_str(model_dir) else {
        warn!("txcat_classifier_new called without a valid model directory");
        return ptr::null_mut();
    };
    let inner = CategoryClassifier::with_config(OnnxModelProvider::from_dir(dir), ClassifierConfig::from_env());
    Box::into_raw(Box::new(TxcatClassifier { inner }))
}

/// Releases a handle created by [`txcat_classifier_new`]. NULL is ignored.
///
/// # Safety
/// `handle` must be NULL or a pointer returned by `txcat_classifier_new` that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn txcat_classifier_free(handle: *mut TxcatClassifier) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Returns the most probable category for `text` as a newly allocated string.
///
/// # Safety
/// `handle` must be NULL or a live handle; `text` must be NULL or a valid
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn txcat_predict_top(
    handle: *const TxcatClassifier,
    text: *const c_char,
) -> *mut c_char {
    let result = match (handle.as_ref(), read_str(text)) {
        (Some(handle), Some(text)) => handle.inner.predict_top(text),
        _ => PredictionResult::unknown().top_label,
    };
    into_c_string(result)
}

/// Returns up to `k` ranked hypotheses for `text` as JSON:
/// `{"hypotheses":[{"category":..,"probability":..}],"top_label":..}`.
///
/// # Safety
/// Same requirements as [`txcat_predict_top`].
#[no_mangle]
pub unsafe extern "C" fn txcat_predict_ranked_json(
    handle: *const TxcatClassifier,
    text: *const c_char,
    k: usize,
) -> *mut c_char {
    let result = match (handle.as_ref(), read_str(text)) {
        (Some(handle), Some(text)) => handle.inner.predict_ranked(text, k),
        _ => PredictionResult::unknown(),
    };
    into_c_string(ranking_json(&result))
}

/// Frees a string returned by this library. NULL is ignored.
///
/// # Safety
/// `value` must be NULL or a pointer returned by a `txcat_*` function that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn txcat_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}
