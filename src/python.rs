use crate::archive::ArchiveHandle;
use crate::batch::{BatchResult, BatchRunner, APPLY_VERB, DELETE_VERB};
use crate::field::Field;
use crate::form;
use crate::library;
use crate::logging;
use crate::merge::{PerFileUpdate, Sequence};
use crate::record::FieldUpdate;
use crate::settings::Settings;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use pyo3::IntoPyObjectExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// --- Helpers ---

fn json_to_py(py: Python<'_>, value: Value) -> PyResult<PyObject> {
    match value {
        Value::Null => Ok(py.None()),
        Value::Bool(b) => b.into_py_any(py),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into_py_any(py),
            None => n.as_f64().unwrap_or_default().into_py_any(py),
        },
        Value::String(s) => s.into_py_any(py),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            Ok(list.into())
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, json_to_py(py, item)?)?;
            }
            Ok(dict.into())
        }
    }
}

fn to_py_err(err: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

/// Overrides the defaults with whatever keys the caller passed.
fn settings_from_dict(config: Option<&Bound<'_, PyDict>>) -> PyResult<Settings> {
    let mut settings = Settings::default();
    if let Some(config) = config {
        if let Some(workers) = config.get_item("workers")? {
            settings.workers = workers.extract()?;
        }
        if let Some(limit) = config.get_item("error_report_limit")? {
            settings.error_report_limit = limit.extract()?;
        }
        if let Some(support) = config.get_item("read_only_support")? {
            let support: String = support.extract()?;
            settings.read_only_support = support
                .parse()
                .map_err(|e| PyValueError::new_err(format!("{e}")))?;
        }
    }
    settings
        .validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(settings)
}

fn handle_for(path: &str) -> PyResult<ArchiveHandle> {
    ArchiveHandle::new(path).map_err(|e| PyValueError::new_err(format!("{path}: {e}")))
}

fn parse_field(key: &str) -> PyResult<Field> {
    key.parse().map_err(|e| PyValueError::new_err(format!("{e}")))
}

fn batch_to_json(result: &BatchResult, verb: &str) -> PyResult<Value> {
    let mut value = serde_json::to_value(result).map_err(to_py_err)?;
    if let Value::Object(map) = &mut value {
        map.insert("summary".to_string(), json!(result.summary(verb)));
        map.insert("errors".to_string(), json!(result.report()));
    }
    Ok(value)
}

// --- Bindings ---

// Inspection

#[pyfunction]
#[pyo3(signature = (path, settings=None))]
fn read_metadata(
    py: Python<'_>,
    path: String,
    settings: Option<Bound<'_, PyDict>>,
) -> PyResult<PyObject> {
    let archives = settings_from_dict(settings.as_ref())?.archives();
    let handle = handle_for(&path)?;
    let record = py
        .allow_threads(|| archives.read_record(&handle))
        .map_err(|e| PyRuntimeError::new_err(format!("{path}: {e}")))?;
    let value = serde_json::to_value(&record).map_err(to_py_err)?;
    json_to_py(py, value)
}

#[pyfunction]
#[pyo3(signature = (path, settings=None))]
fn list_entries(
    py: Python<'_>,
    path: String,
    settings: Option<Bound<'_, PyDict>>,
) -> PyResult<Vec<String>> {
    let archives = settings_from_dict(settings.as_ref())?.archives();
    let handle = handle_for(&path)?;
    py.allow_threads(|| archives.list_entries(&handle))
        .map_err(|e| PyRuntimeError::new_err(format!("{path}: {e}")))
}

#[pyfunction]
#[pyo3(signature = (path, settings=None))]
fn metadata_digest(
    py: Python<'_>,
    path: String,
    settings: Option<Bound<'_, PyDict>>,
) -> PyResult<Option<String>> {
    let archives = settings_from_dict(settings.as_ref())?.archives();
    let handle = handle_for(&path)?;
    py.allow_threads(|| archives.metadata_digest(&handle))
        .map_err(|e| PyRuntimeError::new_err(format!("{path}: {e}")))
}

// Batches

#[pyfunction]
#[pyo3(signature = (paths, values, settings=None, from_form=false, number_from=None, number_field="number", count_field=None))]
#[allow(clippy::too_many_arguments)]
fn apply_metadata<'a>(
    py: Python<'a>,
    paths: Vec<String>,
    values: BTreeMap<String, String>,
    settings: Option<Bound<'a, PyDict>>,
    from_form: bool,
    number_from: Option<i64>,
    number_field: &str,
    count_field: Option<String>,
) -> PyResult<Bound<'a, PyAny>> {
    let settings = settings_from_dict(settings.as_ref())?;
    let runner =
        BatchRunner::from_settings(&settings).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let update = if from_form {
        FieldUpdate::from_form(&values)
    } else {
        FieldUpdate::from_pairs(values)
    }
    .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let per_file: Option<Arc<dyn PerFileUpdate>> = match number_from {
        Some(start) => {
            let mut sequence = Sequence::new(parse_field(number_field)?, start);
            if let Some(count_field) = count_field {
                sequence = sequence.with_count(parse_field(&count_field)?);
            }
            Some(Arc::new(sequence) as Arc<dyn PerFileUpdate>)
        }
        None => None,
    };
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let result = runner.apply_batch(&paths, update, per_file).await;
        let value = batch_to_json(&result, APPLY_VERB)?;
        Python::with_gil(|py| json_to_py(py, value))
    })
}

#[pyfunction]
#[pyo3(signature = (paths, settings=None))]
fn delete_metadata<'a>(
    py: Python<'a>,
    paths: Vec<String>,
    settings: Option<Bound<'a, PyDict>>,
) -> PyResult<Bound<'a, PyAny>> {
    let settings = settings_from_dict(settings.as_ref())?;
    let runner =
        BatchRunner::from_settings(&settings).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let result = runner.delete_batch(&paths).await;
        let value = batch_to_json(&result, DELETE_VERB)?;
        Python::with_gil(|py| json_to_py(py, value))
    })
}

// Library

#[pyfunction]
#[pyo3(signature = (folder, settings=None))]
fn scan_folder(folder: String, settings: Option<Bound<'_, PyDict>>) -> PyResult<Vec<String>> {
    let read_only = settings_from_dict(settings.as_ref())?
        .archives()
        .read_only_available();
    let found = library::scan_folder(Path::new(&folder), read_only).map_err(to_py_err)?;
    Ok(found
        .into_iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect())
}

#[pyfunction]
#[pyo3(signature = (path, changed=false))]
fn file_attributes(py: Python<'_>, path: String, changed: bool) -> PyResult<PyObject> {
    let attributes = library::file_attributes(Path::new(&path), changed);
    let value = serde_json::to_value(attributes).map_err(to_py_err)?;
    json_to_py(py, value)
}

// Vocabulary

#[pyfunction]
fn field_keys() -> Vec<(&'static str, &'static str)> {
    Field::ALL
        .iter()
        .map(|field| (field.key(), field.tag()))
        .collect()
}

#[pyfunction]
fn language_to_iso(name: &str) -> String {
    form::language_to_iso(name)
}

#[pyfunction]
fn language_names() -> Vec<&'static str> {
    form::language_names().collect()
}

#[pyfunction]
fn init_logging() -> bool {
    logging::setup_logger(false)
}

#[pymodule]
fn _cbmeta_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(read_metadata, m)?)?;
    m.add_function(wrap_pyfunction!(list_entries, m)?)?;
    m.add_function(wrap_pyfunction!(metadata_digest, m)?)?;

    m.add_function(wrap_pyfunction!(apply_metadata, m)?)?;
    m.add_function(wrap_pyfunction!(delete_metadata, m)?)?;

    m.add_function(wrap_pyfunction!(scan_folder, m)?)?;
    m.add_function(wrap_pyfunction!(file_attributes, m)?)?;

    m.add_function(wrap_pyfunction!(field_keys, m)?)?;
    m.add_function(wrap_pyfunction!(language_to_iso, m)?)?;
    m.add_function(wrap_pyfunction!(language_names, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
