use geobridge_common::error::DatasourceError;
use pyo3::prelude::*;
use pyo3::{intern, PyErr};

use crate::gil::with_gil;

/// Formats a Python exception the way the interpreter would print it.
///
/// The full traceback is produced by `traceback.format_exception` when the
/// exception carries one. If formatting itself fails, the exception's own
/// string form is returned instead.
pub fn format_py_error_with_traceback(py: Python<'_>, e: &PyErr) -> String {
    let formatted = (|| -> PyResult<Vec<String>> {
        let traceback = PyModule::import(py, intern!(py, "traceback"))?;
        let format_exception = traceback.getattr(intern!(py, "format_exception"))?;
        format_exception
            .call1((e.get_type(py), e.value(py), e.traceback(py)))?
            .extract()
    })();
    match formatted {
        // Each line already ends with a newline character.
        Ok(lines) if !lines.is_empty() => lines.concat(),
        _ => e.to_string(),
    }
}

/// Converts a Python exception into the host error, preserving the traceback text.
pub fn py_err(e: PyErr) -> DatasourceError {
    with_gil(|py| DatasourceError::python(format_py_error_with_traceback(py, &e)))
}
