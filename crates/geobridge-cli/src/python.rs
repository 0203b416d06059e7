use std::ffi::CString;
use std::path::{Path, PathBuf};

use geobridge_common::error::{DatasourceError, DatasourceResult};
use geobridge_python::{py_err, register_module, with_gil};
use log::debug;
use pyo3::prelude::*;
use pyo3::types::PyList;

/// Where the datasource object comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLocation {
    /// A Python file executed as a fresh module.
    Script(PathBuf),
    /// A module resolved through the regular import system.
    Module(String),
}

/// Produces the datasource object by calling `factory` with no arguments
/// on the loaded module.
pub fn load_datasource(location: &SourceLocation, factory: &str) -> DatasourceResult<PyObject> {
    let source = match location {
        SourceLocation::Script(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| DatasourceError::internal(format!("{}: {e}", path.display())))?,
        ),
        SourceLocation::Module(_) => None,
    };
    with_gil(|py| {
        register_module(py).map_err(py_err)?;
        let module = match (location, source) {
            (SourceLocation::Script(path), Some(source)) => load_script(py, path, &source)?,
            (SourceLocation::Module(name), _) => py.import(name.as_str()).map_err(py_err)?,
            (SourceLocation::Script(path), None) => {
                return Err(DatasourceError::internal(format!(
                    "no source read for {}",
                    path.display()
                )))
            }
        };
        debug!("calling {factory} in module {}", module.name().map_err(py_err)?);
        let object = module
            .getattr(factory)
            .and_then(|f| f.call0())
            .map_err(py_err)?;
        Ok(object.unbind())
    })
}

fn load_script<'py>(
    py: Python<'py>,
    path: &Path,
    source: &str,
) -> DatasourceResult<Bound<'py, PyModule>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let sys_path = py
            .import("sys")
            .and_then(|sys| sys.getattr("path"))
            .map_err(py_err)?;
        let sys_path = sys_path
            .downcast::<PyList>()
            .map_err(|e| DatasourceError::internal(e.to_string()))?;
        sys_path
            .insert(0, parent.to_string_lossy().as_ref())
            .map_err(py_err)?;
    }
    let name = module_name(path);
    let c = |s: &str| CString::new(s).map_err(|e| DatasourceError::internal(e.to_string()));
    PyModule::from_code(
        py,
        c(source)?.as_c_str(),
        c(&path.to_string_lossy())?.as_c_str(),
        c(&name)?.as_c_str(),
    )
    .map_err(py_err)
}

/// The file stem with characters that cannot appear in a module name replaced.
fn module_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "datasource".to_string()
    } else {
        name
    }
}
