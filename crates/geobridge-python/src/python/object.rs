use std::time::Instant;

use geobridge_common::config::PythonConfig;
use geobridge_common::datasource::Query;
use geobridge_common::error::{DatasourceError, DatasourceResult};
use geobridge_common::geometry::{Box2d, Coord2d};
use log::warn;
use pyo3::exceptions::PyAttributeError;
use pyo3::prelude::*;

use crate::error::py_err;
use crate::gil::with_gil;
use crate::object::DatasourceObject;
use crate::python::cursor::PyFeatureCursor;
use crate::python::types::{PyCoord, PyQuery};

const DATA_TYPE: &str = "data_type";
const ENVELOPE: &str = "envelope";
const GEOMETRY_TYPE: &str = "geometry_type";
const FEATURES: &str = "features";
const FEATURES_AT_POINT: &str = "features_at_point";

/// The result of looking up one attribute on the datasource object.
enum Param<'py> {
    Absent,
    Null,
    Value(Bound<'py, PyAny>),
}

/// A Python object used as a datasource.
///
/// Attributes are looked up on every call and never cached, so the object
/// may change them between calls.
#[derive(Debug)]
pub struct PyDatasourceObject {
    object: PyObject,
    config: PythonConfig,
}

impl PyDatasourceObject {
    pub fn new(object: PyObject) -> Self {
        Self::with_config(object, PythonConfig::default())
    }

    pub fn with_config(object: PyObject, config: PythonConfig) -> Self {
        Self { object, config }
    }

    pub fn as_py(&self) -> &PyObject {
        &self.object
    }

    fn param<'py>(&self, py: Python<'py>, key: &str) -> DatasourceResult<Param<'py>> {
        match self.object.bind(py).getattr(key) {
            Ok(value) if value.is_none() => Ok(Param::Null),
            Ok(value) => Ok(Param::Value(value)),
            Err(e) if e.is_instance_of::<PyAttributeError>(py) => Ok(Param::Absent),
            Err(e) => Err(py_err(e)),
        }
    }

    fn required_param<'py>(&self, py: Python<'py>, key: &str) -> DatasourceResult<Bound<'py, PyAny>> {
        match self.param(py, key)? {
            Param::Absent => Err(DatasourceError::missing(key)),
            Param::Null => Err(DatasourceError::null(key)),
            Param::Value(value) => Ok(value),
        }
    }

    /// Runs one interaction with the object and warns if it was slow.
    fn watch<T>(&self, operation: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        if let Some(threshold) = self.config.slow_call_threshold() {
            let elapsed = start.elapsed();
            if elapsed > threshold {
                warn!(
                    "[PythonDatasource] {operation} took {}ms, above the {}ms threshold",
                    elapsed.as_millis(),
                    threshold.as_millis()
                );
            }
        }
        result
    }
}

fn extract_i64(value: &Bound<'_, PyAny>, field: &str) -> DatasourceResult<i64> {
    value
        .extract::<i64>()
        .map_err(|e| DatasourceError::conversion(field, py_err(e).message()))
}

impl DatasourceObject for PyDatasourceObject {
    type Cursor = PyFeatureCursor;

    fn data_type(&self) -> DatasourceResult<i64> {
        self.watch(DATA_TYPE, || {
            with_gil(|py| {
                let value = self.required_param(py, DATA_TYPE)?;
                extract_i64(&value, DATA_TYPE)
            })
        })
    }

    fn envelope(&self) -> DatasourceResult<Box2d> {
        self.watch(ENVELOPE, || {
            with_gil(|py| {
                let envelope = self.required_param(py, ENVELOPE)?;
                let bound = |name: &str| -> DatasourceResult<f64> {
                    envelope
                        .getattr(name)
                        .map_err(py_err)?
                        .extract::<f64>()
                        .map_err(|e| {
                            DatasourceError::conversion(format!("{ENVELOPE}.{name}"), e.to_string())
                        })
                };
                // Arguments are evaluated in order, so the first failure stops the remaining reads.
                Ok(Box2d::new(
                    bound("minx")?,
                    bound("miny")?,
                    bound("maxx")?,
                    bound("maxy")?,
                ))
            })
        })
    }

    fn geometry_type(&self) -> DatasourceResult<Option<i64>> {
        self.watch(GEOMETRY_TYPE, || {
            with_gil(|py| match self.param(py, GEOMETRY_TYPE)? {
                Param::Absent | Param::Null => Ok(None),
                Param::Value(value) => extract_i64(&value, GEOMETRY_TYPE).map(Some),
            })
        })
    }

    fn features(&self, query: &Query) -> DatasourceResult<Option<PyFeatureCursor>> {
        self.watch(FEATURES, || {
            with_gil(|py| {
                let callable = self.required_param(py, FEATURES)?;
                let query = Bound::new(py, PyQuery::from(query.clone())).map_err(py_err)?;
                let result = callable.call1((query,)).map_err(py_err)?;
                PyFeatureCursor::try_new(&result)
            })
        })
    }

    fn features_at_point(
        &self,
        point: Coord2d,
        tolerance: f64,
    ) -> DatasourceResult<Option<PyFeatureCursor>> {
        self.watch(FEATURES_AT_POINT, || {
            with_gil(|py| {
                let callable = self.required_param(py, FEATURES_AT_POINT)?;
                let point = Bound::new(py, PyCoord::from(point)).map_err(py_err)?;
                let result = if self.config.forward_point_tolerance {
                    callable.call1((point, tolerance))
                } else {
                    callable.call1((point,))
                }
                .map_err(py_err)?;
                PyFeatureCursor::try_new(&result)
            })
        })
    }
}
