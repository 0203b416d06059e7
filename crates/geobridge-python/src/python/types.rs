//! Host values handed to Python datasources.

use std::collections::BTreeSet;

use geobridge_common::datasource::Query;
use geobridge_common::geometry::{Box2d, Coord2d};
use pyo3::prelude::*;
use pyo3::types::PyDict;

pub const MODULE_NAME: &str = "geobridge";

#[pyclass(name = "Box2d", module = "geobridge", frozen)]
#[derive(Debug, Clone)]
pub struct PyBox2d {
    inner: Box2d,
}

#[pymethods]
impl PyBox2d {
    #[new]
    fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Box2d::new(minx, miny, maxx, maxy).into()
    }

    #[getter]
    fn minx(&self) -> f64 {
        self.inner.minx
    }

    #[getter]
    fn miny(&self) -> f64 {
        self.inner.miny
    }

    #[getter]
    fn maxx(&self) -> f64 {
        self.inner.maxx
    }

    #[getter]
    fn maxy(&self) -> f64 {
        self.inner.maxy
    }

    fn intersects(&self, other: PyRef<'_, PyBox2d>) -> bool {
        self.inner.intersects(&other.inner)
    }

    fn __repr__(&self) -> String {
        format!(
            "Box2d({}, {}, {}, {})",
            self.inner.minx, self.inner.miny, self.inner.maxx, self.inner.maxy
        )
    }
}

impl From<Box2d> for PyBox2d {
    fn from(inner: Box2d) -> Self {
        Self { inner }
    }
}

impl From<PyBox2d> for Box2d {
    fn from(value: PyBox2d) -> Self {
        value.inner
    }
}

#[pyclass(name = "Coord", module = "geobridge", frozen)]
#[derive(Debug, Clone)]
pub struct PyCoord {
    inner: Coord2d,
}

#[pymethods]
impl PyCoord {
    #[new]
    fn new(x: f64, y: f64) -> Self {
        Coord2d::new(x, y).into()
    }

    #[getter]
    fn x(&self) -> f64 {
        self.inner.x
    }

    #[getter]
    fn y(&self) -> f64 {
        self.inner.y
    }

    fn __repr__(&self) -> String {
        format!("Coord({}, {})", self.inner.x, self.inner.y)
    }
}

impl From<Coord2d> for PyCoord {
    fn from(inner: Coord2d) -> Self {
        Self { inner }
    }
}

#[pyclass(name = "Query", module = "geobridge", frozen)]
#[derive(Debug, Clone)]
pub struct PyQuery {
    inner: Query,
}

#[pymethods]
impl PyQuery {
    #[new]
    #[pyo3(signature = (bbox, resolution = (1.0, 1.0), scale_denominator = 1.0, property_names = None))]
    fn new(
        bbox: PyRef<'_, PyBox2d>,
        resolution: (f64, f64),
        scale_denominator: f64,
        property_names: Option<BTreeSet<String>>,
    ) -> Self {
        let mut query = Query::new(bbox.inner)
            .with_resolution(resolution.0, resolution.1)
            .with_scale_denominator(scale_denominator);
        query.property_names = property_names.unwrap_or_default();
        query.into()
    }

    #[getter]
    fn bbox(&self) -> PyBox2d {
        self.inner.bbox.into()
    }

    #[getter]
    fn resolution(&self) -> (f64, f64) {
        self.inner.resolution
    }

    #[getter]
    fn scale_denominator(&self) -> f64 {
        self.inner.scale_denominator
    }

    #[getter]
    fn property_names(&self) -> BTreeSet<String> {
        self.inner.property_names.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "Query(bbox={}, scale_denominator={})",
            self.inner.bbox, self.inner.scale_denominator
        )
    }
}

impl From<Query> for PyQuery {
    fn from(inner: Query) -> Self {
        Self { inner }
    }
}

/// Makes the `geobridge` module importable from Python code.
///
/// The module is created once and stored in `sys.modules`. Later calls
/// return the already registered module.
pub fn register_module(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let modules = py.import("sys")?.getattr("modules")?;
    let modules = modules.downcast::<PyDict>()?;
    if let Some(module) = modules.get_item(MODULE_NAME)? {
        return Ok(module.downcast_into::<PyModule>()?);
    }
    let module = PyModule::new(py, MODULE_NAME)?;
    module.add_class::<PyBox2d>()?;
    module.add_class::<PyCoord>()?;
    module.add_class::<PyQuery>()?;
    module.add("__version__", env!("CARGO_PKG_VERSION"))?;
    modules.set_item(MODULE_NAME, &module)?;
    Ok(module)
}
