//! Conversion of Python feature-like values into host features.
//!
//! A feature is read either from a mapping or from object attributes, after
//! following `__geo_interface__` if the value provides one. Recognized fields
//! are `id`, `geometry`, and `properties`; all of them are optional.

use std::collections::BTreeMap;

use geobridge_common::error::{DatasourceError, DatasourceResult};
use geobridge_common::feature::{Feature, Value};
use geobridge_common::geometry::Geometry;
use pyo3::exceptions::PyAttributeError;
use pyo3::intern;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyInt, PyMapping, PyString};

use crate::error::py_err;

const GEO_INTERFACE: &str = "__geo_interface__";

fn geo_interface<'py>(value: &Bound<'py, PyAny>) -> DatasourceResult<Bound<'py, PyAny>> {
    let py = value.py();
    if value.hasattr(intern!(py, GEO_INTERFACE)).map_err(py_err)? {
        value.getattr(intern!(py, GEO_INTERFACE)).map_err(py_err)
    } else {
        Ok(value.clone())
    }
}

/// Looks up a field by key for mappings, or by attribute otherwise.
/// A missing field and a `None` field are both `None`.
fn field<'py>(value: &Bound<'py, PyAny>, name: &str) -> DatasourceResult<Option<Bound<'py, PyAny>>> {
    let found = if let Ok(mapping) = value.downcast::<PyMapping>() {
        if mapping.contains(name).map_err(py_err)? {
            Some(mapping.get_item(name).map_err(py_err)?)
        } else {
            None
        }
    } else {
        match value.getattr(name) {
            Ok(v) => Some(v),
            Err(e) if e.is_instance_of::<PyAttributeError>(value.py()) => None,
            Err(e) => return Err(py_err(e)),
        }
    };
    Ok(found.filter(|v| !v.is_none()))
}

pub(crate) fn feature_from_py(value: &Bound<'_, PyAny>, position: i64) -> DatasourceResult<Feature> {
    let value = geo_interface(value)?;
    let id = match field(&value, "id")? {
        Some(id) => id
            .extract::<i64>()
            .map_err(|e| DatasourceError::conversion("feature.id", e.to_string()))?,
        None => position,
    };
    let geometry = field(&value, "geometry")?
        .map(|g| geometry_from_py(&g))
        .transpose()?;
    let attributes = match field(&value, "properties")? {
        Some(properties) => attributes_from_py(&properties)?,
        None => BTreeMap::new(),
    };
    Ok(Feature {
        id,
        geometry,
        attributes,
    })
}

pub(crate) fn geometry_from_py(value: &Bound<'_, PyAny>) -> DatasourceResult<Geometry> {
    let value = geo_interface(value)?;
    pythonize::depythonize(&value)
        .map_err(|e| DatasourceError::conversion("feature.geometry", e.to_string()))
}

fn attributes_from_py(value: &Bound<'_, PyAny>) -> DatasourceResult<BTreeMap<String, Value>> {
    let mapping = value.downcast::<PyMapping>().map_err(|e| {
        DatasourceError::conversion("feature.properties", e.to_string())
    })?;
    let mut attributes = BTreeMap::new();
    for item in mapping.items().map_err(py_err)?.iter() {
        let (key, value): (Bound<PyAny>, Bound<PyAny>) = item.extract().map_err(py_err)?;
        let key = key.str().map_err(py_err)?.to_string();
        let value = value_from_py(&value)
            .map_err(|e| DatasourceError::conversion(format!("feature.properties.{key}"), e.message()))?;
        attributes.insert(key, value);
    }
    Ok(attributes)
}

pub(crate) fn value_from_py(value: &Bound<'_, PyAny>) -> DatasourceResult<Value> {
    if value.is_none() {
        return Ok(Value::Null);
    }
    // `bool` is a subclass of `int` so it must be checked first.
    if let Ok(v) = value.downcast::<PyBool>() {
        return Ok(Value::Bool(v.is_true()));
    }
    if value.is_instance_of::<PyInt>() {
        return match value.extract::<i64>() {
            Ok(v) => Ok(Value::Integer(v)),
            // Integers beyond 64 bits are kept as text.
            Err(_) => Ok(Value::String(value.str().map_err(py_err)?.to_string())),
        };
    }
    if let Ok(v) = value.downcast::<PyFloat>() {
        return Ok(Value::Double(v.value()));
    }
    if value.is_instance_of::<PyString>() {
        return value.extract::<String>().map(Value::String).map_err(py_err);
    }
    Ok(Value::String(value.str().map_err(py_err)?.to_string()))
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use geobridge_common::geometry::Coord2d;
    use pyo3::types::PyDict;

    use super::*;
    use crate::gil::with_gil;

    const FIXTURES: &str = r#"
class Point:
    def __init__(self, x, y):
        self.x, self.y = x, y

    @property
    def __geo_interface__(self):
        return {"type": "Point", "coordinates": (self.x, self.y)}

class Road:
    id = 42
    geometry = {"type": "LineString", "coordinates": [[0, 0], [1, 1.5]]}
    properties = {"name": "Main St", "lanes": 2, "toll": False, "speed": 50.5, "note": None}

class Shaped:
    @property
    def __geo_interface__(self):
        return {"type": "Feature", "id": 9, "geometry": Point(3, 4), "properties": {1: "one"}}

class Broken:
    @property
    def geometry(self):
        raise RuntimeError("geometry unavailable")
"#;

    fn with_fixtures<F, R>(f: F) -> Result<R, String>
    where
        F: for<'py> FnOnce(&Bound<'py, PyModule>) -> DatasourceResult<R>,
    {
        pyo3::prepare_freethreaded_python();
        let code = CString::new(FIXTURES).map_err(|e| e.to_string())?;
        with_gil(|py| {
            let module = PyModule::from_code(py, code.as_c_str(), c"fixtures.py", c"fixtures")
                .map_err(|e| e.to_string())?;
            f(&module).map_err(|e| e.message())
        })
    }

    fn instance<'py>(module: &Bound<'py, PyModule>, class: &str) -> DatasourceResult<Bound<'py, PyAny>> {
        module.getattr(class).and_then(|c| c.call0()).map_err(py_err)
    }

    #[test]
    fn test_feature_from_object_attributes() -> Result<(), String> {
        let feature = with_fixtures(|m| feature_from_py(&instance(m, "Road")?, 1))?;
        assert_eq!(feature.id, 42);
        assert_eq!(
            feature.geometry,
            Some(Geometry::LineString {
                coordinates: vec![Coord2d::new(0.0, 0.0), Coord2d::new(1.0, 1.5)]
            })
        );
        assert_eq!(feature.get("name"), Some(&Value::from("Main St")));
        assert_eq!(feature.get("lanes"), Some(&Value::Integer(2)));
        assert_eq!(feature.get("toll"), Some(&Value::Bool(false)));
        assert_eq!(feature.get("speed"), Some(&Value::Double(50.5)));
        assert_eq!(feature.get("note"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_feature_from_geo_interface() -> Result<(), String> {
        let feature = with_fixtures(|m| feature_from_py(&instance(m, "Shaped")?, 1))?;
        assert_eq!(feature.id, 9);
        assert_eq!(feature.geometry, Some(Geometry::point(3.0, 4.0)));
        assert_eq!(feature.get("1"), Some(&Value::from("one")));
        Ok(())
    }

    #[test]
    fn test_feature_from_dict_uses_position_as_id() -> Result<(), String> {
        let feature = with_fixtures(|m| {
            let py = m.py();
            let properties = PyDict::new(py);
            properties.set_item("big", 1u128 << 70).map_err(py_err)?;
            let dict = PyDict::new(py);
            dict.set_item("properties", properties).map_err(py_err)?;
            dict.set_item("geometry", py.None()).map_err(py_err)?;
            feature_from_py(dict.as_any(), 5)
        })?;
        assert_eq!(feature.id, 5);
        assert_eq!(feature.geometry, None);
        assert_eq!(
            feature.get("big"),
            Some(&Value::from((1u128 << 70).to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_feature_with_unknown_geometry_type() {
        let result = with_fixtures(|m| {
            let py = m.py();
            let geometry = PyDict::new(py);
            geometry.set_item("type", "Circle").map_err(py_err)?;
            geometry.set_item("coordinates", (0, 0)).map_err(py_err)?;
            let dict = PyDict::new(py);
            dict.set_item("geometry", geometry).map_err(py_err)?;
            feature_from_py(dict.as_any(), 1)
        });
        assert!(result.is_err_and(|e| e.contains("feature.geometry")));
    }

    #[test]
    fn test_feature_attribute_error_propagates() {
        let result = with_fixtures(|m| feature_from_py(&instance(m, "Broken")?, 1));
        assert!(result.is_err_and(|e| e.contains("RuntimeError: geometry unavailable")));
    }
}
