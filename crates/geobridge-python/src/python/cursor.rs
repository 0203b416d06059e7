use geobridge_common::error::DatasourceResult;
use geobridge_common::feature::Feature;
use pyo3::prelude::*;
use pyo3::types::PyIterator;

use crate::error::py_err;
use crate::gil::with_gil;
use crate::object::FeatureCursor;
use crate::python::conversion::feature_from_py;

/// A cursor over a Python iterator.
///
/// The iterator reference is only ever released with the GIL held, since
/// releasing it may run finalizers of a generator.
pub struct PyFeatureCursor {
    iterator: Option<Py<PyIterator>>,
    position: i64,
}

impl PyFeatureCursor {
    /// Returns `None` if `iterable` is Python `None`.
    /// The caller must hold the GIL, which `iterable` proves.
    pub fn try_new(iterable: &Bound<'_, PyAny>) -> DatasourceResult<Option<Self>> {
        if iterable.is_none() {
            return Ok(None);
        }
        let iterator = iterable.try_iter().map_err(py_err)?;
        Ok(Some(Self {
            iterator: Some(iterator.unbind()),
            position: 0,
        }))
    }

    fn release(&mut self) {
        if let Some(iterator) = self.iterator.take() {
            with_gil(|_| drop(iterator));
        }
    }
}

impl FeatureCursor for PyFeatureCursor {
    fn advance(&mut self) -> DatasourceResult<Option<Feature>> {
        if self.is_finished() {
            return Ok(None);
        }
        with_gil(|py| {
            let next = match &self.iterator {
                Some(iterator) => iterator.bind(py).clone().next(),
                None => return Ok(None),
            };
            match next {
                None => {
                    self.release();
                    Ok(None)
                }
                Some(Err(e)) => {
                    // A Python iterator that raised is finished.
                    self.release();
                    Err(py_err(e))
                }
                Some(Ok(item)) => {
                    self.position += 1;
                    feature_from_py(&item, self.position).map(Some)
                }
            }
        })
    }

    fn is_finished(&self) -> bool {
        self.iterator.is_none()
    }
}

impl Drop for PyFeatureCursor {
    fn drop(&mut self) {
        self.release();
    }
}
