//! Presents a Python object as a [`Datasource`](geobridge_common::datasource::Datasource).
//!
//! The Python object is expected to expose these attributes:
//!
//! ```python
//! class MyDatasource:
//!     data_type = 0                     # 0 = vector, 1 = raster
//!     geometry_type = 1                 # optional; absent or None means no hint
//!     envelope = Box2d(-10, -5, 10, 5)  # anything with minx/miny/maxx/maxy
//!
//!     def features(self, query):        # -> iterable of features, or None
//!         ...
//!
//!     def features_at_point(self, point):
//!         ...
//! ```
//!
//! Every interaction with the object happens while holding the GIL, and every
//! Python exception is turned into a [`DatasourceError`](geobridge_common::error::DatasourceError).

mod datasource;
mod error;
mod featureset;
mod gil;
mod object;
mod python;

pub use datasource::{ExternalDatasource, PythonDatasource};
pub use error::{format_py_error_with_traceback, py_err};
pub use featureset::ExternalFeatureset;
pub use gil::{gil_stats, with_gil, GilStatsSnapshot};
pub use object::{DatasourceObject, FeatureCursor};
pub use python::{register_module, PyBox2d, PyCoord, PyDatasourceObject, PyFeatureCursor, PyQuery};
