use fastrace::trace;
use geobridge_common::config::PythonConfig;
use geobridge_common::datasource::{
    Datasource, DatasourceType, Featureset, FeaturesetRef, GeometryType, LayerDescriptor, Parameters, Query,
};
use geobridge_common::error::{DatasourceError, DatasourceResult};
use geobridge_common::geometry::{Box2d, Coord2d};
use log::debug;
use pyo3::PyObject;

use crate::featureset::ExternalFeatureset;
use crate::object::DatasourceObject;
use crate::python::PyDatasourceObject;

/// A [`Datasource`] backed by a user-supplied datasource object.
///
/// Construction never touches the object. All failures surface on first use.
pub struct ExternalDatasource<O> {
    object: O,
    descriptor: LayerDescriptor,
    params: Parameters,
}

pub type PythonDatasource = ExternalDatasource<PyDatasourceObject>;

impl<O: DatasourceObject> ExternalDatasource<O> {
    pub const NAME: &'static str = "python";
    pub const ENCODING: &'static str = "utf-8";

    pub fn new(object: O) -> Self {
        Self::with_parameters(object, Parameters::new())
    }

    /// Keeps the given parameters alongside the fixed `type` parameter.
    /// A `type` entry in `params` is overwritten.
    pub fn with_parameters(object: O, mut params: Parameters) -> Self {
        params.insert("type", Self::NAME);
        Self {
            object,
            descriptor: LayerDescriptor::new(Self::NAME, Self::ENCODING),
            params,
        }
    }

    pub fn object(&self) -> &O {
        &self.object
    }
}

impl PythonDatasource {
    pub fn from_py(object: PyObject) -> Self {
        Self::new(PyDatasourceObject::new(object))
    }

    pub fn from_py_with_config(object: PyObject, config: PythonConfig) -> Self {
        Self::new(PyDatasourceObject::with_config(object, config))
    }
}

impl<O: DatasourceObject> Datasource for ExternalDatasource<O> {
    #[trace(name = "ExternalDatasource::datasource_type")]
    fn datasource_type(&self) -> DatasourceResult<DatasourceType> {
        let value = self.object.data_type()?;
        DatasourceType::try_from(value)
            .map_err(|e| DatasourceError::conversion("data_type", e.to_string()))
    }

    #[trace(name = "ExternalDatasource::envelope")]
    fn envelope(&self) -> DatasourceResult<Box2d> {
        self.object.envelope()
    }

    #[trace(name = "ExternalDatasource::geometry_type")]
    fn geometry_type(&self) -> DatasourceResult<Option<GeometryType>> {
        self.object
            .geometry_type()?
            .map(|value| {
                GeometryType::try_from(value)
                    .map_err(|e| DatasourceError::conversion("geometry_type", e.to_string()))
            })
            .transpose()
    }

    fn descriptor(&self) -> LayerDescriptor {
        self.descriptor.clone()
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    #[trace(name = "ExternalDatasource::features")]
    fn features(&self, query: &Query) -> DatasourceResult<FeaturesetRef> {
        let envelope = self.envelope()?;
        if !envelope.intersects(&query.bbox) {
            debug!(
                "query {} does not intersect datasource extent {}",
                query.bbox, envelope
            );
            return Ok(None);
        }
        Ok(self
            .object
            .features(query)?
            .map(|cursor| Box::new(ExternalFeatureset::new(cursor)) as Box<dyn Featureset>))
    }

    #[trace(name = "ExternalDatasource::features_at_point")]
    fn features_at_point(&self, point: Coord2d, tolerance: f64) -> DatasourceResult<FeaturesetRef> {
        Ok(self
            .object
            .features_at_point(point, tolerance)?
            .map(|cursor| Box::new(ExternalFeatureset::new(cursor)) as Box<dyn Featureset>))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use geobridge_common::feature::Feature;

    use super::*;
    use crate::object::FeatureCursor;

    struct VecCursor(std::vec::IntoIter<Feature>);

    impl FeatureCursor for VecCursor {
        fn advance(&mut self) -> DatasourceResult<Option<Feature>> {
            Ok(self.0.next())
        }
    }

    #[derive(Default)]
    struct StubObject {
        data_type: Option<i64>,
        envelope: Option<Box2d>,
        geometry_type: Option<i64>,
        features: Option<Vec<Feature>>,
        feature_calls: AtomicUsize,
        point_calls: Mutex<Vec<(Coord2d, f64)>>,
    }

    impl DatasourceObject for StubObject {
        type Cursor = VecCursor;

        fn data_type(&self) -> DatasourceResult<i64> {
            self.data_type
                .ok_or_else(|| DatasourceError::missing("data_type"))
        }

        fn envelope(&self) -> DatasourceResult<Box2d> {
            self.envelope
                .ok_or_else(|| DatasourceError::missing("envelope"))
        }

        fn geometry_type(&self) -> DatasourceResult<Option<i64>> {
            Ok(self.geometry_type)
        }

        fn features(&self, _query: &Query) -> DatasourceResult<Option<VecCursor>> {
            self.feature_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.features.clone().map(|f| VecCursor(f.into_iter())))
        }

        fn features_at_point(
            &self,
            point: Coord2d,
            tolerance: f64,
        ) -> DatasourceResult<Option<VecCursor>> {
            if let Ok(mut calls) = self.point_calls.lock() {
                calls.push((point, tolerance));
            }
            Ok(self.features.clone().map(|f| VecCursor(f.into_iter())))
        }
    }

    fn world() -> Box2d {
        Box2d::new(-10.0, -5.0, 10.0, 5.0)
    }

    #[test]
    fn test_descriptor_and_params() {
        let params: Parameters = [("type", "shape"), ("table", "roads")].into_iter().collect();
        let datasource = ExternalDatasource::with_parameters(StubObject::default(), params);
        let descriptor = datasource.descriptor();
        assert_eq!(descriptor.name, "python");
        assert_eq!(descriptor.encoding, "utf-8");
        assert_eq!(datasource.params().get("type"), Some("python"));
        assert_eq!(datasource.params().get("table"), Some("roads"));
    }

    #[test]
    fn test_datasource_type() {
        let datasource = ExternalDatasource::new(StubObject {
            data_type: Some(1),
            ..Default::default()
        });
        assert_eq!(datasource.datasource_type(), Ok(DatasourceType::Raster));

        let datasource = ExternalDatasource::new(StubObject {
            data_type: Some(9),
            ..Default::default()
        });
        assert!(matches!(
            datasource.datasource_type(),
            Err(DatasourceError::Conversion { ref field, .. }) if field == "data_type"
        ));

        let datasource = ExternalDatasource::new(StubObject::default());
        let error = datasource.datasource_type().err();
        assert!(error.is_some_and(|e| !e.message().is_empty()));
    }

    #[test]
    fn test_geometry_type() {
        let datasource = ExternalDatasource::new(StubObject::default());
        assert_eq!(datasource.geometry_type(), Ok(None));

        let datasource = ExternalDatasource::new(StubObject {
            geometry_type: Some(2),
            ..Default::default()
        });
        assert_eq!(datasource.geometry_type(), Ok(Some(GeometryType::LineString)));

        let datasource = ExternalDatasource::new(StubObject {
            geometry_type: Some(-1),
            ..Default::default()
        });
        assert!(datasource.geometry_type().is_err());
    }

    #[test]
    fn test_disjoint_query_skips_features_call() -> DatasourceResult<()> {
        let datasource = ExternalDatasource::new(StubObject {
            envelope: Some(world()),
            features: Some(vec![Feature::new(1)]),
            ..Default::default()
        });
        let query = Query::new(Box2d::new(20.0, 20.0, 30.0, 30.0));
        assert!(datasource.features(&query)?.is_none());
        assert_eq!(datasource.object().feature_calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_envelope_failure_fails_features() {
        let datasource = ExternalDatasource::new(StubObject {
            features: Some(vec![Feature::new(1)]),
            ..Default::default()
        });
        let query = Query::new(world());
        assert!(datasource.features(&query).is_err());
        assert_eq!(datasource.object().feature_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_intersecting_query_with_none_result() -> DatasourceResult<()> {
        let datasource = ExternalDatasource::new(StubObject {
            envelope: Some(world()),
            ..Default::default()
        });
        let query = Query::new(Box2d::new(0.0, 0.0, 1.0, 1.0));
        assert!(datasource.features(&query)?.is_none());
        assert_eq!(datasource.object().feature_calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_intersecting_query_yields_features() -> DatasourceResult<()> {
        let datasource = ExternalDatasource::new(StubObject {
            envelope: Some(world()),
            features: Some(vec![Feature::new(1), Feature::new(2), Feature::new(3)]),
            ..Default::default()
        });
        let query = Query::new(Box2d::new(0.0, 0.0, 1.0, 1.0));
        let mut featureset = datasource
            .features(&query)?
            .ok_or_else(|| DatasourceError::internal("expected a featureset"))?;
        for _ in 0..3 {
            assert!(featureset.next()?.is_some());
        }
        assert!(featureset.next()?.is_none());
        assert!(featureset.next()?.is_none());
        Ok(())
    }

    #[test]
    fn test_features_at_point_passes_tolerance_to_object() -> DatasourceResult<()> {
        let datasource = ExternalDatasource::new(StubObject {
            features: Some(vec![Feature::new(5)]),
            ..Default::default()
        });
        let mut featureset = datasource
            .features_at_point(Coord2d::new(1.0, 2.0), 0.5)?
            .ok_or_else(|| DatasourceError::internal("expected a featureset"))?;
        assert_eq!(featureset.next()?.map(|f| f.id), Some(5));
        let calls = datasource
            .object()
            .point_calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        assert_eq!(calls, vec![(Coord2d::new(1.0, 2.0), 0.5)]);
        Ok(())
    }
}
