//! The datasource interface the map renderer consumes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::DatasourceResult;
use crate::feature::Feature;
use crate::geometry::{Box2d, Coord2d};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i64)]
pub enum DatasourceType {
    Vector = 0,
    Raster = 1,
}

/// The dominant kind of geometry a datasource yields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i64)]
pub enum GeometryType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    Collection = 4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub bbox: Box2d,
    pub resolution: (f64, f64),
    pub scale_denominator: f64,
    pub property_names: BTreeSet<String>,
}

impl Query {
    pub fn new(bbox: Box2d) -> Self {
        Self {
            bbox,
            resolution: (1.0, 1.0),
            scale_denominator: 1.0,
            property_names: BTreeSet::new(),
        }
    }

    pub fn with_resolution(mut self, x: f64, y: f64) -> Self {
        self.resolution = (x, y);
        self
    }

    pub fn with_scale_denominator(mut self, scale_denominator: f64) -> Self {
        self.scale_denominator = scale_denominator;
        self
    }
}

/// Key-value parameters describing how a datasource was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Metadata identifying the kind of a datasource, independent of any instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub encoding: String,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: encoding.into(),
        }
    }
}

impl fmt::Display for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.encoding)
    }
}

/// A forward-only sequence of features satisfying one query.
///
/// Once `next` has returned `Ok(None)` every later call returns `Ok(None)` as well.
pub trait Featureset: Send {
    fn next(&mut self) -> DatasourceResult<Option<Feature>>;
}

/// `None` stands for a featureset that yields nothing.
pub type FeaturesetRef = Option<Box<dyn Featureset>>;

/// Adapts a [`FeaturesetRef`] to [`Iterator`].
///
/// Errors are yielded as items, so iteration can continue past a feature
/// that failed to convert.
pub struct FeaturesetIter {
    inner: FeaturesetRef,
}

impl FeaturesetIter {
    pub fn new(inner: FeaturesetRef) -> Self {
        Self { inner }
    }
}

impl Iterator for FeaturesetIter {
    type Item = DatasourceResult<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().transpose()
    }
}

/// A source of geospatial features.
pub trait Datasource: Send + Sync {
    fn datasource_type(&self) -> DatasourceResult<DatasourceType>;

    fn envelope(&self) -> DatasourceResult<Box2d>;

    fn geometry_type(&self) -> DatasourceResult<Option<GeometryType>>;

    fn descriptor(&self) -> LayerDescriptor;

    fn params(&self) -> &Parameters;

    fn features(&self, query: &Query) -> DatasourceResult<FeaturesetRef>;

    fn features_at_point(&self, point: Coord2d, tolerance: f64)
        -> DatasourceResult<FeaturesetRef>;
}
