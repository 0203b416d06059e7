use geobridge_common::datasource::Query;
use geobridge_common::error::DatasourceResult;
use geobridge_common::feature::Feature;
use geobridge_common::geometry::{Box2d, Coord2d};

/// The contract a user-supplied datasource object fulfils.
///
/// Each method corresponds to one attribute of the object. Raw integer
/// classifications are returned as is; turning them into host enums is
/// left to the adapter.
pub trait DatasourceObject: Send + Sync {
    type Cursor: FeatureCursor + 'static;

    /// The `data_type` attribute. It must be present.
    fn data_type(&self) -> DatasourceResult<i64>;

    /// The four bounds of the `envelope` attribute, read in
    /// `minx`, `miny`, `maxx`, `maxy` order. The first bound that
    /// cannot be read fails the whole call.
    fn envelope(&self) -> DatasourceResult<Box2d>;

    /// The `geometry_type` attribute, or `None` when it is absent or null.
    fn geometry_type(&self) -> DatasourceResult<Option<i64>>;

    /// Calls `features(query)`. `None` means the object returned no features.
    fn features(&self, query: &Query) -> DatasourceResult<Option<Self::Cursor>>;

    /// Calls `features_at_point(point)`.
    /// Implementations decide whether the tolerance is passed along.
    fn features_at_point(
        &self,
        point: Coord2d,
        tolerance: f64,
    ) -> DatasourceResult<Option<Self::Cursor>>;
}

/// A forward-only walk over the elements of an iterable returned by a datasource object.
pub trait FeatureCursor: Send {
    /// Moves to the next element and converts it.
    /// `Ok(None)` signals the end of the iterable.
    fn advance(&mut self) -> DatasourceResult<Option<Feature>>;

    /// Whether the cursor can never produce another element, e.g. after
    /// the underlying iterable raised.
    fn is_finished(&self) -> bool {
        false
    }
}
