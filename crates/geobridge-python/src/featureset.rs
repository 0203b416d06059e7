use geobridge_common::datasource::Featureset;
use geobridge_common::error::DatasourceResult;
use geobridge_common::feature::Feature;
use log::trace;

use crate::object::FeatureCursor;

enum CursorState<C> {
    Active(C),
    Exhausted,
}

/// A featureset over a cursor produced by a datasource object.
///
/// The cursor is dropped as soon as it reports its end, and the featureset
/// answers every later `next` call without touching the cursor again.
pub struct ExternalFeatureset<C> {
    state: CursorState<C>,
    yielded: usize,
}

impl<C: FeatureCursor> ExternalFeatureset<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            state: CursorState::Active(cursor),
            yielded: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }
}

impl<C: FeatureCursor> Featureset for ExternalFeatureset<C> {
    fn next(&mut self) -> DatasourceResult<Option<Feature>> {
        let CursorState::Active(cursor) = &mut self.state else {
            return Ok(None);
        };
        match cursor.advance() {
            Ok(Some(feature)) => {
                self.yielded += 1;
                Ok(Some(feature))
            }
            Ok(None) => {
                trace!("featureset exhausted after {} features", self.yielded);
                self.state = CursorState::Exhausted;
                Ok(None)
            }
            Err(e) => {
                if cursor.is_finished() {
                    trace!("featureset failed after {} features", self.yielded);
                    self.state = CursorState::Exhausted;
                }
                Err(e)
            }
        }
    }
}
