use std::error::Error;
use std::io::Write;

use geobridge_common::datasource::{Datasource, FeaturesetIter, FeaturesetRef};
use serde_json::json;

/// Writes one JSON object describing the datasource.
pub fn write_description(out: &mut impl Write, datasource: &dyn Datasource) -> Result<(), Box<dyn Error>> {
    let descriptor = datasource.descriptor();
    let params = datasource
        .params()
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect::<serde_json::Map<_, _>>();
    let value = json!({
        "name": descriptor.name,
        "encoding": descriptor.encoding,
        "params": params,
        "type": datasource.datasource_type()?,
        "geometry_type": datasource.geometry_type()?,
    });
    serde_json::to_writer(&mut *out, &value)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_envelope(out: &mut impl Write, datasource: &dyn Datasource) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer(&mut *out, &datasource.envelope()?)?;
    writeln!(out)?;
    Ok(())
}

/// Writes features as JSON lines and returns how many were written.
/// The first error stops the output.
pub fn write_features(
    out: &mut impl Write,
    featureset: FeaturesetRef,
    limit: Option<usize>,
) -> Result<usize, Box<dyn Error>> {
    let mut count = 0;
    for feature in FeaturesetIter::new(featureset).take(limit.unwrap_or(usize::MAX)) {
        serde_json::to_writer(&mut *out, &feature?)?;
        writeln!(out)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use geobridge_common::datasource::Featureset;
    use geobridge_common::error::{DatasourceError, DatasourceResult};
    use geobridge_common::feature::Feature;
    use geobridge_common::geometry::Geometry;

    use super::*;

    struct Scripted(Vec<DatasourceResult<Feature>>);

    impl Featureset for Scripted {
        fn next(&mut self) -> DatasourceResult<Option<Feature>> {
            if self.0.is_empty() {
                return Ok(None);
            }
            self.0.remove(0).map(Some)
        }
    }

    #[test]
    fn test_write_features_as_json_lines() -> Result<(), Box<dyn Error>> {
        let features = vec![
            Ok(Feature::new(1).with_geometry(Geometry::point(1.0, 2.0))),
            Ok(Feature::new(2).with_attribute("name", "b")),
            Ok(Feature::new(3)),
        ];
        let mut out = vec![];
        let count = write_features(&mut out, Some(Box::new(Scripted(features))), Some(2))?;
        assert_eq!(count, 2);
        let text = String::from_utf8(out)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(first["id"], 1);
        assert_eq!(first["geometry"]["type"], "Point");
        Ok(())
    }

    #[test]
    fn test_write_features_stops_at_error() {
        let features = vec![
            Ok(Feature::new(1)),
            Err(DatasourceError::python("ValueError: bad row")),
            Ok(Feature::new(3)),
        ];
        let mut out = vec![];
        let result = write_features(&mut out, Some(Box::new(Scripted(features))), None);
        assert!(result.is_err_and(|e| e.to_string().contains("bad row")));
        assert_eq!(String::from_utf8_lossy(&out).lines().count(), 1);
    }

    #[test]
    fn test_write_features_empty() -> Result<(), Box<dyn Error>> {
        let mut out = vec![];
        assert_eq!(write_features(&mut out, None, None)?, 0);
        assert!(out.is_empty());
        Ok(())
    }
}
