use geo::Intersects;
use tracing::info;

use crate::boundary::BoundaryPolygonSet;
use crate::error::{PipelineError, Result};
use crate::geometry::DetectionDataset;

/// Detections lying within any boundary polygon, in original order. Points on a
/// polygon edge or vertex count as inside.
pub fn filter_within_boundary(
    dataset: &DetectionDataset,
    boundary: &BoundaryPolygonSet,
) -> Result<DetectionDataset> {
    if dataset.is_empty() {
        return Err(PipelineError::Validation(
            "cannot filter an empty detection dataset".to_string(),
        ));
    }
    if boundary.is_empty() {
        return Err(PipelineError::Validation(format!(
            "boundary '{}' has no polygons",
            boundary.display_name
        )));
    }

    let projected = dataset.to_crs(boundary.crs)?;
    let mask: Vec<bool> = projected
        .points()
        .iter()
        .map(|point| {
            boundary
                .polygons
                .0
                .iter()
                .any(|polygon| polygon.intersects(point))
        })
        .collect();

    let filtered = dataset.filter_mask(&mask)?;
    info!(
        boundary = %boundary.display_name,
        total = dataset.len(),
        retained = filtered.len(),
        "filtered detections to boundary"
    );
    Ok(filtered)
}
