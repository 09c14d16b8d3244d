//! Country boundary lookup and the equal-area centroid.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use geo::{Centroid, Coord, LineString, MapCoords, MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, ResolutionError, Result};
use crate::fetch::ContentFetcher;
use crate::geometry::{equal_area_to_wgs84, wgs84_to_equal_area, Crs};

pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

/// ISO 3166-1 alpha-2 code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(value: &str) -> std::result::Result<Self, ResolutionError> {
        let trimmed = value.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(ResolutionError::InvalidCountryCode(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CountryCode {
    type Error = ResolutionError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        CountryCode::parse(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// `[lat, lon]`, the order map widgets expect for a center.
    pub fn to_array(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygonSet {
    pub display_name: String,
    pub polygons: MultiPolygon<f64>,
    pub crs: Crs,
}

impl BoundaryPolygonSet {
    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    pub fn to_crs(&self, target: Crs) -> Result<Self> {
        if target == self.crs {
            return Ok(self.clone());
        }
        let source = self.crs;
        let polygons = self
            .polygons
            .try_map_coords(|coord| source.transform(target, coord))?;
        Ok(Self {
            display_name: self.display_name.clone(),
            polygons,
            crs: target,
        })
    }

    /// Area-weighted centroid computed in an equal-area projection.
    pub fn centroid(&self) -> Result<LatLon> {
        let geographic = self.to_crs(Crs::Wgs84)?;
        equal_area_centroid(&geographic.polygons).ok_or_else(|| {
            PipelineError::Validation(format!("boundary '{}' has no area", self.display_name))
        })
    }
}

/// `polygons` must be in EPSG:4326.
pub fn equal_area_centroid(polygons: &MultiPolygon<f64>) -> Option<LatLon> {
    let projected = polygons.map_coords(wgs84_to_equal_area);
    let center = projected.centroid()?;
    let geographic = equal_area_to_wgs84(center.0);
    Some(LatLon {
        lat: geographic.y,
        lon: geographic.x,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBoundary {
    pub boundary: BoundaryPolygonSet,
    pub centroid: LatLon,
}

#[async_trait]
pub trait BoundaryResolver: Send + Sync {
    async fn resolve(&self, country: &CountryCode) -> std::result::Result<ResolvedBoundary, ResolutionError>;
}

pub fn nominatim_search_url(country: &CountryCode) -> String {
    format!(
        "{NOMINATIM_SEARCH_URL}?q={country}&featureType=country&namedetails=1&polygon_geojson=1&hierarchy=1&addresstype=country&format=geojson"
    )
}

/// Collects every Polygon/MultiPolygon of a Nominatim GeoJSON search result.
pub fn parse_boundary_geojson(
    text: &str,
    country: &CountryCode,
) -> std::result::Result<BoundaryPolygonSet, ResolutionError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|err: geojson::Error| ResolutionError::MalformedGeoJson(err.to_string()))?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(ResolutionError::MalformedGeoJson(
                "expected a FeatureCollection".to_string(),
            ))
        }
    };

    let display_name = features
        .first()
        .and_then(|feature| feature.property("display_name"))
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| country.to_string());

    let mut polygons = Vec::new();
    for feature in &features {
        if let Some(geometry) = &feature.geometry {
            collect_polygons(geometry, &mut polygons)?;
        }
    }

    if polygons.is_empty() {
        return Err(ResolutionError::NotFound(country.to_string()));
    }

    Ok(BoundaryPolygonSet {
        display_name,
        polygons: MultiPolygon(polygons),
        crs: Crs::Wgs84,
    })
}

fn collect_polygons(
    geometry: &Geometry,
    out: &mut Vec<Polygon<f64>>,
) -> std::result::Result<(), ResolutionError> {
    match &geometry.value {
        Value::Polygon(rings) => out.push(polygon_from_rings(rings)?),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(polygon_from_rings(rings)?);
            }
        }
        Value::GeometryCollection(geometries) => {
            for inner in geometries {
                collect_polygons(inner, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Polygon<f64>, ResolutionError> {
    let mut rings = rings.iter().map(|ring| line_string(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| ResolutionError::MalformedGeoJson("polygon without rings".to_string()))??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn line_string(positions: &[Vec<f64>]) -> std::result::Result<LineString<f64>, ResolutionError> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(ResolutionError::MalformedGeoJson(
                "position with fewer than two coordinates".to_string(),
            )),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Resolves boundaries through the public Nominatim search endpoint.
pub struct NominatimResolver {
    fetcher: Arc<dyn ContentFetcher>,
}

impl NominatimResolver {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl BoundaryResolver for NominatimResolver {
    async fn resolve(&self, country: &CountryCode) -> std::result::Result<ResolvedBoundary, ResolutionError> {
        let body = self.fetcher.fetch(&nominatim_search_url(country)).await?;
        let boundary = parse_boundary_geojson(&body, country)?;
        let centroid = equal_area_centroid(&boundary.polygons)
            .ok_or_else(|| ResolutionError::NotFound(country.to_string()))?;
        info!(
            country = %country,
            polygons = boundary.polygons.0.len(),
            display_name = %boundary.display_name,
            "resolved country boundary"
        );
        Ok(ResolvedBoundary { boundary, centroid })
    }
}
