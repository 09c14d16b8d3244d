//! CRS tags, the few projections the pipeline needs, and the combined dataset.

use std::f64::consts::PI;
use std::fmt;

use geo::{Coord, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Latitude limit of the Web Mercator square.
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    Wgs84,
    WebMercator,
    Other(u32),
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Other(code) => *code,
        }
    }

    pub fn from_epsg(code: u32) -> Self {
        match code {
            4326 => Crs::Wgs84,
            3857 | 900913 => Crs::WebMercator,
            other => Crs::Other(other),
        }
    }

    /// Reprojects a coordinate from `self` into `target`.
    pub fn transform(&self, target: Crs, coord: Coord<f64>) -> std::result::Result<Coord<f64>, GeometryError> {
        if *self == target {
            return Ok(coord);
        }
        match (self, target) {
            (Crs::Wgs84, Crs::WebMercator) => Ok(wgs84_to_web_mercator(coord)),
            (Crs::WebMercator, Crs::Wgs84) => Ok(web_mercator_to_wgs84(coord)),
            _ => Err(GeometryError::UnsupportedTransform {
                from: self.epsg(),
                to: target.epsg(),
            }),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

pub fn wgs84_to_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
    }
}

pub fn web_mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees(),
    }
}

/// Lambert cylindrical equal-area on the sphere, from degrees.
pub fn wgs84_to_equal_area(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * coord.y.to_radians().sin(),
    }
}

pub fn equal_area_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (coord.y / EARTH_RADIUS_M).clamp(-1.0, 1.0).asin().to_degrees(),
    }
}

/// Detections as a frame plus one point geometry per row.
#[derive(Debug, Clone)]
pub struct DetectionDataset {
    frame: DataFrame,
    points: Vec<Point<f64>>,
    crs: Crs,
}

impl DetectionDataset {
    pub fn new(frame: DataFrame, points: Vec<Point<f64>>, crs: Crs) -> Result<Self> {
        if points.len() != frame.height() {
            return Err(GeometryError::LengthMismatch {
                points: points.len(),
                rows: frame.height(),
            }
            .into());
        }
        Ok(Self { frame, points, crs })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_crs(&self, target: Crs) -> Result<Self> {
        if target == self.crs {
            return Ok(self.clone());
        }
        let points = self
            .points
            .iter()
            .map(|point| self.crs.transform(target, point.0).map(Point::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            frame: self.frame.clone(),
            points,
            crs: target,
        })
    }

    /// Keeps the rows whose mask entry is true, in their original order.
    pub fn filter_mask(&self, mask: &[bool]) -> Result<Self> {
        let mask_ca = BooleanChunked::from_slice("mask".into(), mask);
        let frame = self.frame.filter(&mask_ca)?;
        let points = self
            .points
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(point, _)| *point)
            .collect();
        Self::new(frame, points, self.crs)
    }

    /// Renders one Point feature per row with every column as a property.
    pub fn to_feature_collection(&self) -> Result<FeatureCollection> {
        let columns = self.frame.get_columns();
        let mut features = Vec::with_capacity(self.len());

        for (idx, point) in self.points.iter().enumerate() {
            let mut properties = JsonObject::new();
            for column in columns {
                let value = column.get(idx)?;
                properties.insert(column.name().to_string(), any_value_to_json(&value));
            }
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![point.x(), point.y()]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

fn any_value_to_json(value: &AnyValue<'_>) -> JsonValue {
    match value {
        AnyValue::Null => JsonValue::Null,
        AnyValue::Boolean(v) => JsonValue::from(*v),
        AnyValue::String(v) => JsonValue::from(*v),
        AnyValue::StringOwned(v) => JsonValue::from(v.as_str()),
        AnyValue::UInt32(v) => JsonValue::from(*v),
        AnyValue::UInt64(v) => JsonValue::from(*v),
        AnyValue::Int32(v) => JsonValue::from(*v),
        AnyValue::Int64(v) => JsonValue::from(*v),
        AnyValue::Float32(v) => JsonValue::from(f64::from(*v)),
        AnyValue::Float64(v) => JsonValue::from(*v),
        other => JsonValue::from(other.to_string()),
    }
}
