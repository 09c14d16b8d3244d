use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::NormalizeError;
use crate::formats::schema::{
    ACQ_DATETIME, ACQ_TIME, BRIGHTNESS_A, BRIGHTNESS_B, DAYS_AGO, HIGH_CONFIDENCE,
};
use crate::formats::{pad_acq_time, recency_ranks, CategoricalConfidenceSchema};
use crate::model::{ConfidenceScale, SensorProduct};
use crate::registry::ConfidenceSchema;
use crate::{normalize_feed, normalize_with_schemas};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn datetime(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("valid datetime")
}

#[test]
fn normalizes_modis_percent_feed() {
    let feed = normalize_feed(&fixture("modis_nrt.csv"), date(2024, 1, 3))
        .expect("MODIS feed should normalize");

    assert_eq!(feed.scale, ConfidenceScale::Percent);
    assert!(feed.schema_attempts.is_empty());
    assert_eq!(feed.height(), 3);
    assert_eq!(feed.high_confidence_count().unwrap(), 2);

    let records = feed.records().expect("records");
    assert!(records[0].high_confidence);
    assert!(!records[1].high_confidence);
    assert!(records[2].high_confidence);
    assert_eq!(records[0].brightness_a, Some(320.5));
    assert_eq!(records[0].brightness_b, Some(295.1));
    assert_eq!(records[0].acquisition_datetime, datetime("2024-01-02 09:30:00"));
    assert_eq!(records[2].acquisition_datetime, datetime("2024-01-03 00:45:00"));
    assert_eq!(records[0].version.as_deref(), Some("6.1NRT"));

    assert!(feed.frame.column("brightness").is_err());
    assert!(feed.frame.column("bright_t31").is_err());
    assert!(feed.frame.column(BRIGHTNESS_A).is_ok());
    assert!(feed.frame.column(BRIGHTNESS_B).is_ok());
    assert!(feed.frame.column("daynight").is_ok());
}

#[test]
fn normalizes_viirs_categorical_feed() {
    let feed = normalize_feed(&fixture("viirs_noaa20_nrt.csv"), date(2024, 1, 3))
        .expect("VIIRS feed should normalize");

    assert_eq!(feed.scale, ConfidenceScale::Categorical);
    assert_eq!(feed.schema_attempts.len(), 1);
    assert_eq!(feed.schema_attempts[0].schema, "PERCENT_CONFIDENCE");

    let flags: Vec<Option<bool>> = feed
        .frame
        .column(HIGH_CONFIDENCE)
        .unwrap()
        .bool()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(flags, vec![Some(true), Some(true), Some(false)]);

    let records = feed.records().unwrap();
    assert_eq!(records[0].brightness_a, Some(330.1));
    assert_eq!(records[0].brightness_b, Some(290.7));
    assert!(feed.frame.column("bright_ti4").is_err());
}

#[test]
fn only_exact_nominal_and_high_labels_are_high_confidence() {
    let content = "latitude,longitude,acq_date,acq_time,satellite,confidence,version\n\
                   1.0,2.0,2024-01-03,1200,N,h,2.0NRT\n\
                   1.0,2.1,2024-01-03,1201,N,HIGH,2.0NRT\n\
                   1.0,2.2,2024-01-03,1202,N,n,2.0NRT\n\
                   1.0,2.3,2024-01-03,1203,N,Nominal,2.0NRT\n\
                   1.0,2.4,2024-01-03,1204,N,high,2.0NRT\n\
                   1.0,2.5,2024-01-03,1205,N,nominal,2.0NRT\n\
                   1.0,2.6,2024-01-03,1206,N,low,2.0NRT\n";
    let feed = normalize_feed(content, date(2024, 1, 3)).unwrap();
    assert_eq!(feed.scale, ConfidenceScale::Categorical);

    let flags: Vec<bool> = feed
        .records()
        .unwrap()
        .iter()
        .map(|record| record.high_confidence)
        .collect();
    assert_eq!(flags, vec![false, false, false, false, true, true, false]);

    let schema = CategoricalConfidenceSchema;
    assert!(schema.is_high_confidence(" high "));
    assert!(!schema.is_high_confidence("H"));
}

#[test]
fn days_ago_is_zero_when_latest_date_is_today() {
    let feed = normalize_feed(&fixture("modis_nrt.csv"), date(2024, 1, 3)).unwrap();
    let ranks: Vec<Option<u32>> = feed
        .frame
        .column(DAYS_AGO)
        .unwrap()
        .u32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ranks, vec![Some(1), Some(2), Some(0)]);
}

#[test]
fn days_ago_starts_at_one_for_stale_feeds() {
    let feed = normalize_feed(&fixture("modis_nrt.csv"), date(2024, 1, 5)).unwrap();
    let records = feed.records().unwrap();
    let ranks: Vec<u32> = records.iter().map(|r| r.days_ago).collect();
    assert_eq!(ranks, vec![2, 3, 1]);
}

#[test]
fn recency_ranks_are_dense() {
    let dates = vec![
        date(2024, 1, 2),
        date(2024, 1, 2),
        date(2023, 12, 30),
        date(2024, 1, 4),
    ];
    assert_eq!(recency_ranks(&dates, date(2024, 1, 4)), vec![1, 1, 2, 0]);
    assert_eq!(recency_ranks(&dates, date(2024, 1, 9)), vec![2, 2, 3, 1]);
    assert!(recency_ranks(&[], date(2024, 1, 9)).is_empty());
}

#[test]
fn acquisition_time_is_zero_padded() {
    assert_eq!(pad_acq_time("5"), "0005");
    assert_eq!(pad_acq_time("930"), "0930");
    assert_eq!(pad_acq_time("1345"), "1345");

    let content = "latitude,longitude,acq_date,acq_time,satellite,confidence,version\n\
                   1.0,2.0,2024-03-01,5,Aqua,90,6.1NRT\n";
    let feed = normalize_feed(content, date(2024, 3, 1)).unwrap();
    let records = feed.records().unwrap();
    assert_eq!(records[0].acquisition_datetime, datetime("2024-03-01 00:05:00"));

    let padded: Vec<Option<&str>> = feed
        .frame
        .column(ACQ_TIME)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(padded, vec![Some("0005")]);
    assert!(feed.frame.column(ACQ_DATETIME).is_ok());
}

#[test]
fn missing_confidence_column_is_a_schema_error() {
    let content = "latitude,longitude,acq_date,acq_time,satellite\n1.0,2.0,2024-03-01,1200,Aqua\n";
    match normalize_feed(content, date(2024, 3, 1)) {
        Err(err @ NormalizeError::MissingColumns { .. }) => {
            assert!(err.is_schema_error());
            if let NormalizeError::MissingColumns { missing } = err {
                assert_eq!(missing, vec!["confidence".to_string()]);
            }
        }
        other => panic!("expected missing columns error, got {other:?}"),
    }
}

#[test]
fn empty_content_reports_missing_columns() {
    match normalize_feed("", date(2024, 3, 1)) {
        Err(NormalizeError::MissingColumns { missing }) => assert_eq!(missing.len(), 4),
        other => panic!("expected missing columns error, got {other:?}"),
    }
}

#[test]
fn unparseable_time_is_rejected() {
    let content = "latitude,longitude,acq_date,acq_time,satellite,confidence\n\
                   1.0,2.0,2024-03-01,2575,Aqua,90\n";
    match normalize_feed(content, date(2024, 3, 1)) {
        Err(NormalizeError::Timestamp { line_index, value }) => {
            assert_eq!(line_index, 2);
            assert_eq!(value, "2024-03-01 2575");
        }
        other => panic!("expected timestamp error, got {other:?}"),
    }
}

#[test]
fn bad_coordinate_is_a_row_error() {
    let content = "latitude,longitude,acq_date,acq_time,satellite,confidence\n\
                   1.0,2.0,2024-03-01,1200,Aqua,90\n\
                   north,2.0,2024-03-01,1210,Aqua,90\n";
    match normalize_feed(content, date(2024, 3, 1)) {
        Err(err @ NormalizeError::DataRow { .. }) => {
            assert!(!err.is_schema_error());
            if let NormalizeError::DataRow {
                line_index, column, ..
            } = err
            {
                assert_eq!(line_index, 3);
                assert_eq!(column, "latitude");
            }
        }
        other => panic!("expected data row error, got {other:?}"),
    }
}

#[test]
fn text_column_with_numeric_values_is_categorical() {
    let feed = normalize_feed(&fixture("mixed_confidence.csv"), date(2024, 1, 2)).unwrap();

    assert_eq!(feed.scale, ConfidenceScale::Categorical);
    assert_eq!(feed.schema_attempts.len(), 1);
    assert_eq!(feed.schema_attempts[0].schema, "PERCENT_CONFIDENCE");

    let records = feed.records().unwrap();
    assert!(records[0].high_confidence);
    assert!(!records[1].high_confidence);
    assert_eq!(records[0].brightness_a, Some(300.0));
    assert_eq!(records[0].brightness_b, Some(290.1));
    assert!(feed.frame.column("bright_ti4").is_err());
}

#[test]
fn blank_confidence_column_is_read_as_percent() {
    let content = "latitude,longitude,brightness,bright_t31,acq_date,acq_time,satellite,confidence,version\n\
                   9.5,2.3,320.5,295.1,2024-01-02,930,Aqua,,6.1NRT\n\
                   10.1,1.9,310.2,290.3,2024-01-01,1345,Terra,,6.1NRT\n";
    let feed = normalize_feed(content, date(2024, 1, 2)).unwrap();

    assert_eq!(feed.scale, ConfidenceScale::Percent);
    assert!(feed.schema_attempts.is_empty());
    assert_eq!(feed.high_confidence_count().unwrap(), 0);
    assert!(feed.frame.column(BRIGHTNESS_A).is_ok());
    assert!(feed.frame.column("brightness").is_err());
}

#[test]
fn custom_schema_order_is_respected() {
    let categorical = CategoricalConfidenceSchema;
    let schemas: [&dyn ConfidenceSchema; 1] = [&categorical];
    let feed = normalize_with_schemas(&fixture("modis_nrt.csv"), date(2024, 1, 3), &schemas)
        .expect("unrecognized feeds still normalize");

    assert_eq!(feed.scale, ConfidenceScale::Unrecognized);
    assert_eq!(feed.schema_attempts.len(), 1);
    assert_eq!(feed.schema_attempts[0].schema, "CATEGORICAL_CONFIDENCE");
}

#[test]
fn sensor_products_round_trip_through_names() {
    for product in SensorProduct::ALL {
        assert_eq!(SensorProduct::try_from(product.as_str()), Ok(product));
    }
    assert_eq!(
        SensorProduct::try_from("viirs_snpp_nrt"),
        Ok(SensorProduct::ViirsSnppNrt)
    );
    assert!(SensorProduct::try_from("LANDSAT_NRT").is_err());
}
