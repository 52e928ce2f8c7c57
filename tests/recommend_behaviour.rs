//! End-to-end coverage for loading telemetry and priors from disk and ranking
//! study locations.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use chrono::{Duration, NaiveDate};
use flate2::write::GzEncoder;
use flate2::Compression;
use rstest::{fixture, rstest};
use seat_advisor::{
    load_priors, recommend, recommend_cancellable, AdvisorError, AdvisorQuery, Campus,
    TelemetryTable,
};
use tempfile::TempDir;

const HEADER: &str = "t10,building_id,location_id,is_hill,relative_availability,longname";

/// Temporary directory for each test.
#[fixture]
fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("create temporary directory: {err}"),
    }
}

/// Two locations observed during ISO week 3 of 2024: a quiet valley reading
/// room and a crowded hill library.
#[fixture]
fn two_campus_csv() -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .expect("valid start");
    let mut csv = format!("{HEADER}\n");
    for i in 0..250 {
        let at = start + Duration::minutes(10 * i);
        let _ = writeln!(csv, "{},6,1,0,0.8,Reading Room", at.format("%Y-%m-%d %H:%M:%S"));
    }
    for i in 0..201 {
        let at = start + Duration::minutes(10 * i);
        let _ = writeln!(csv, "{},7,2,1,0.05,", at.format("%Y-%m-%d %H:%M:%S"));
    }
    csv
}

fn write_plain(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn write_gzip(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).expect("create gzip fixture");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(contents.as_bytes())
        .expect("write gzip fixture");
    encoder.finish().expect("finish gzip fixture");
    path
}

/// Write `parts` as consecutive gzip members of a single file, the way
/// concatenated exports and appended logs are laid out.
fn write_gzip_members(dir: &TempDir, name: &str, parts: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).expect("create gzip fixture");
    for part in parts {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(part.as_bytes())
            .expect("write gzip member");
        let member = encoder.finish().expect("finish gzip member");
        file.write_all(&member).expect("append gzip member");
    }
    path
}

fn load_table(path: &Path) -> TelemetryTable {
    TelemetryTable::load(path).expect("load telemetry")
}

fn valley_query() -> AdvisorQuery {
    AdvisorQuery {
        home_campus: Some(Campus::Valley),
        ..AdvisorQuery::default()
    }
}

#[rstest]
#[case("telemetry.csv", false)]
#[case("telemetry.csv.gz", true)]
fn ranks_locations_from_plain_and_gzip_files(
    temp_dir: TempDir,
    two_campus_csv: String,
    #[case] name: &str,
    #[case] gzipped: bool,
) {
    let path = if gzipped {
        write_gzip(&temp_dir, name, &two_campus_csv)
    } else {
        write_plain(&temp_dir, name, &two_campus_csv)
    };
    let table = load_table(&path);
    assert_eq!(table.len(), 451);

    let rows = recommend(&table, &valley_query(), None, None).expect("recommend");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].location_id, 1);
    assert_eq!(rows[0].location_name, "Reading Room");
    assert_eq!(rows[0].building_name, "Lernzentrum Tal");
    assert!((rows[0].final_score - 0.605).abs() < 1e-9);
    assert_eq!(rows[1].location_id, 2);
    assert_eq!(rows[1].location_name, "Location 2");
    assert_eq!(rows[1].building_name, "Lernzentrum Morgenstelle");
    assert!((rows[1].final_score - 0.06125).abs() < 1e-9);
}

#[rstest]
fn every_gzip_member_is_loaded(temp_dir: TempDir) {
    let path = write_gzip_members(
        &temp_dir,
        "appended.csv.gz",
        &[
            &format!("{HEADER}\n2024-01-15 08:00:00,6,1,0,0.8,Reading Room\n"),
            "2024-01-15 08:10:00,6,1,0,0.7,Reading Room\n",
            "2024-01-15 08:20:00,7,2,1,0.1,\n",
        ],
    );

    let table = load_table(&path);

    assert_eq!(table.len(), 3);
    let query = AdvisorQuery {
        min_observations: 1,
        ..valley_query()
    };
    let rows = recommend(&table, &query, None, None).expect("recommend");
    let counts: Vec<(i64, usize)> = rows
        .iter()
        .map(|row| (row.location_id, row.observation_count))
        .collect();
    assert_eq!(counts, vec![(1, 2), (2, 1)]);
}

#[rstest]
fn top_one_keeps_only_the_best(temp_dir: TempDir, two_campus_csv: String) {
    let table = load_table(&write_plain(&temp_dir, "telemetry.csv", &two_campus_csv));
    let query = AdvisorQuery {
        top_n: Some(1),
        ..valley_query()
    };

    let rows = recommend(&table, &query, None, None).expect("recommend");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].location_id, 1);
}

#[rstest]
fn priors_shift_scores_and_gate_accessibility(temp_dir: TempDir, two_campus_csv: String) {
    let table = load_table(&write_plain(&temp_dir, "telemetry.csv", &two_campus_csv));
    let priors_path = write_plain(
        &temp_dir,
        "priors.csv",
        "Location_ID,Wheelchair,Bus,Air,Light,Power\n1,0,10,10,10,10\n2,1,1,1,1,1\n",
    );
    let priors = load_priors(&priors_path).expect("load priors");

    let rows = recommend(
        &table,
        &valley_query(),
        Some(&priors.profiles),
        Some(&priors.accessibility),
    )
    .expect("recommend");
    assert!((rows[0].prior_score - 1.0).abs() < 1e-9);
    assert!((rows[0].final_score - (0.75 * 0.64 + 0.25)).abs() < 1e-9);
    assert!((rows[1].prior_score - 0.1).abs() < 1e-9);

    let accessible_only = AdvisorQuery {
        require_accessible: true,
        ..valley_query()
    };
    let rows = recommend(
        &table,
        &accessible_only,
        Some(&priors.profiles),
        Some(&priors.accessibility),
    )
    .expect("recommend");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].location_id, 2);

    let err = recommend(&table, &accessible_only, Some(&priors.profiles), None)
        .expect_err("accessibility index missing");
    assert!(matches!(err, AdvisorError::Configuration { .. }));
}

#[rstest]
fn regular_term_excludes_exam_week_data(temp_dir: TempDir, two_campus_csv: String) {
    let table = load_table(&write_plain(&temp_dir, "telemetry.csv", &two_campus_csv));
    let query = AdvisorQuery {
        exam_period: false,
        ..valley_query()
    };

    let rows = recommend(&table, &query, None, None).expect("recommend");

    assert!(rows.is_empty());
}

#[rstest]
fn identical_runs_serialise_identically(temp_dir: TempDir, two_campus_csv: String) {
    let table = load_table(&write_plain(&temp_dir, "telemetry.csv", &two_campus_csv));
    let first = recommend(&table, &valley_query(), None, None).expect("recommend");
    let second = recommend(&table, &valley_query(), None, None).expect("recommend");

    assert_eq!(
        serde_json::to_vec(&first).expect("serialise"),
        serde_json::to_vec(&second).expect("serialise")
    );
}

#[rstest]
fn cancelled_runs_return_no_rows(temp_dir: TempDir, two_campus_csv: String) {
    let table = load_table(&write_plain(&temp_dir, "telemetry.csv", &two_campus_csv));
    let cancel = AtomicBool::new(true);

    let err = recommend_cancellable(&table, &valley_query(), None, None, &cancel)
        .expect_err("cancelled");

    assert!(matches!(err, AdvisorError::Cancelled));
}

#[rstest]
fn missing_files_report_their_path(temp_dir: TempDir) {
    let path = temp_dir.path().join("absent.csv");
    let err = TelemetryTable::load(&path).expect_err("missing file");
    match err {
        AdvisorError::Read { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error {other:?}"),
    }
}
