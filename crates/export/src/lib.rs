//! Export helpers for timeline artifacts.

pub mod json {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::Path;

    use serde::Serialize;
    use serde_json::to_writer_pretty;

    use linkplan_timeline::{LegOutcome, MissionTimeline, TimelineStatistics};

    /// Create a writer for the target path, handling stdout (`-`) by convention.
    pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
        if path == Path::new("-") {
            return Ok(Box::new(BufWriter::new(io::stdout())));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    /// Write one timeline as pretty JSON.
    pub fn write_timeline(path: &Path, timeline: &MissionTimeline) -> io::Result<()> {
        let mut writer = writer_for_path(path)?;
        to_writer_pretty(&mut writer, timeline)?;
        writeln!(writer)?;
        writer.flush()
    }

    /// Batch entry: either a timeline or the reason the leg failed.
    #[derive(Serialize)]
    struct LegRecord<'a> {
        mission_id: &'a str,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeline: Option<&'a MissionTimeline>,
    }

    #[derive(Serialize)]
    struct BatchEnvelope<'a> {
        legs: usize,
        failed: usize,
        nominal_seconds: i64,
        degraded_seconds: i64,
        critical_seconds: i64,
        results: Vec<LegRecord<'a>>,
    }

    /// Write every leg outcome, failures included, as one JSON document.
    pub fn write_batch(path: &Path, outcomes: &[LegOutcome]) -> io::Result<()> {
        let mut totals = TimelineStatistics::default();
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let record = match &outcome.result {
                Ok(timeline) => {
                    totals.nominal_seconds += timeline.statistics.nominal_seconds;
                    totals.degraded_seconds += timeline.statistics.degraded_seconds;
                    totals.critical_seconds += timeline.statistics.critical_seconds;
                    LegRecord {
                        mission_id: &outcome.mission_id,
                        ok: true,
                        error: None,
                        timeline: Some(timeline),
                    }
                }
                Err(err) => LegRecord {
                    mission_id: &outcome.mission_id,
                    ok: false,
                    error: Some(err.to_string()),
                    timeline: None,
                },
            };
            results.push(record);
        }
        let envelope = BatchEnvelope {
            legs: outcomes.len(),
            failed: results.iter().filter(|record| !record.ok).count(),
            nominal_seconds: totals.nominal_seconds,
            degraded_seconds: totals.degraded_seconds,
            critical_seconds: totals.critical_seconds,
            results,
        };

        let mut writer = writer_for_path(path)?;
        to_writer_pretty(&mut writer, &envelope)?;
        writeln!(writer)?;
        writer.flush()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Duration, TimeZone, Utc};
        use linkplan_timeline::{
            AvailabilityIntervals, ComputationError, MissionWindow, build_segments,
        };

        fn timeline() -> MissionTimeline {
            let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
            let window = MissionWindow::new(start, start + Duration::hours(2)).unwrap();
            let intervals = linkplan_timeline::build_intervals(&[], &window);
            let segments = build_segments("LEG-1", &intervals, &window);
            MissionTimeline::assemble("LEG-1", window, segments, intervals, vec![], vec![])
        }

        #[test]
        fn timeline_json_lands_in_nested_directory() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("out").join("leg.json");
            write_timeline(&path, &timeline()).expect("write");

            let text = fs::read_to_string(&path).expect("read back");
            let value: serde_json::Value = serde_json::from_str(&text).expect("json");
            assert_eq!(value["mission_id"], "LEG-1");
            assert_eq!(value["segments"][0]["status"], "NOMINAL");
            assert_eq!(value["intervals"]["x"][0]["state"], "AVAILABLE");
            assert_eq!(value["statistics"]["nominal_seconds"], 7200);
        }

        #[test]
        fn batch_json_reports_failures() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("batch.json");
            let outcomes = vec![
                LegOutcome {
                    mission_id: "LEG-1".into(),
                    result: Ok(timeline()),
                },
                LegOutcome {
                    mission_id: "LEG-2".into(),
                    result: Err(ComputationError::EmptyRoute),
                },
            ];
            write_batch(&path, &outcomes).expect("write");

            let value: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(value["legs"], 2);
            assert_eq!(value["failed"], 1);
            assert_eq!(value["results"][1]["error"], "route has no waypoints");
            assert!(value["results"][1].get("timeline").is_none());
            assert_eq!(value["nominal_seconds"], 7200);
        }
    }
}
