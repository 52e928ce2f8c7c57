use std::collections::BTreeMap;
use std::fmt::Write;

use crate::advisor::AdvisorQuery;
use crate::models::{BuildingSummary, Campus, RecommendationRow};

pub const EMPTY_MESSAGE: &str = "No results (try fewer filters).";

pub fn summarize_by_building(rows: &[RecommendationRow]) -> Vec<BuildingSummary> {
    let mut map: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for row in rows {
        let entry = map.entry(row.building_name.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += row.final_score;
    }

    let mut summaries: Vec<BuildingSummary> = map
        .into_iter()
        .map(|(building_name, (count, total))| BuildingSummary {
            building_name: building_name.to_string(),
            location_count: count,
            mean_final_score: if count == 0 {
                0.0
            } else {
                total / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.location_count
            .cmp(&a.location_count)
            .then_with(|| a.building_name.cmp(&b.building_name))
    });
    summaries
}

/// Plain-text ranking for the terminal.
pub fn render_table(rows: &[RecommendationRow]) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        let _ = writeln!(output, "{EMPTY_MESSAGE}");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<4} {:<40} {:<26} {:>7} {:>7} {:>7} {:>8} {:>6} {:>6}",
        "#", "Location", "Building", "Final", "Seat", "Prior", "Crowding", "Switch", "N"
    );
    for (rank, row) in rows.iter().enumerate() {
        let _ = writeln!(
            output,
            "{:<4} {:<40} {:<26} {:>7.3} {:>7.3} {:>7.3} {:>8.3} {:>6.0} {:>6}",
            rank + 1,
            row.location_name,
            row.building_name,
            row.final_score,
            row.sas_score,
            row.prior_score,
            row.crowding_risk,
            row.distance_penalty,
            row.observation_count
        );
    }
    output
}

pub fn build_report(query: &AdvisorQuery, rows: &[RecommendationRow]) -> String {
    let summaries = summarize_by_building(rows);
    let mut output = String::new();

    let _ = writeln!(output, "# Study Location Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Query");
    let _ = writeln!(output, "- Campuses: {}", campus_label(query));
    let _ = writeln!(
        output,
        "- Weekday: {}",
        query
            .weekday
            .map_or_else(|| "any".to_string(), |day| day.to_string())
    );
    let _ = writeln!(
        output,
        "- Time of day: {}",
        query
            .time_of_day
            .map_or_else(|| "any".to_string(), |tod| tod.to_string())
    );
    let _ = writeln!(
        output,
        "- Period: {}",
        if query.exam_period { "exam" } else { "regular term" }
    );
    let _ = writeln!(
        output,
        "- Home campus: {}",
        query
            .home_campus
            .map_or_else(|| "none".to_string(), |campus| campus.to_string())
    );
    let _ = writeln!(
        output,
        "- Wheelchair access required: {}",
        if query.require_accessible { "yes" } else { "no" }
    );
    let _ = writeln!(
        output,
        "- Crowding threshold {:.2}, at least {} observations",
        query.availability_threshold, query.min_observations
    );
    let _ = writeln!(output, "- Prior weights: {}", query.weights());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");

    if rows.is_empty() {
        let _ = writeln!(output, "{EMPTY_MESSAGE}");
    } else {
        let _ = writeln!(
            output,
            "| # | Location | Building | Final | Seat | Prior | Crowding | Switch | N |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for (rank, row) in rows.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.0} | {} |",
                rank + 1,
                row.location_name,
                row.building_name,
                row.final_score,
                row.sas_score,
                row.prior_score,
                row.crowding_risk,
                row.distance_penalty,
                row.observation_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Building");

    if summaries.is_empty() {
        let _ = writeln!(output, "No buildings in this ranking.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} locations (mean final score {:.3})",
                summary.building_name, summary.location_count, summary.mean_final_score
            );
        }
    }

    output
}

fn campus_label(query: &AdvisorQuery) -> String {
    match &query.campuses {
        None => "all".to_string(),
        Some(campuses) => campuses
            .iter()
            .map(Campus::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}
