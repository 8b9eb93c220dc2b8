use tabled::{settings::Style, Table, Tabled};

use crate::commands::{format_time, UserDirectory};
use crate::estimate::Estimate;
use crate::forecast::Forecast;
use crate::storage::DbStats;

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: usize,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Shortname")]
    shortname: String,
    #[tabled(rename = "Type")]
    forecast_type: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct EstimateRow {
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Estimate")]
    estimate: String,
    #[tabled(rename = "Submitted")]
    submitted: String,
}

fn rounded<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    rounded(vec![
        CountRow { metric: "Forecasts", count: stats.forecasts },
        CountRow { metric: "Resolved", count: stats.resolved },
        CountRow { metric: "Open", count: stats.forecasts.saturating_sub(stats.resolved) },
        CountRow { metric: "Estimates", count: stats.estimates },
    ])
}

fn display_name(users: &impl UserDirectory, id: &str) -> String {
    users.display_name(id).unwrap_or_else(|| id.to_string())
}

pub fn forecasts_table(forecasts: &[Forecast], users: &impl UserDirectory) -> String {
    let rows: Vec<ForecastRow> = forecasts
        .iter()
        .map(|f| ForecastRow {
            shortname: f.shortname.clone(),
            forecast_type: f.forecast_type.to_string(),
            author: display_name(users, &f.author),
            resolution: f.resolution.map(|r| r.to_string()).unwrap_or_default(),
            description: f.description.clone(),
        })
        .collect();
    rounded(rows)
}

pub fn estimates_table(estimates: &[Estimate], users: &impl UserDirectory) -> String {
    let rows: Vec<EstimateRow> = estimates
        .iter()
        .map(|e| EstimateRow {
            author: display_name(users, &e.author),
            estimate: e.estimate.to_string(),
            submitted: format_time(e.time),
        })
        .collect();
    rounded(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StaticDirectory;
    use crate::forecast::ForecastType;

    #[test]
    fn test_stats_table_rows() {
        let table = stats_table(&DbStats {
            forecasts: 3,
            resolved: 1,
            estimates: 7,
        });
        assert!(table.contains("Forecasts"));
        assert!(table.contains("Open"));
        assert!(table.contains('7'));
    }

    #[test]
    fn test_forecasts_table_names_authors() {
        let mut names = std::collections::HashMap::new();
        names.insert("1".to_string(), "alice".to_string());
        let users = StaticDirectory::new(names);

        let table = forecasts_table(
            &[Forecast::new("rain", "Rain?", "1", ForecastType::Probability)],
            &users,
        );
        assert!(table.contains("alice"));
        assert!(table.contains("PROB"));
    }
}
