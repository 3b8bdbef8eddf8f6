use crate::domain::models::DailyEntry;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 7;
pub const DEFAULT_LOOKBACK: usize = 7;

/// Trailing moving average. The first `window - 1` points average over a
/// shrinking window instead of being undefined; values are rounded to one
/// decimal.
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut averaged = Vec::with_capacity(series.len());
    for index in 0..series.len() {
        let span = window.min(index + 1);
        let start = index + 1 - span;
        let sum: f64 = series[start..=index].iter().sum();
        averaged.push(round_one_decimal(sum / span as f64));
    }
    averaged
}

/// Deliberately the simplest possible projection: the mean first-difference
/// over the trailing `lookback` points, extrapolated `days` steps and clamped
/// at zero. No seasonality, no confidence interval; callers should not
/// over-trust it.
pub fn naive_forecast(series: &[f64], lookback: usize, days: usize) -> Vec<f64> {
    let Some(&last) = series.last() else {
        return Vec::new();
    };
    if days == 0 {
        return Vec::new();
    }

    let span = lookback.max(1).min(series.len());
    let tail = &series[series.len() - span..];
    let mean_delta = if tail.len() < 2 {
        0.0
    } else {
        let total: f64 = tail.windows(2).map(|pair| pair[1] - pair[0]).sum();
        total / (tail.len() - 1) as f64
    };

    let mut forecast = Vec::with_capacity(days);
    let mut value = last;
    for _ in 0..days {
        value = (value + mean_delta).max(0.0);
        forecast.push(value);
    }
    forecast
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    SleepHours,
    SleepScore,
    ActivityMinutes,
    Steps,
    Mood,
}

impl TrendMetric {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sleep_hours" | "sleep" => Ok(Self::SleepHours),
            "sleep_score" => Ok(Self::SleepScore),
            "activity_minutes" | "activity" => Ok(Self::ActivityMinutes),
            "steps" => Ok(Self::Steps),
            "mood" => Ok(Self::Mood),
            other => Err(format!("unsupported trend metric: {other}")),
        }
    }
}

pub fn metric_series(entries: &[DailyEntry], metric: TrendMetric) -> Vec<f64> {
    entries
        .iter()
        .map(|entry| match metric {
            TrendMetric::SleepHours => entry.sleep_hours,
            TrendMetric::SleepScore => entry.sleep_score as f64,
            TrendMetric::ActivityMinutes => entry.activity_minutes as f64,
            TrendMetric::Steps => entry.steps as f64,
            TrendMetric::Mood => entry.mood as f64,
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
