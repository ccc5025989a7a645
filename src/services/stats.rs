use crate::models::habit::{Habit, HabitType};
use crate::models::metric::HabitLogEntry;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Per-habit performance over a lookback window ending today.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HabitStatistic {
    pub habit_id: Uuid,
    pub name: String,
    pub color: String,
    /// Completed days / window days, as a percentage.
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    /// Mean logged value over completed days; quantity habits only.
    pub average_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverallStats {
    pub total_habits: usize,
    pub average_completion_rate: f64,
    pub active_streaks: u32,
    pub best_habit: Option<HabitStatistic>,
}

/// Scans a habit's day-ordered logs over the `window_days` ending at `today`.
/// The log list carries at most one entry per day per habit.
pub fn habit_statistics(
    habit: &Habit,
    logs: &[HabitLogEntry],
    today: NaiveDate,
    window_days: u32,
) -> HabitStatistic {
    let window_start = today - Duration::days(window_days.saturating_sub(1) as i64);
    let by_day: BTreeMap<NaiveDate, &HabitLogEntry> = logs
        .iter()
        .filter(|log| log.habit_id == habit.id)
        .filter(|log| log.date >= window_start && log.date <= today)
        .map(|log| (log.date, log))
        .collect();

    let completed_days = by_day.values().filter(|log| log.completed).count() as u32;
    let completion_rate = if window_days > 0 {
        completed_days as f64 / window_days as f64 * 100.0
    } else {
        0.0
    };

    // Backward from today, stop at the first missing or incomplete day.
    let mut current_streak = 0;
    for offset in 0..window_days {
        let date = today - Duration::days(offset as i64);
        match by_day.get(&date) {
            Some(log) if log.completed => current_streak += 1,
            _ => break,
        }
    }

    // Oldest to newest, tracking the longest run inside the window.
    let mut longest_streak = 0;
    let mut run = 0;
    for offset in (0..window_days).rev() {
        let date = today - Duration::days(offset as i64);
        match by_day.get(&date) {
            Some(log) if log.completed => {
                run += 1;
                longest_streak = longest_streak.max(run);
            }
            _ => run = 0,
        }
    }

    let average_value = match habit.habit_type {
        HabitType::Quantity => {
            let values: Vec<f64> = by_day
                .values()
                .filter(|log| log.completed)
                .filter_map(|log| log.value)
                .collect();
            if values.is_empty() {
                Some(0.0)
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        HabitType::Boolean => None,
    };

    HabitStatistic {
        habit_id: habit.id,
        name: habit.name.clone(),
        color: habit.color.clone(),
        completion_rate,
        current_streak,
        longest_streak,
        total_completions: completed_days,
        average_value,
    }
}

pub fn overall_statistics(stats: &[HabitStatistic]) -> OverallStats {
    let average_completion_rate = if stats.is_empty() {
        0.0
    } else {
        stats.iter().map(|s| s.completion_rate).sum::<f64>() / stats.len() as f64
    };

    let best_habit = stats
        .iter()
        .fold(None::<&HabitStatistic>, |best, current| match best {
            Some(b) if current.completion_rate > b.completion_rate => Some(current),
            Some(b) => Some(b),
            None => Some(current),
        })
        .cloned();

    OverallStats {
        total_habits: stats.len(),
        average_completion_rate,
        active_streaks: stats.iter().map(|s| s.current_streak).sum(),
        best_habit,
    }
}

/// One day of the dashboard data: scores plus how many of the user's habits
/// were checked off.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub mood: i64,
    pub energy: i64,
    pub productivity: i64,
    pub momentum: f64,
    pub habits_completed: u32,
    pub total_habits: u32,
}

impl DaySnapshot {
    fn score_mean(&self) -> f64 {
        (self.mood + self.energy + self.productivity) as f64 / 3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPeriod {
    Week,
    Month,
    Quarter,
}

impl SummaryPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "week" => Some(SummaryPeriod::Week),
            "month" => Some(SummaryPeriod::Month),
            "quarter" => Some(SummaryPeriod::Quarter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodSummary {
    pub label: String,
    pub total_days: usize,
    pub average_mood: f64,
    pub average_energy: f64,
    pub average_productivity: f64,
    /// Habits completed / habits available across the period, as a percentage.
    pub average_habit_completion: f64,
    pub best_day: Option<DaySnapshot>,
    /// Versus the previous period's score mean, with a +-0.2 dead band.
    pub improvement_trend: TrendDirection,
}

/// Groups day snapshots into periods and summarizes each, most recent first.
/// Weeks are consecutive 7-day chunks of the day-ordered data; months and
/// quarters follow the calendar.
pub fn summarize_periods(days: &[DaySnapshot], period: SummaryPeriod) -> Vec<PeriodSummary> {
    let mut sorted: Vec<&DaySnapshot> = days.iter().collect();
    sorted.sort_by_key(|d| d.date);

    let mut groups: Vec<Vec<&DaySnapshot>> = match period {
        SummaryPeriod::Week => sorted.chunks(7).map(|c| c.to_vec()).collect(),
        SummaryPeriod::Month => {
            let mut by_month: BTreeMap<(i32, u32), Vec<&DaySnapshot>> = BTreeMap::new();
            for day in &sorted {
                by_month
                    .entry((day.date.year(), day.date.month()))
                    .or_default()
                    .push(day);
            }
            by_month.into_values().collect()
        }
        SummaryPeriod::Quarter => {
            let mut by_quarter: BTreeMap<(i32, u32), Vec<&DaySnapshot>> = BTreeMap::new();
            for day in &sorted {
                by_quarter
                    .entry((day.date.year(), quarter_of(day.date)))
                    .or_default()
                    .push(day);
            }
            by_quarter.into_values().collect()
        }
    };
    groups.reverse();

    groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let previous = groups.get(index + 1).map(|g| g.as_slice());
            summarize_group(group, previous, period)
        })
        .collect()
}

fn summarize_group(
    group: &[&DaySnapshot],
    previous: Option<&[&DaySnapshot]>,
    period: SummaryPeriod,
) -> PeriodSummary {
    let total_days = group.len();
    let denom = total_days as f64;

    let average_mood = group.iter().map(|d| d.mood as f64).sum::<f64>() / denom;
    let average_energy = group.iter().map(|d| d.energy as f64).sum::<f64>() / denom;
    let average_productivity = group.iter().map(|d| d.productivity as f64).sum::<f64>() / denom;

    let completed: u32 = group.iter().map(|d| d.habits_completed).sum();
    let available: u32 = group.iter().map(|d| d.total_habits).sum();
    let average_habit_completion = if available > 0 {
        completed as f64 / available as f64 * 100.0
    } else {
        0.0
    };

    let best_day = group
        .iter()
        .fold(None::<&&DaySnapshot>, |best, current| match best {
            Some(b) if current.score_mean() > b.score_mean() => Some(current),
            Some(b) => Some(b),
            None => Some(current),
        })
        .map(|d| (*d).clone());

    let current_avg = (average_mood + average_energy + average_productivity) / 3.0;
    let improvement_trend = match previous {
        Some(prev) if !prev.is_empty() => {
            let prev_avg = prev
                .iter()
                .map(|d| (d.mood + d.energy + d.productivity) as f64)
                .sum::<f64>()
                / (prev.len() as f64 * 3.0);
            if current_avg > prev_avg + 0.2 {
                TrendDirection::Up
            } else if current_avg < prev_avg - 0.2 {
                TrendDirection::Down
            } else {
                TrendDirection::Stable
            }
        }
        _ => TrendDirection::Stable,
    };

    let label = period_label(group, period);

    PeriodSummary {
        label,
        total_days,
        average_mood,
        average_energy,
        average_productivity,
        average_habit_completion,
        best_day,
        improvement_trend,
    }
}

fn period_label(group: &[&DaySnapshot], period: SummaryPeriod) -> String {
    let first = match group.first() {
        Some(day) => day.date,
        None => return String::new(),
    };
    match period {
        SummaryPeriod::Week => format!("Week of {}", first.format("%b %-d")),
        SummaryPeriod::Month => first.format("%B %Y").to_string(),
        SummaryPeriod::Quarter => format!("Q{} {}", quarter_of(first), first.year()),
    }
}

fn quarter_of(date: NaiveDate) -> u32 {
    (date.month0() / 3) + 1
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricTrend {
    pub metric: String,
    pub average: f64,
    /// Second-half average minus first-half average over the window.
    pub slope: f64,
}

/// Average and trend slope for each tracked score over the day-ordered
/// window.
pub fn metric_trends(days: &[DaySnapshot]) -> Vec<MetricTrend> {
    let series: [(&str, Vec<f64>); 4] = [
        ("mood", days.iter().map(|d| d.mood as f64).collect()),
        ("energy", days.iter().map(|d| d.energy as f64).collect()),
        (
            "productivity",
            days.iter().map(|d| d.productivity as f64).collect(),
        ),
        ("momentum", days.iter().map(|d| d.momentum).collect()),
    ];

    series
        .into_iter()
        .map(|(metric, values)| {
            let average = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };

            let slope = if values.len() > 1 {
                let mid = values.len() / 2;
                let first = &values[..mid];
                let second = &values[mid..];
                let first_avg = first.iter().sum::<f64>() / first.len() as f64;
                let second_avg = second.iter().sum::<f64>() / second.len() as f64;
                second_avg - first_avg
            } else {
                0.0
            };

            MetricTrend {
                metric: metric.to_string(),
                average,
                slope,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn habit(habit_type: HabitType) -> Habit {
        let now = Utc::now();
        Habit {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Read".to_string(),
            habit_type,
            target: None,
            color: "#3B82F6".to_string(),
            display_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(habit_id: Uuid, date: NaiveDate, completed: bool, value: Option<f64>) -> HabitLogEntry {
        HabitLogEntry {
            date,
            habit_id,
            habit_name: "Read".to_string(),
            completed,
            value,
        }
    }

    #[test]
    fn current_streak_counts_run_ending_today() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 20);
        // Five completed days ending today, a gap on the 14th, more before it.
        let mut logs = Vec::new();
        for offset in 0..5 {
            logs.push(entry(h.id, today - Duration::days(offset), true, None));
        }
        logs.push(entry(h.id, day(2026, 3, 13), true, None));
        logs.push(entry(h.id, day(2026, 3, 12), true, None));

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.current_streak, 5);
        assert_eq!(stats.total_completions, 7);
    }

    #[test]
    fn missing_today_means_zero_current_streak() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 20);
        let logs = vec![
            entry(h.id, today - Duration::days(1), true, None),
            entry(h.id, today - Duration::days(2), true, None),
        ];

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn incomplete_day_breaks_current_streak() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 20);
        let logs = vec![
            entry(h.id, today, true, None),
            entry(h.id, today - Duration::days(1), false, None),
            entry(h.id, today - Duration::days(2), true, None),
        ];

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn longest_streak_finds_the_longest_run_in_window() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 31);
        let mut logs = Vec::new();
        // A 3-day run ending today and an older 6-day run.
        for offset in 0..3 {
            logs.push(entry(h.id, today - Duration::days(offset), true, None));
        }
        for offset in 10..16 {
            logs.push(entry(h.id, today - Duration::days(offset), true, None));
        }

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 6);
    }

    #[test]
    fn completion_rate_with_no_logs_is_zero() {
        let h = habit(HabitType::Boolean);
        let stats = habit_statistics(&h, &[], day(2026, 3, 20), 30);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(stats.completion_rate.is_finite());
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 0);
    }

    #[test]
    fn completion_rate_is_completed_days_over_window() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 30);
        let mut logs = Vec::new();
        for offset in 0..15 {
            logs.push(entry(h.id, today - Duration::days(offset), true, None));
        }

        let stats = habit_statistics(&h, &logs, today, 30);
        assert!((stats.completion_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn logs_outside_the_window_are_ignored() {
        let h = habit(HabitType::Boolean);
        let today = day(2026, 3, 20);
        let logs = vec![
            entry(h.id, today, true, None),
            entry(h.id, today - Duration::days(40), true, None),
        ];

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.total_completions, 1);
    }

    #[test]
    fn average_value_over_completed_quantity_logs() {
        let h = habit(HabitType::Quantity);
        let today = day(2026, 3, 20);
        let logs = vec![
            entry(h.id, today, true, Some(8.0)),
            entry(h.id, today - Duration::days(1), true, Some(12.0)),
            entry(h.id, today - Duration::days(2), false, Some(2.0)),
        ];

        let stats = habit_statistics(&h, &logs, today, 30);
        assert_eq!(stats.average_value, Some(10.0));

        let empty = habit_statistics(&h, &[], today, 30);
        assert_eq!(empty.average_value, Some(0.0));

        let boolean = habit(HabitType::Boolean);
        let stats = habit_statistics(&boolean, &[], today, 30);
        assert_eq!(stats.average_value, None);
    }

    #[test]
    fn overall_stats_roll_up() {
        let today = day(2026, 3, 20);
        let a = habit(HabitType::Boolean);
        let b = habit(HabitType::Boolean);
        let logs = vec![
            entry(a.id, today, true, None),
            entry(a.id, today - Duration::days(1), true, None),
            entry(b.id, today, true, None),
        ];

        let stats = vec![
            habit_statistics(&a, &logs, today, 10),
            habit_statistics(&b, &logs, today, 10),
        ];
        let overall = overall_statistics(&stats);
        assert_eq!(overall.total_habits, 2);
        assert_eq!(overall.active_streaks, 3);
        assert_eq!(overall.best_habit.as_ref().unwrap().habit_id, a.id);
        assert!((overall.average_completion_rate - 15.0).abs() < 1e-9);
    }

    #[test]
    fn overall_stats_empty() {
        let overall = overall_statistics(&[]);
        assert_eq!(overall.total_habits, 0);
        assert_eq!(overall.average_completion_rate, 0.0);
        assert!(overall.best_habit.is_none());
    }

    fn snapshot(date: NaiveDate, mood: i64, completed: u32, total: u32) -> DaySnapshot {
        DaySnapshot {
            date,
            mood,
            energy: mood,
            productivity: mood,
            momentum: mood as f64,
            habits_completed: completed,
            total_habits: total,
        }
    }

    #[test]
    fn weekly_grouping_chunks_by_seven_days_most_recent_first() {
        let days: Vec<DaySnapshot> = (0..10)
            .map(|i| snapshot(day(2026, 3, 1) + Duration::days(i), 5, 1, 2))
            .collect();

        let summaries = summarize_periods(&days, SummaryPeriod::Week);
        assert_eq!(summaries.len(), 2);
        // Most recent chunk first: the trailing 3 days.
        assert_eq!(summaries[0].total_days, 3);
        assert_eq!(summaries[1].total_days, 7);
        assert!((summaries[0].average_habit_completion - 50.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_and_quarterly_grouping_follow_the_calendar() {
        let days = vec![
            snapshot(day(2026, 1, 15), 5, 0, 0),
            snapshot(day(2026, 2, 10), 5, 0, 0),
            snapshot(day(2026, 4, 1), 5, 0, 0),
        ];

        let monthly = summarize_periods(&days, SummaryPeriod::Month);
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly[0].label, "April 2026");
        assert_eq!(monthly[2].label, "January 2026");

        let quarterly = summarize_periods(&days, SummaryPeriod::Quarter);
        assert_eq!(quarterly.len(), 2);
        assert_eq!(quarterly[0].label, "Q2 2026");
        assert_eq!(quarterly[1].label, "Q1 2026");
        assert_eq!(quarterly[1].total_days, 2);
    }

    #[test]
    fn improvement_trend_compares_against_previous_period() {
        let mut days = Vec::new();
        // First week flat 4s, second week flat 8s.
        for i in 0..7 {
            days.push(snapshot(day(2026, 3, 1) + Duration::days(i), 4, 0, 0));
        }
        for i in 7..14 {
            days.push(snapshot(day(2026, 3, 1) + Duration::days(i), 8, 0, 0));
        }

        let summaries = summarize_periods(&days, SummaryPeriod::Week);
        assert_eq!(summaries[0].improvement_trend, TrendDirection::Up);
        // The oldest period has nothing to compare against.
        assert_eq!(summaries[1].improvement_trend, TrendDirection::Stable);
    }

    #[test]
    fn best_day_has_highest_score_mean() {
        let days = vec![
            snapshot(day(2026, 3, 1), 4, 0, 0),
            snapshot(day(2026, 3, 2), 9, 0, 0),
            snapshot(day(2026, 3, 3), 6, 0, 0),
        ];

        let summaries = summarize_periods(&days, SummaryPeriod::Week);
        assert_eq!(summaries[0].best_day.as_ref().unwrap().date, day(2026, 3, 2));
    }

    #[test]
    fn metric_trends_slope_is_half_difference() {
        let days: Vec<DaySnapshot> = vec![
            snapshot(day(2026, 3, 1), 4, 0, 0),
            snapshot(day(2026, 3, 2), 4, 0, 0),
            snapshot(day(2026, 3, 3), 8, 0, 0),
            snapshot(day(2026, 3, 4), 8, 0, 0),
        ];

        let trends = metric_trends(&days);
        let mood = trends.iter().find(|t| t.metric == "mood").unwrap();
        assert!((mood.average - 6.0).abs() < 1e-9);
        assert!((mood.slope - 4.0).abs() < 1e-9);
    }

    #[test]
    fn metric_trends_with_one_point_have_zero_slope() {
        let days = vec![snapshot(day(2026, 3, 1), 7, 0, 0)];
        let trends = metric_trends(&days);
        assert_eq!(trends.len(), 4);
        for trend in trends {
            assert_eq!(trend.slope, 0.0);
        }
    }
}
