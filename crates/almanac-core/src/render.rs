use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::analytics::AnalyticsSnapshot;
use crate::calendar::status_icon;
use crate::config::Config;
use crate::task::{Priority, Task};
use crate::validate::ValidationErrors;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, heading: &str, tasks: &[Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_table(&mut out, heading, tasks)
    }

    pub fn write_task_table<W: Write>(
        &self,
        mut out: W,
        heading: &str,
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        writeln!(out, "{heading} ({} tasks)", tasks.len())?;
        if tasks.is_empty() {
            return Ok(());
        }

        let headers = ["ID", "", "Dates", "Time", "Category", "Pri", "Title"]
            .map(String::from)
            .to_vec();

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    status_icon(task.status).to_string(),
                    date_span(task),
                    time_span(task),
                    task.category.clone(),
                    self.paint(task.priority.as_key(), priority_code(task.priority)),
                    task.title.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, snapshot))]
    pub fn print_stats(&mut self, heading: &str, snapshot: &AnalyticsSnapshot) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_stats(&mut out, heading, snapshot)
    }

    pub fn write_stats<W: Write>(
        &self,
        mut out: W,
        heading: &str,
        snapshot: &AnalyticsSnapshot,
    ) -> anyhow::Result<()> {
        writeln!(out, "{heading}")?;
        writeln!(
            out,
            "total {}  completed {}  in progress {}  pending {}  ({:.0}% done)",
            snapshot.total,
            snapshot.completed,
            snapshot.in_progress,
            snapshot.pending,
            snapshot.completion_rate() * 100.0
        )?;
        writeln!(out)?;

        let rows = snapshot
            .category_stats
            .iter()
            .map(|stat| {
                vec![
                    stat.name.clone(),
                    stat.count.to_string(),
                    stat.completed.to_string(),
                    stat.color.clone(),
                ]
            })
            .collect();
        write_table(
            &mut out,
            ["Category", "Tasks", "Done", "Colour"].map(String::from).to_vec(),
            rows,
        )?;
        writeln!(out)?;

        let rows = snapshot
            .status_stats
            .iter()
            .map(|stat| vec![stat.name.clone(), stat.count.to_string()])
            .collect();
        write_table(&mut out, ["Status", "Tasks"].map(String::from).to_vec(), rows)?;
        writeln!(out)?;

        let rows = snapshot
            .priority_stats
            .iter()
            .map(|stat| vec![stat.name.clone(), stat.count.to_string()])
            .collect();
        write_table(&mut out, ["Priority", "Tasks"].map(String::from).to_vec(), rows)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_agenda(&mut self, date: NaiveDate, tasks: &[Task]) -> anyhow::Result<()> {
        let heading = date.format("%A, %B %-d, %Y").to_string();
        let mut out = io::stdout().lock();
        self.write_task_table(&mut out, &heading, tasks)
    }

    /// One line per rejected field; prints nothing for valid tasks.
    pub fn print_validation(&mut self, results: &[(Task, ValidationErrors)]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_validation(&mut out, results)
    }

    pub fn write_validation<W: Write>(
        &self,
        mut out: W,
        results: &[(Task, ValidationErrors)],
    ) -> anyhow::Result<()> {
        let mut rows = Vec::new();
        for (task, errors) in results {
            for (field, message) in errors.iter() {
                rows.push(vec![
                    self.paint(&task.id.to_string(), "33"),
                    task.title.clone(),
                    field.to_string(),
                    self.paint(message, "31"),
                ]);
            }
        }

        if rows.is_empty() {
            writeln!(out, "All {} tasks are valid.", results.len())?;
            return Ok(());
        }
        write_table(out, ["ID", "Title", "Field", "Problem"].map(String::from).to_vec(), rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

fn date_span(task: &Task) -> String {
    if task.is_multi_day() {
        format!("{} → {}", task.start_date, task.end_date)
    } else {
        task.start_date.clone()
    }
}

fn time_span(task: &Task) -> String {
    if task.has_times() {
        format!("{}-{}", task.start_time, task.end_time)
    } else {
        "all day".to_string()
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregate;
    use crate::domain::Domain;
    use crate::task::Status;

    fn plain() -> Renderer {
        Renderer { color: false }
    }

    fn task(id: u64, title: &str) -> Task {
        let mut task = Task::draft("work");
        task.id = id;
        task.title = title.to_string();
        task.start_date = "2025-08-01".to_string();
        task
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn rejects_unknown_color_setting() {
        let mut cfg = Config::defaults();
        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn strip_ansi_keeps_visible_text() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }

    #[test]
    fn table_columns_align_by_display_width() {
        let mut done = task(1, "Ship");
        done.status = Status::Completed;
        let mut trip = task(22, "Trip");
        trip.end_date = "2025-08-03".to_string();
        trip.start_time.clear();
        trip.end_time.clear();

        let text = render(|buf| plain().write_task_table(buf, "August 2025", &[done, trip]));
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "August 2025 (2 tasks)");
        assert!(lines[3].contains("✅"));
        assert!(lines[3].contains("09:00-10:00"));
        assert!(lines[4].contains("2025-08-01 → 2025-08-03"));
        assert!(lines[4].contains("all day"));
        let title_col = |line: &str| {
            let idx = line.find("Tri").or_else(|| line.find("Shi")).expect("title");
            UnicodeWidthStr::width(&line[..idx])
        };
        assert_eq!(title_col(lines[3]), title_col(lines[4]));
    }

    #[test]
    fn stats_and_validation_output() {
        let text = render(|buf| {
            plain().write_stats(buf, "All time", &aggregate(&[task(1, "A")], &Domain::default()))
        });
        assert!(text.contains("total 1  completed 0"));
        assert!(text.contains("personal"));

        let mut bad = task(5, "");
        bad.end_time = "08:00".to_string();
        let errors = crate::validate::validate(&bad, &Domain::default());
        let text = render(|buf| plain().write_validation(buf, &[(bad.clone(), errors)]));
        assert!(text.contains("endTime"));
        assert!(text.contains("title"));

        let text = render(|buf| {
            plain().write_validation(buf, &[(task(1, "ok"), ValidationErrors::default())])
        });
        assert_eq!(text.trim(), "All 1 tasks are valid.");
    }
}
