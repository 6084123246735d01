use anyhow::{Context, Result};
use chrono::Datelike;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use scadenze_core::{next_milestone, PriorityBucket, StreakState};
use std::fs;
use std::path::Path;

use crate::calendar::{CalendarDay, CalendarMonth, WEEKDAYS};
use crate::dashboard::{Dashboard, Entry};
use crate::reminders::Reminder;

/// Write a static snapshot of the dashboard
pub fn generate_html(dashboard: &Dashboard, streak: StreakState, path: &Path) -> Result<()> {
    let page = render_dashboard(dashboard, streak, &[], false);
    fs::write(path, page.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Dashboard page. `live` pages talk to the JSON API; static snapshots are read-only.
pub fn render_dashboard(
    dashboard: &Dashboard,
    streak: StreakState,
    reminders: &[Reminder],
    live: bool,
) -> Markup {
    let stats = &dashboard.stats;

    layout(
        "Scadenze",
        html! {
            header.top {
                h1 { "Scadenze" }
                nav {
                    a href="/" { "Dashboard" }
                    @if live {
                        a href="/calendar" { "Calendar" }
                    }
                }
            }
            (render_streak(streak))
            div.stats {
                div.stat { span.value { (stats.active) } span.label { "Active" } }
                div.stat { span.value { (stats.completed) } span.label { "Completed" } }
                div.stat.overdue { span.value { (stats.overdue) } span.label { "Overdue" } }
                div.stat { span.value { (stats.progress_percent) "%" } span.label { "Progress" } }
            }
            div.progress { div.progress-bar style={ "width: " (stats.progress_percent) "%" } {} }
            @if !reminders.is_empty() {
                section.reminders {
                    h2 { "🔔 Reminders" }
                    ul {
                        @for reminder in reminders {
                            li class=(reminder.bucket.as_str()) { (reminder.to_string()) }
                        }
                    }
                }
            }
            @if live {
                (render_add_form())
            }
            div #"celebration" .celebration hidden {}
            @for section in &dashboard.sections {
                section class={ "bucket " (section.bucket.as_str()) } {
                    h2 {
                        (section.bucket.badge())
                        span.count { (section.entries.len()) }
                    }
                    p.description { (section.bucket.description()) }
                    @if section.entries.is_empty() {
                        p.empty-state { (empty_text(section.bucket)) }
                    } @else {
                        @for entry in &section.entries {
                            (render_entry(entry, live))
                        }
                    }
                }
            }
            @if !dashboard.invalid.is_empty() {
                section.bucket.invalid {
                    h2 { "Unreadable due dates" }
                    @for a in &dashboard.invalid {
                        div.assignment { span.title { (a.title) } span.meta { (a.due_date) } }
                    }
                }
            }
        },
        live,
    )
}

fn render_streak(streak: StreakState) -> Markup {
    html! {
        div.streak {
            span.flame { "🔥" }
            span.value { (streak.count) }
            span.label { "day streak" }
            @if let Some(next) = next_milestone(streak.count) {
                span.next { (next - streak.count) " to the next milestone" }
            }
        }
    }
}

fn render_entry(entry: &Entry, live: bool) -> Markup {
    let a = &entry.assignment;
    let accent = a.color.as_ref().map(|c| format!("border-left-color: {}", c));
    let due = entry
        .due
        .map(|d| d.to_string())
        .unwrap_or_else(|| a.due_date.clone());
    html! {
        div.assignment data-id=(a.id) style=[accent] {
            input.toggle type="checkbox" checked[a.completed] disabled[!live] data-id=(a.id);
            div.content {
                div.title { (a.source.icon()) " " (a.title) }
                @if !a.description.is_empty() {
                    div.description { (a.description) }
                }
                div.meta {
                    @if let Some(course) = &a.course_name {
                        span.course { (course) }
                    }
                    span.due { (due) }
                    @if !a.completed {
                        span.remaining { (entry.remaining) }
                    }
                }
            }
            @if live {
                button.delete data-id=(a.id) title="Delete" { "✕" }
            }
        }
    }
}

fn render_add_form() -> Markup {
    html! {
        form #"add-form" .add-form {
            input name="title" placeholder="Assignment title" required;
            input name="course_name" placeholder="Course";
            input name="due_date" type="date" required;
            input name="due_time" type="time";
            input name="color" type="color" value="#3b82f6";
            button type="submit" { "Add" }
        }
    }
}

fn empty_text(bucket: PriorityBucket) -> &'static str {
    match bucket {
        PriorityBucket::Overdue => "Nothing overdue.",
        PriorityBucket::HighPriority => "Nothing urgent right now.",
        PriorityBucket::ComingUp => "Nothing coming up.",
        PriorityBucket::WorryLater => "Nothing on the horizon.",
        PriorityBucket::Completed => "No completed assignments yet.",
    }
}

/// Month grid page
pub fn render_calendar(month: &CalendarMonth) -> Markup {
    let (prev_year, prev_month) = month.previous();
    let (next_year, next_month) = month.next();

    layout(
        &month.title(),
        html! {
            header.top {
                h1 { "Scadenze" }
                nav {
                    a href="/" { "Dashboard" }
                    a href="/calendar" { "Calendar" }
                }
            }
            div.calendar-nav {
                a href={ "/calendar?year=" (prev_year) "&month=" (prev_month) } { "‹" }
                h2 { (month.title()) }
                a href={ "/calendar?year=" (next_year) "&month=" (next_month) } { "›" }
            }
            table.calendar {
                thead {
                    tr { @for name in WEEKDAYS { th { (name) } } }
                }
                tbody {
                    @for week in month.weeks() {
                        tr {
                            @for cell in week {
                                @match cell {
                                    Some(day) => {
                                        td class=(cell_class(day)) {
                                            span.day-number { (day.date.day()) }
                                            @for a in &day.assignments {
                                                div.calendar-item title=(a.title) { (a.title) }
                                            }
                                        }
                                    }
                                    None => { td.blank {} }
                                }
                            }
                        }
                    }
                }
            }
        },
        false,
    )
}

fn cell_class(day: &CalendarDay) -> String {
    let mut class = day.bucket.map(|b| b.as_str()).unwrap_or("").to_string();
    if day.is_today {
        class.push_str(" today");
    }
    class.trim().to_string()
}

fn layout(title: &str, body: Markup, scripts: bool) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container { (body) }
                @if scripts {
                    script { (PreEscaped(JAVASCRIPT)) }
                }
            }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #f5f7fb;
    color: #1f2937;
    line-height: 1.5;
}

.container {
    max-width: 960px;
    margin: 0 auto;
    padding: 32px 20px 60px;
}

header.top {
    display: flex;
    align-items: baseline;
    justify-content: space-between;
    margin-bottom: 20px;
}

h1 {
    font-size: 2.4em;
    font-weight: 800;
    letter-spacing: -0.02em;
}

nav a {
    margin-left: 16px;
    color: #4b5563;
    text-decoration: none;
    font-weight: 600;
}

.streak {
    display: flex;
    align-items: baseline;
    gap: 8px;
    padding: 14px 18px;
    border-radius: 12px;
    background: linear-gradient(90deg, #fff7ed, #ffedd5);
    margin-bottom: 16px;
}

.streak .value { font-size: 1.8em; font-weight: 800; color: #ea580c; }
.streak .next { margin-left: auto; color: #9a3412; font-size: 0.9em; }

.stats {
    display: grid;
    grid-template-columns: repeat(4, 1fr);
    gap: 12px;
    margin-bottom: 10px;
}

.stat {
    background: #fff;
    border-radius: 10px;
    padding: 12px;
    text-align: center;
    box-shadow: 0 1px 2px rgba(0,0,0,0.06);
}

.stat .value { display: block; font-size: 1.6em; font-weight: 700; }
.stat .label { color: #6b7280; font-size: 0.85em; }
.stat.overdue .value { color: #dc2626; }

.progress {
    height: 8px;
    background: #e5e7eb;
    border-radius: 4px;
    overflow: hidden;
    margin-bottom: 24px;
}

.progress-bar { height: 100%; background: #10b981; }

.reminders {
    background: #fef2f2;
    border-radius: 10px;
    padding: 12px 16px;
    margin-bottom: 20px;
}

.reminders ul { list-style: none; }
.reminders li.overdue { color: #b91c1c; font-weight: 600; }

.add-form {
    display: flex;
    flex-wrap: wrap;
    gap: 8px;
    margin-bottom: 24px;
}

.add-form input { padding: 8px; border: 1px solid #d1d5db; border-radius: 6px; }
.add-form input[name=title] { flex: 1; min-width: 200px; }
.add-form button, .delete {
    padding: 8px 14px;
    border: none;
    border-radius: 6px;
    cursor: pointer;
}
.add-form button { background: #2563eb; color: #fff; }

.celebration {
    padding: 16px;
    margin-bottom: 20px;
    border-radius: 10px;
    background: #fef9c3;
    font-weight: 700;
    text-align: center;
}

.bucket { margin-bottom: 28px; }
.bucket h2 { font-size: 1.2em; display: flex; gap: 8px; align-items: center; }
.bucket .count {
    background: #e5e7eb;
    border-radius: 999px;
    padding: 0 8px;
    font-size: 0.8em;
}
.bucket .description, .empty-state { color: #6b7280; font-size: 0.9em; margin-bottom: 8px; }

.assignment {
    display: flex;
    gap: 12px;
    align-items: flex-start;
    background: #fff;
    border-left: 4px solid #9ca3af;
    border-radius: 8px;
    padding: 12px;
    margin-bottom: 8px;
}

.overdue .assignment { border-left-color: #dc2626; }
.high-priority .assignment { border-left-color: #f97316; }
.coming-up .assignment { border-left-color: #eab308; }
.worry-later .assignment { border-left-color: #3b82f6; }
.completed .assignment { opacity: 0.6; }
.completed .assignment .title { text-decoration: line-through; }

.assignment .content { flex: 1; }
.assignment .title { font-weight: 600; }
.assignment .description { color: #4b5563; font-size: 0.9em; }
.assignment .meta { display: flex; gap: 12px; color: #6b7280; font-size: 0.85em; }
.assignment .remaining { font-weight: 600; }
.delete { background: transparent; color: #9ca3af; }
.delete:hover { color: #dc2626; }

.calendar-nav {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 12px;
}

.calendar-nav a { font-size: 1.6em; text-decoration: none; color: #2563eb; }

table.calendar {
    width: 100%;
    border-collapse: collapse;
    table-layout: fixed;
}

.calendar th { padding: 6px; color: #6b7280; font-size: 0.85em; }
.calendar td {
    height: 96px;
    vertical-align: top;
    background: #fff;
    border: 1px solid #e5e7eb;
    padding: 4px;
}
.calendar td.blank { background: transparent; }
.calendar td.today { outline: 2px solid #2563eb; }
.calendar td.overdue { background: #fee2e2; }
.calendar td.high-priority { background: #ffedd5; }
.calendar td.coming-up { background: #fef9c3; }
.calendar td.worry-later { background: #dbeafe; }
.day-number { font-weight: 700; font-size: 0.85em; }
.calendar-item {
    font-size: 0.75em;
    white-space: nowrap;
    overflow: hidden;
    text-overflow: ellipsis;
}

@media (max-width: 640px) {
    .stats { grid-template-columns: repeat(2, 1fr); }
    h1 { font-size: 1.8em; }
}
"#;

const JAVASCRIPT: &str = r#"
async function toggleAssignment(id) {
    const res = await fetch(`/api/assignments/${id}/toggle`, { method: 'POST' });
    if (!res.ok) return;
    const change = await res.json();
    if (change.milestone) {
        const banner = document.getElementById('celebration');
        banner.textContent = `🎉 ${change.milestone.days}-day streak! ${change.milestone.message}`;
        banner.hidden = false;
        setTimeout(() => location.reload(), 2500);
    } else {
        location.reload();
    }
}

async function deleteAssignment(id) {
    if (!confirm('Delete this assignment?')) return;
    const res = await fetch(`/api/assignments/${id}`, { method: 'DELETE' });
    if (res.ok) location.reload();
}

document.querySelectorAll('.toggle').forEach(box => {
    box.addEventListener('change', () => toggleAssignment(box.dataset.id));
});

document.querySelectorAll('.delete').forEach(button => {
    button.addEventListener('click', () => deleteAssignment(button.dataset.id));
});

const form = document.getElementById('add-form');
if (form) {
    form.addEventListener('submit', async event => {
        event.preventDefault();
        const data = Object.fromEntries(new FormData(form).entries());
        if (!data.due_time) delete data.due_time;
        const res = await fetch('/api/assignments', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify(data),
        });
        if (res.ok) {
            location.reload();
        } else {
            alert((await res.json()).error);
        }
    });
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Assignment;
    use chrono::NaiveDateTime;
    use scadenze_core::DueDate;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        DueDate::parse("2024-03-10T09:00").unwrap().at()
    }

    fn sample() -> Vec<Assignment> {
        let assignment = |id: &str, title: &str, due_date: &str| {
            Assignment::with_id(id.to_string(), title.to_string(), due_date.to_string())
        };
        let mut done = assignment("d", "Old quiz", "2024-03-01");
        done.completed = true;
        vec![assignment("a", "Math <homework>", "2024-03-11"), done]
    }

    #[test]
    fn test_render_dashboard() {
        let dash = Dashboard::build(&sample(), now(), StreakState::default());
        let page = render_dashboard(&dash, StreakState::default(), &[], true).into_string();

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Due tomorrow"));
        assert!(page.contains("🔥 High Priority"));
        // Titles are escaped
        assert!(page.contains("Math &lt;homework&gt;"));
        assert!(page.contains(r#"id="add-form""#));
        assert!(page.contains("3 to the next milestone"));
        assert!(page.contains(">day streak<"));
        assert!(!page.contains("days streak"));
    }

    #[test]
    fn test_completed_entry_with_unreadable_date_shows_raw_value() {
        let mut done =
            Assignment::with_id("d".to_string(), "Quiz".to_string(), "soonish".to_string());
        done.completed = true;
        let dash = Dashboard::build(&[done], now(), StreakState::default());
        let page = render_dashboard(&dash, StreakState::default(), &[], true).into_string();

        assert!(page.contains(r#"<span class="due">soonish</span>"#));
        assert!(!page.contains("Unreadable due dates"));
    }

    #[test]
    fn test_static_snapshot_is_read_only() {
        let dash = Dashboard::build(&sample(), now(), StreakState::default());
        let page = render_dashboard(&dash, StreakState::default(), &[], false).into_string();

        assert!(!page.contains("<script>"));
        assert!(!page.contains(r#"id="add-form""#));
        assert!(page.contains("disabled"));
    }

    #[test]
    fn test_render_calendar() {
        let month = CalendarMonth::build(2024, 3, &sample(), now()).unwrap();
        let page = render_calendar(&month).into_string();

        assert!(page.contains("March 2024"));
        assert!(page.contains("/calendar?year=2024&amp;month=4"));
        assert!(page.contains("/calendar?year=2024&amp;month=2"));
        assert!(page.contains("Math &lt;homework&gt;"));
        assert!(!page.contains("Old quiz"));
    }

    #[test]
    fn test_generate_html() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.html");
        let dash = Dashboard::build(&sample(), now(), StreakState::default());

        generate_html(&dash, StreakState::default(), &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Scadenze"));
    }
}
