use almanac_core::analytics::aggregate;
use almanac_core::calendar::bridge::{CalendarBridge, CalendarWidget, EventChange};
use almanac_core::calendar::{CalendarEvent, apply_calendar_edit, project_events, task_to_event, tasks_on_day};
use almanac_core::collection::TaskCollection;
use almanac_core::commands::parse_tasks;
use almanac_core::datetime::{days_between, parse_task_date};
use almanac_core::domain::{ALL_CATEGORIES, Domain};
use almanac_core::filter::{ViewState, filter_by_search_and_category, list_view};
use almanac_core::task::{Status, Task};
use almanac_core::validate::{FIELD_END_TIME, validate};
use almanac_core::window::TimeWindow;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Seoul;

const TASKS: &str = r#"[
  {"id": 1, "title": "A", "description": "Offsite", "category": "work",
   "priority": "high", "status": "in-progress",
   "startDate": "2025-08-01", "endDate": "2025-08-03"},
  {"id": 2, "title": "Standup", "category": "work", "priority": "medium",
   "status": "completed", "startDate": "2025-08-02", "endDate": "2025-08-02",
   "startTime": "09:00", "endTime": "09:15", "estimatedHours": 0.25},
  {"id": 3, "title": "Read chapter 4", "category": "study", "priority": "low",
   "status": "pending", "startDate": "2025-09-10"},
  {"id": 4, "title": "Broken", "category": "health", "priority": "low",
   "status": "on-hold", "startDate": "someday"}
]"#;

fn load() -> TaskCollection {
    parse_tasks(TASKS).expect("fixture parses")
}

fn date(raw: &str) -> NaiveDate {
    parse_task_date(raw).expect("valid date")
}

#[derive(Default)]
struct CountingWidget {
    last_render: Vec<CalendarEvent>,
    reverts: usize,
}

impl CalendarWidget for CountingWidget {
    fn render(&mut self, events: &[CalendarEvent]) {
        self.last_render = events.to_vec();
    }

    fn revert_last_edit(&mut self) {
        self.reverts += 1;
    }
}

#[test]
fn multi_day_task_projects_to_exclusive_all_day_event() {
    let tasks = load();
    let event = task_to_event(tasks.get(1).expect("task 1"), &Domain::default()).expect("project");

    assert_eq!(event.title, "A");
    assert_eq!(event.start, "2025-08-01");
    assert_eq!(event.end, "2025-08-04");
    assert!(event.all_day);

    let json = serde_json::to_value(&event).expect("serialize event");
    assert_eq!(json["allDay"], true);
    assert_eq!(json["extendedProps"]["originalTask"]["id"], 1);
}

#[test]
fn same_day_time_ordering() {
    let domain = Domain::default();
    let mut task = Task::draft("work");
    task.title = "Check".to_string();
    task.start_date = "2025-08-01".to_string();
    task.end_date = "2025-08-01".to_string();
    task.start_time = "09:00".to_string();
    task.end_time = "08:00".to_string();
    assert!(validate(&task, &domain).contains(FIELD_END_TIME));

    task.end_time = "10:00".to_string();
    assert!(validate(&task, &domain).is_empty());
}

#[test]
fn day_lookup_finds_spanning_task() {
    let tasks = load();
    let ids = tasks_on_day(tasks.tasks(), date("2025-08-02"))
        .into_iter()
        .map(|t| t.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn unparseable_task_is_isolated() {
    let tasks = load();
    let domain = Domain::default();

    let events = project_events(tasks.tasks(), &domain);
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.id != "4"));

    let mut view = ViewState::new(date("2025-08-15"));
    view.window = TimeWindow::Year;
    assert!(list_view(tasks.tasks(), &view).iter().all(|t| t.id != 4));

    let errors = validate(tasks.get(4).expect("task 4"), &domain);
    assert!(errors.contains("startDate"));
}

#[test]
fn drag_preserves_span_and_round_trips_timed_events() {
    let tasks = load();
    let trip = tasks.get(1).expect("task 1");
    let target = Seoul
        .with_ymd_and_hms(2025, 8, 30, 0, 0, 0)
        .single()
        .expect("valid time");
    let moved = apply_calendar_edit(trip, &target, None, true);
    assert_eq!(moved.start_date, "2025-08-30");
    assert_eq!(moved.end_date, "2025-09-01");
    assert_eq!(days_between(date(&moved.start_date), date(&moved.end_date)), 2);

    let standup = tasks.get(2).expect("task 2");
    let start = Seoul
        .with_ymd_and_hms(2025, 8, 2, 9, 0, 0)
        .single()
        .expect("valid time");
    let end = Seoul
        .with_ymd_and_hms(2025, 8, 2, 9, 15, 0)
        .single()
        .expect("valid time");
    assert_eq!(&apply_calendar_edit(standup, &start, Some(&end), false), standup);
}

#[test]
fn bridge_commits_then_reverts_bad_resize() {
    let tasks = load();
    let mut bridge = CalendarBridge::new(CountingWidget::default(), Domain::default());
    bridge.refresh(&tasks);
    assert_eq!(bridge.widget().last_render.len(), 3);

    let now = Utc::now();
    let next = bridge
        .on_event_change(
            &tasks,
            &EventChange {
                id: "2".to_string(),
                start: Utc.with_ymd_and_hms(2025, 8, 4, 13, 0, 0).single().expect("valid time"),
                end: Some(Utc.with_ymd_and_hms(2025, 8, 4, 14, 0, 0).single().expect("valid time")),
                all_day: false,
            },
            now,
        )
        .expect("move accepted");
    assert!(!next.ptr_eq(&tasks));
    assert_eq!(next.get(2).map(|t| t.start_date.as_str()), Some("2025-08-04"));
    assert_eq!(tasks.get(2).map(|t| t.start_date.as_str()), Some("2025-08-02"));

    let notice = bridge
        .on_event_change(
            &next,
            &EventChange {
                id: "2".to_string(),
                start: Utc.with_ymd_and_hms(2025, 8, 4, 13, 0, 0).single().expect("valid time"),
                end: Some(Utc.with_ymd_and_hms(2025, 8, 4, 12, 0, 0).single().expect("valid time")),
                all_day: false,
            },
            now,
        )
        .expect_err("end before start");
    assert_eq!(bridge.widget().reverts, 1);
    assert!(!notice.is_expired(now));
}

#[test]
fn analytics_over_filtered_views() {
    let domain = Domain::default();
    let empty = aggregate(&[], &domain);
    assert_eq!((empty.total, empty.completed, empty.in_progress, empty.pending), (0, 0, 0, 0));
    assert_eq!(empty.category_stats.len(), domain.categories.len());

    let tasks = load();
    let work = filter_by_search_and_category(tasks.tasks(), "", "work");
    let snapshot = aggregate(&work, &domain);
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.in_progress, 1);

    let all = aggregate(tasks.tasks(), &domain);
    let on_hold = all
        .status_stats
        .iter()
        .find(|s| s.name == Status::OnHold.as_key())
        .expect("on-hold entry");
    assert_eq!(on_hold.count, 1);
    assert_eq!(all.completed + all.in_progress + all.pending, 3);
    assert_eq!(
        filter_by_search_and_category(tasks.tasks(), "OFFSITE", ALL_CATEGORIES).len(),
        1
    );
}
