//! 示例数据：数据源不可用时的固定兜底（时间相对当前时刻计算）

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::integrations::{CalendarEvent, EmailSummary, Task};

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn sample_tasks() -> Vec<Task> {
    let now = Utc::now();
    vec![
        Task {
            id: "sample-task-1".to_string(),
            title: "Draft Q3 OKRs".to_string(),
            status: "In Progress".to_string(),
            due: Some(iso(now + Duration::days(1))),
            url: "#".to_string(),
        },
        Task {
            id: "sample-task-2".to_string(),
            title: "Plan team offsite".to_string(),
            status: "Not Started".to_string(),
            due: Some(iso(now + Duration::days(3))),
            url: "#".to_string(),
        },
    ]
}

pub fn sample_events() -> Vec<CalendarEvent> {
    let now = Utc::now();
    vec![CalendarEvent {
        id: "sample-event-1".to_string(),
        summary: "Product sync".to_string(),
        start: iso(now + Duration::hours(2)),
        end: iso(now + Duration::hours(3)),
        hangout_link: None,
        description: Some("Align on the latest roadmap assumptions.".to_string()),
    }]
}

pub fn sample_emails() -> Vec<EmailSummary> {
    vec![EmailSummary {
        id: "sample-email-1".to_string(),
        subject: "Follow up: Design review".to_string(),
        from: "emma@example.com".to_string(),
        snippet: "Sharing the updated mocks ahead of tomorrow's meeting...".to_string(),
        internal_date: Some(iso(Utc::now())),
    }]
}
