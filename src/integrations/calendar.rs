//! Google Calendar 客户端
//!
//! 使用外部提供的 access token（授权流程不在本 crate 内）。列出从当前时刻起的单次日程，按开始时间排序。

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Url;
use serde_json::{json, Value};

use crate::config::GoogleSection;
use crate::core::AgentError;
use crate::integrations::{
    check_status, http_client, CalendarEvent, CalendarSource, CreatedEvent, NewEvent,
};

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    cfg: GoogleSection,
}

impl GoogleCalendarClient {
    pub fn new(cfg: GoogleSection) -> Self {
        Self {
            client: http_client(cfg.timeout_secs),
            cfg,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AgentError> {
        AgentError::require(&[
            ("GOOGLE_ACCESS_TOKEN", self.cfg.access_token.as_deref()),
            ("GOOGLE_CALENDAR_ID", self.cfg.calendar_id.as_deref()),
        ])?;
        Ok((
            self.cfg.access_token.as_deref().unwrap_or_default(),
            self.cfg.calendar_id.as_deref().unwrap_or_default(),
        ))
    }

    /// {base}/calendars/{calendar_id}/events，calendar_id 按路径段编码
    fn events_url(&self, calendar_id: &str) -> Result<Url, AgentError> {
        let mut url = Url::parse(&self.cfg.calendar_base_url)
            .map_err(|e| AgentError::Source(format!("Invalid calendar base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AgentError::Source("Calendar base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);
        Ok(url)
    }
}

/// start / end 取 dateTime，全天日程退回 date
fn event_time(event: &Value, key: &str) -> String {
    event
        .get(key)
        .and_then(|t| t.get("dateTime").or_else(|| t.get("date")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_event(event: &Value) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        id: event.get("id")?.as_str()?.to_string(),
        summary: event
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("Untitled event")
            .to_string(),
        start: event_time(event, "start"),
        end: event_time(event, "end"),
        hangout_link: event.get("hangoutLink").and_then(Value::as_str).map(String::from),
        description: event.get("description").and_then(Value::as_str).map(String::from),
    })
}

fn event_body(event: &NewEvent) -> Value {
    let mut body = json!({
        "summary": event.summary,
        "start": { "dateTime": event.start },
        "end": { "dateTime": event.end },
    });
    if let Some(tz) = &event.time_zone {
        body["start"]["timeZone"] = json!(tz);
        body["end"]["timeZone"] = json!(tz);
    }
    if let Some(description) = &event.description {
        body["description"] = json!(description);
    }
    if let Some(attendees) = &event.attendees {
        body["attendees"] = attendees.iter().map(|email| json!({ "email": email })).collect();
    }
    body
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_upcoming(&self) -> Result<Vec<CalendarEvent>, AgentError> {
        let (token, calendar_id) = self.credentials()?;
        let time_min = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let resp = self
            .client
            .get(self.events_url(calendar_id)?)
            .bearer_auth(token)
            .query(&[
                ("maxResults", self.cfg.event_limit.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", time_min),
            ])
            .send()
            .await?;
        let data: Value = check_status(resp).await?.json().await?;
        Ok(data
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_event).collect())
            .unwrap_or_default())
    }

    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, AgentError> {
        let (token, calendar_id) = self.credentials()?;
        let resp = self
            .client
            .post(self.events_url(calendar_id)?)
            .bearer_auth(token)
            .query(&[("sendUpdates", "all")])
            .json(&event_body(&event))
            .send()
            .await?;
        let data: Value = check_status(resp).await?.json().await?;
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::Source("Calendar insert response missing id".to_string()))?;
        Ok(CreatedEvent {
            id: id.to_string(),
            link: data.get("htmlLink").and_then(Value::as_str).map(String::from),
        })
    }
}
