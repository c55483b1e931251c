//! Calendar exports: a single `.ics` file or a `.zip` holding several.

use crate::domain::model::{CalendarActivity, CalendarEvent};
use crate::domain::services::aggregate::{count_by_month, count_by_quarter};
use crate::domain::services::dedup::dedup_events;
use crate::utils::error::{Result, ReviewError};
use chrono::{Datelike, NaiveDate};
use icalendar::parser::{read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

const FLOATING_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct CalendarParser {
    folder: PathBuf,
    year: i32,
}

/// `(start, date)` for a DTSTART/DTEND value. Zoned times keep their wall-clock value.
fn render_time(value: DatePerhapsTime) -> (String, NaiveDate) {
    match value {
        DatePerhapsTime::Date(date) => (date.to_string(), date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => (dt.to_rfc3339(), dt.date_naive()),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            (naive.format(FLOATING_FORMAT).to_string(), naive.date())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => {
            (date_time.format(FLOATING_FORMAT).to_string(), date_time.date())
        }
    }
}

/// Every titled VEVENT in `content`.
pub fn parse_ics(content: &str) -> std::result::Result<Vec<CalendarEvent>, String> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| e.to_string())?;
    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|vevent| {
            let title = vevent.find_prop("SUMMARY")?.val.to_string();
            let start = vevent
                .find_prop("DTSTART")
                .and_then(|p| DatePerhapsTime::try_from(p).ok())
                .map(render_time);
            let end = vevent
                .find_prop("DTEND")
                .and_then(|p| DatePerhapsTime::try_from(p).ok())
                .map(|v| render_time(v).0);

            Some(CalendarEvent {
                title,
                date: start.as_ref().map(|(_, date)| *date),
                start: start.map(|(text, _)| text),
                end,
                description: vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string()),
                location: vevent.find_prop("LOCATION").map(|p| p.val.to_string()),
            })
        })
        .collect())
}

fn is_ics(name: &str) -> bool {
    name.to_lowercase().ends_with(".ics")
}

impl CalendarParser {
    pub fn new(folder: impl Into<PathBuf>, year: i32) -> Self {
        Self {
            folder: folder.into(),
            year,
        }
    }

    fn parse_zip(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<CalendarEvent>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut events = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if !entry.is_file() || !is_ics(entry.name()) {
                continue;
            }
            let name = entry.name().to_string();
            let mut bytes = Vec::new();
            let parsed = entry
                .read_to_end(&mut bytes)
                .map_err(|e| e.to_string())
                .and_then(|_| parse_ics(&String::from_utf8_lossy(&bytes)));

            match parsed {
                Ok(parsed) => events.extend(parsed),
                Err(e) => tracing::warn!("Skipping {} in {}: {}", name, path.display(), e),
            }
        }
        Ok(events)
    }

    /// All events in `path` dated in the report year.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<CalendarEvent>> {
        let bytes = std::fs::read(path)?;
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

        let events = if is_zip {
            self.parse_zip(path, bytes)?
        } else {
            let content = String::from_utf8_lossy(&bytes);
            parse_ics(&content).map_err(|message| ReviewError::CalendarError {
                file: path.display().to_string(),
                message,
            })?
        };

        Ok(events
            .into_iter()
            .filter(|e| e.date.is_some_and(|d| d.year() == self.year))
            .collect())
    }

    /// Events of `calendar_file` (relative to the calendar folder), deduplicated
    /// and counted per month and quarter. A missing file yields no events.
    pub fn parse_user_calendar(&self, calendar_file: &str) -> Result<CalendarActivity> {
        let path = self.folder.join(calendar_file);
        if !path.is_file() {
            tracing::warn!("Calendar file not found: {}", path.display());
            return Ok(CalendarActivity::default());
        }

        tracing::info!("Parsing calendar file: {}", calendar_file);
        let events = dedup_events(self.parse_file(&path)?);
        let dates: Vec<NaiveDate> = events.iter().filter_map(|e| e.date).collect();

        Ok(CalendarActivity {
            total_events: events.len(),
            events_by_month: count_by_month(dates.iter().copied()),
            events_by_quarter: count_by_quarter(dates),
            events,
        })
    }
}
