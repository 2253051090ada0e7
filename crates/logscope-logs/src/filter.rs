use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use logscope_types::{Classification, LogLevel, LogRecord};

/// Classification criterion for a filter
///
/// Distinguishes "only unclassified records" from "only records classified
/// as X". Leaving the criterion off the spec entirely means no constraint,
/// so unclassified records never match a value filter by accident.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassificationFilter {
    Unclassified,
    Is(Classification),
}

impl ClassificationFilter {
    fn matches(&self, classification: Option<Classification>) -> bool {
        match self {
            Self::Unclassified => classification.is_none(),
            Self::Is(wanted) => classification == Some(*wanted),
        }
    }
}

impl std::str::FromStr for ClassificationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unclassified") {
            return Ok(Self::Unclassified);
        }
        s.parse::<Classification>().map(Self::Is)
    }
}

/// User-chosen narrowing criteria for a record set
///
/// All criteria are optional and combined with logical AND; the default
/// spec matches everything. Date bounds are inclusive at both ends.
#[derive(Clone, Debug, Default)]
pub struct FilterSpec {
    /// Case-insensitive substring, matched against the message body,
    /// provider, channel and host (a hit in any keeps the record)
    pub search_text: Option<String>,

    pub level: Option<LogLevel>,

    pub channel: Option<String>,

    pub classification: Option<ClassificationFilter>,

    /// Inclusive lower timestamp bound
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive upper timestamp bound
    pub end_date: Option<DateTime<Utc>>,

    /// `None` places no constraint; `Some(false)` requires the flag unset
    pub alert: Option<bool>,

    pub trigger: Option<bool>,
}

impl FilterSpec {
    /// Restrict to a single local calendar day
    ///
    /// Expands the day to an inclusive range from local midnight through
    /// 23:59:59.999, converted to UTC. There is no separate single-day
    /// matching path.
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN);
        let end = day.and_hms_milli_opt(23, 59, 59, 999).unwrap();
        self.start_date = Some(local_to_utc(start));
        self.end_date = Some(local_to_utc(end));
        self
    }

    /// True when no criterion is set (the spec is the identity filter)
    pub fn is_empty(&self) -> bool {
        self.search_text.as_deref().is_none_or(str::is_empty)
            && self.level.is_none()
            && self.channel.is_none()
            && self.classification.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.alert.is_none()
            && self.trigger.is_none()
    }

    /// Check whether a record passes every present criterion
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(term) = &self.search_text {
            if !term.is_empty() {
                let term = term.to_lowercase();
                let in_message = record.message.join(" ").to_lowercase().contains(&term);
                if !in_message
                    && !record.provider.to_lowercase().contains(&term)
                    && !record.channel.to_lowercase().contains(&term)
                    && !record.event_host.to_lowercase().contains(&term)
                {
                    return false;
                }
            }
        }

        if let Some(level) = &self.level {
            if record.level != *level {
                return false;
            }
        }

        if let Some(channel) = &self.channel {
            if record.channel != *channel {
                return false;
            }
        }

        if let Some(classification) = &self.classification {
            if !classification.matches(record.classification) {
                return false;
            }
        }

        if let Some(start) = self.start_date {
            if record.timestamp < start {
                return false;
            }
        }

        if let Some(end) = self.end_date {
            if record.timestamp > end {
                return false;
            }
        }

        if let Some(alert) = self.alert {
            if record.alert != alert {
                return false;
            }
        }

        if let Some(trigger) = self.trigger {
            if record.trigger != trigger {
                return false;
            }
        }

        true
    }
}

/// Narrow a record set, preserving input order
///
/// Pure: the input is never mutated, and the same inputs always produce the
/// same output.
pub fn filter_records(records: &[LogRecord], spec: &FilterSpec) -> Vec<LogRecord> {
    records.iter().filter(|r| spec.matches(r)).cloned().collect()
}

fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Skipped by a DST gap; the naive reading is the best anchor left
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}
