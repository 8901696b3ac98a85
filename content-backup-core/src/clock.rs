use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for the run gate, the archive folder and the run marker.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date on the host's local time zone; names the archive folder.
    fn local_today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one instant. Its local date is the UTC date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        FixedClock { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}
