use chrono::{Duration, Local, NaiveDateTime, Timelike};

use crate::catalog::DepartureTime;

/// Below this many milliseconds a departure counts as gone.
pub const CONSUMED_THRESHOLD_MS: i64 = 1000;

pub const DAY_ENDED: &str = "Dia Encerrado. Veja o próximo horário.";

/// Source of the current local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Departure {
    pub next: Option<DepartureTime>,
    pub following: Option<DepartureTime>,
    pub ms_until_next: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub departure: Departure,
    /// The departure found first was less than a second away and was skipped.
    pub consumed: bool,
}

/// Finds the next departure after `now`, the one after it and the time left.
///
/// A departure in the current minute has already left. When every departure
/// of the day is gone the first one of the list is taken for tomorrow.
pub fn next_departure(times: &[DepartureTime], now: NaiveDateTime) -> Departure {
    if times.is_empty() {
        return Departure::default();
    }

    let current_minute = now.hour() * 60 + now.minute();
    let today = now.date();

    match times
        .iter()
        .position(|time| time.minute_of_day() > current_minute)
    {
        Some(i) => {
            let next = times[i];
            let mut target = today.and_time(next.as_naive());
            if target < now {
                target += Duration::days(1);
            }

            Departure {
                next: Some(next),
                following: times.get(i + 1).copied(),
                ms_until_next: Some((target - now).num_milliseconds()),
            }
        }
        None => {
            let next = times[0];
            let target = (today + Duration::days(1)).and_time(next.as_naive());

            Departure {
                next: Some(next),
                following: Some(times.get(1).copied().unwrap_or(next)),
                ms_until_next: Some((target - now).num_milliseconds()),
            }
        }
    }
}

/// Same as [`next_departure`], but a departure less than a second away is
/// treated as gone and the one after it is returned instead. The countdown
/// still counts from `now`.
pub fn resolve(times: &[DepartureTime], now: NaiveDateTime) -> Resolution {
    let departure = next_departure(times, now);

    match departure.ms_until_next {
        Some(ms) if ms < CONSUMED_THRESHOLD_MS => {
            let mut after = next_departure(times, now + Duration::milliseconds(ms));
            after.ms_until_next = after.ms_until_next.map(|rest| rest + ms);

            Resolution {
                departure: after,
                consumed: true,
            }
        }
        _ => Resolution {
            departure,
            consumed: false,
        },
    }
}

/// Countdown text such as "1 hora, 2 minutos, 3 segundos" or "7 minutos".
/// Zero components are left out, except seconds when nothing else remains.
pub fn format_countdown(ms: Option<i64>) -> String {
    let ms = match ms {
        Some(ms) if ms >= 0 => ms,
        _ => return DAY_ENDED.to_owned(),
    };

    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = total_seconds % 3600 / 60;
    let seconds = total_seconds % 60;

    let mut parts = vec![];
    if hours > 0 {
        parts.push(unit(hours, "hora"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minuto"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(unit(seconds, "segundo"));
    }

    let separator = if parts.len() > 2 { ", " } else { " e " };
    parts.join(separator)
}

fn unit(value: i64, name: &str) -> String {
    format!("{} {}{}", value, name, if value > 1 { "s" } else { "" })
}
