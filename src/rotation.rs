use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};
use std::fmt::Display;

/// How often the pick changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Rolls over at local midnight every day.
    Daily,
    /// Rolls over at local midnight between Sunday and Monday.
    Weekly,
}

/// ISO Monday of the week containing `date`.
pub fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `YYYY-MM-DD` seed string for `date`.
pub fn seed_for(cadence: Cadence, date: NaiveDate) -> String {
    let anchor = match cadence {
        Cadence::Daily => date,
        Cadence::Weekly => monday_of_week(date),
    };
    anchor.format("%Y-%m-%d").to_string()
}

/// Calendar date of `now` in the configured zone.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    tz.from_utc_datetime(&now.naive_utc()).date_naive()
}

fn rank(id: &str, seed: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// Picks the candidate whose `sha256(id || seed)` sorts lowest. Pure: the same
/// date and candidate set always give the same answer.
pub fn select_for_date<I, T>(cadence: Cadence, date: NaiveDate, candidates: I) -> Option<T>
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let seed = seed_for(cadence, date);
    let mut best: Option<([u8; 32], String, T)> = None;
    for c in candidates {
        let key = c.to_string();
        let digest = rank(&key, &seed);
        let better = match &best {
            None => true,
            // Digest collisions fall back to the id string so the order stays total.
            Some((d, k, _)) => (digest, key.as_str()) < (*d, k.as_str()),
        };
        if better {
            best = Some((digest, key, c));
        }
    }
    best.map(|(_, _, c)| c)
}
