use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

/// The format of the timestamps found in the first column of a blood
/// pressure export, e.g. `Jan 02 2020 08:15:00`.
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%b %d %Y %H:%M:%S";

/// The sortable form timestamps are rewritten to, e.g. `2020-01-02 08:15:00`.
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names of one reading, in the order they appear in a row.
pub const COLUMN_NAMES: [&str; 5] = ["Date Time", "Systolic", "Diastolic", "Pulse", "Note"];

/// Number of fields making up a single reading.
pub const FIELDS_PER_READING: usize = COLUMN_NAMES.len();

/// Whether a row is still destined for the output.
///
/// Every `Valid` stamp orders before `Discard`, so sorting a set of readings
/// by stamp leaves the discarded ones grouped at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stamp {
    /// The row carries a readable timestamp.
    Valid(NaiveDateTime),

    /// The row has no usable timestamp, or its fields have already been
    /// folded onto another row of the same day. Either way it is dropped.
    Discard,
}

impl Stamp {
    pub fn is_valid(&self) -> bool {
        matches!(self, Stamp::Valid(_))
    }

    /// The calendar day a valid stamp falls on.
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            Stamp::Valid(datetime) => Some(datetime.date()),
            Stamp::Discard => None,
        }
    }
}

/// A row of the working set: one reading, or after merging, every reading
/// taken on one day laid end to end.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub stamp: Stamp,
    pub fields: Vec<String>,
}

impl Reading {
    /// How many readings' worth of fields the row holds.
    pub fn reading_count(&self) -> usize {
        self.fields.len() / FIELDS_PER_READING
    }
}

/// The result of collating a set of readings into one row per day.
#[derive(Debug, PartialEq)]
pub struct DailyCollation {
    pub header: Vec<String>,
    pub days: Vec<Reading>,
    pub readings_discarded: usize,
    pub max_readings_in_one_day: usize,
}

/// Parses the first field of each row and rewrites it in its sortable form.
///
/// Rows whose first field cannot be parsed keep all of their fields but are
/// stamped for discard. Rows without any fields are stamped for discard too.
/// No row is added or removed.
pub fn normalize<I>(rows: I) -> Vec<Reading>
where
    I: IntoIterator<Item = Vec<String>>,
{
    rows.into_iter()
        .map(|mut fields| {
            let parsed = match fields.first() {
                Some(raw) if has_source_shape(raw) => {
                    NaiveDateTime::parse_from_str(raw, SOURCE_TIMESTAMP_FORMAT).ok()
                }
                _ => None,
            };

            match parsed {
                Some(datetime) => {
                    fields[0] = datetime.format(CANONICAL_TIMESTAMP_FORMAT).to_string();
                    Reading {
                        stamp: Stamp::Valid(datetime),
                        fields,
                    }
                }
                None => {
                    debug!("discarding reading with unreadable timestamp: {:?}", fields);
                    Reading {
                        stamp: Stamp::Discard,
                        fields,
                    }
                }
            }
        })
        .collect()
}

/// Checks the field widths chrono is lenient about: a three letter month,
/// a two digit day, a four digit year, and two digit minutes and seconds.
/// The hour may be one or two digits. Fields are separated by single spaces.
fn has_source_shape(raw: &str) -> bool {
    fn digits(text: &str, widths: &[usize]) -> bool {
        widths.contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit())
    }

    let parts: Vec<&str> = raw.split(' ').collect();
    let &[month, day, year, time] = parts.as_slice() else {
        return false;
    };
    let clock: Vec<&str> = time.split(':').collect();
    let &[hour, minute, second] = clock.as_slice() else {
        return false;
    };

    month.len() == 3
        && digits(day, &[2])
        && digits(year, &[4])
        && digits(hour, &[1, 2])
        && digits(minute, &[2])
        && digits(second, &[2])
}

/// Orders readings by timestamp, earliest first, with discarded rows last.
pub fn sort_chronologically(mut readings: Vec<Reading>) -> Vec<Reading> {
    readings.sort_by_key(|reading| reading.stamp);
    readings
}

/// Folds every reading onto the first reading of the same day.
///
/// The readings must already be in chronological order. Each absorbed row
/// gives up its fields and is stamped for discard; the row count does not
/// change. Returns the rows along with the largest number of readings that
/// ended up on any one day (at least 1).
pub fn merge_same_day(mut readings: Vec<Reading>) -> (Vec<Reading>, usize) {
    // The row collecting the current day, and the day it is collecting.
    let mut accumulator: Option<(usize, NaiveDate)> = None;
    let mut readings_accumulated_so_far = 1;
    let mut max_readings_in_one_day = 1;

    for index in 0..readings.len() {
        // Everything from the first discarded row onwards is discarded too.
        let day = match readings[index].stamp.day() {
            Some(day) => day,
            None => break,
        };

        match accumulator {
            Some((target, accumulated_day)) if accumulated_day == day => {
                let fields = std::mem::take(&mut readings[index].fields);
                readings[target].fields.extend(fields);
                readings[index].stamp = Stamp::Discard;
                readings_accumulated_so_far += 1;
            }
            _ => {
                max_readings_in_one_day = max_readings_in_one_day.max(readings_accumulated_so_far);
                accumulator = Some((index, day));
                readings_accumulated_so_far = 1;
            }
        }
    }

    // The final day has to be counted as well.
    max_readings_in_one_day = max_readings_in_one_day.max(readings_accumulated_so_far);

    (readings, max_readings_in_one_day)
}

/// Drops every row stamped for discard, keeping the order of the rest.
pub fn discard_marked(readings: Vec<Reading>) -> Vec<Reading> {
    let mut readings = sort_chronologically(readings);
    let kept = readings.partition_point(|reading| reading.stamp.is_valid());
    readings.truncate(kept);
    readings
}

/// Builds the output header: one numbered copy of the column names per
/// reading on the busiest day, e.g. `Date Time 1, ..., Note 1, Date Time 2, ...`.
pub fn build_header(max_readings_in_one_day: usize) -> Vec<String> {
    (1..=max_readings_in_one_day.max(1))
        .flat_map(|set_number| {
            COLUMN_NAMES
                .into_iter()
                .map(move |name| format!("{} {}", name, set_number))
        })
        .collect()
}

/// Runs the full pipeline over the body rows of a blood pressure export.
pub fn collate<I>(rows: I) -> DailyCollation
where
    I: IntoIterator<Item = Vec<String>>,
{
    let readings = sort_chronologically(normalize(rows));
    let unreadable = readings.iter().filter(|r| !r.stamp.is_valid()).count();
    debug!(
        "normalized {} readings, {} with unreadable timestamps",
        readings.len(),
        unreadable
    );

    let (readings, max_readings_in_one_day) = merge_same_day(readings);
    let header = build_header(max_readings_in_one_day);

    let total = readings.len();
    let days = discard_marked(readings);
    let merged = total - days.len() - unreadable;
    debug!(
        "merged {} readings into {} days, busiest day has {} readings",
        merged,
        days.len(),
        max_readings_in_one_day
    );

    DailyCollation {
        header,
        days,
        readings_discarded: unreadable,
        max_readings_in_one_day,
    }
}
