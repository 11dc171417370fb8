use crate::collator::{self, DailyCollation, COLUMN_NAMES};
use crate::errors::{BodyError, ConvertError, HeaderError, TargetError, WriteError};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Settings that shape a single conversion.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// Replace the output file when it already exists. A directory is never
    /// replaced, whatever this says.
    pub overwrite: bool,
}

/// What a finished conversion did.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionSummary {
    pub readings_read: usize,
    pub readings_discarded: usize,
    pub days_written: usize,
    pub max_readings_in_one_day: usize,
}

/// One body row of a blood pressure export.
#[derive(Debug, Deserialize)]
struct SourceReading {
    #[serde(rename = "Date Time")]
    date_time: String,
    #[serde(rename = "Systolic")]
    systolic: String,
    #[serde(rename = "Diastolic")]
    diastolic: String,
    #[serde(rename = "Pulse")]
    pulse: String,
    #[serde(rename = "Note")]
    note: String,
}

impl SourceReading {
    fn into_fields(self) -> Vec<String> {
        vec![
            self.date_time,
            self.systolic,
            self.diastolic,
            self.pulse,
            self.note,
        ]
    }
}

/// Reads the blood pressure CSV file at `input`, gathers the readings taken
/// on the same day onto a single row, and writes the rows in ascending date
/// order to a new CSV file at `output`.
///
/// Nothing is read when the output cannot be written. The output is built in
/// a staging file next to `output` and only moved into place once it has been
/// written in full, so a failed conversion leaves `output` as it was.
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionSummary, ConvertError> {
    check_output_target(output, options.overwrite)?;

    // The whole record set is held in memory anyway, so the file is loaded in
    // one go and checked for quoting mistakes the csv reader would accept.
    let contents =
        fs::read(input).map_err(|err| ConvertError::InputOpen(input.to_path_buf(), err))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(contents.as_slice());

    check_header(&mut reader)?;
    check_quoting(&contents)?;
    let rows = read_body(&mut reader)?;
    let readings_read = rows.len();
    debug!("read {} readings from {}", readings_read, input.display());

    let collation = collator::collate(rows);
    write_collation(output, &collation, options.overwrite)?;

    let summary = ConversionSummary {
        readings_read,
        readings_discarded: collation.readings_discarded,
        days_written: collation.days.len(),
        max_readings_in_one_day: collation.max_readings_in_one_day,
    };
    info!(
        "wrote {} days from {} readings to {} ({} discarded)",
        summary.days_written,
        summary.readings_read,
        output.display(),
        summary.readings_discarded
    );

    Ok(summary)
}

/// Decides, as far as can be known up front, whether `path` may be written.
pub fn check_output_target(path: &Path, overwrite: bool) -> Result<(), TargetError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Err(TargetError::IsDirectory(path.to_path_buf())),
        Ok(_) if !overwrite => Err(TargetError::AlreadyExists(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TargetError::Inaccessible(path.to_path_buf(), err)),
    }
}

/// Confirms the first record holds exactly the blood pressure column names.
fn check_header<R: io::Read>(reader: &mut csv::Reader<R>) -> Result<(), HeaderError> {
    let header = reader.headers().map_err(HeaderError::Unreadable)?;
    if header.is_empty() {
        return Err(HeaderError::Missing);
    }

    if !header.iter().eq(COLUMN_NAMES.iter().copied()) {
        return Err(HeaderError::Mismatch(
            header.iter().map(String::from).collect(),
        ));
    }

    Ok(())
}

/// Rejects quoting the csv reader would otherwise let through: a quoted field
/// still open at the end of the input, a `"` inside an unquoted field, and
/// anything but a delimiter or line end after a closing quote.
fn check_quoting(input: &[u8]) -> Result<(), BodyError> {
    let mut bytes = input.iter().copied().peekable();
    let mut line = 1;
    let mut field_start = true;

    while let Some(byte) = bytes.next() {
        match byte {
            b'"' if field_start => {
                let opened_on = line;
                loop {
                    match bytes.next() {
                        None => return Err(BodyError::UnterminatedQuote(opened_on)),
                        Some(b'"') if bytes.peek() == Some(&b'"') => {
                            bytes.next();
                        }
                        Some(b'"') => break,
                        Some(b'\n') => line += 1,
                        Some(_) => {}
                    }
                }

                match bytes.peek() {
                    None | Some(b',') | Some(b'\r') | Some(b'\n') => {}
                    Some(_) => return Err(BodyError::ExtraneousQuote(line)),
                }
                field_start = false;
            }
            b'"' => return Err(BodyError::BareQuote(line)),
            b',' => field_start = true,
            b'\n' => {
                line += 1;
                field_start = true;
            }
            _ => field_start = false,
        }
    }

    Ok(())
}

fn read_body<R: io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<Vec<String>>, BodyError> {
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let reading: SourceReading = result.map_err(BodyError::Malformed)?;
        rows.push(reading.into_fields());
    }

    Ok(rows)
}

fn write_collation(
    output: &Path,
    collation: &DailyCollation,
    overwrite: bool,
) -> Result<(), WriteError> {
    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(directory).map_err(WriteError::Stage)?;

    // A replaced file keeps its mode, a new one gets the usual default.
    let permissions = match fs::metadata(output) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(WriteError::Stage)?;
    }

    {
        // Days hold different numbers of readings, so rows vary in width.
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(staged.as_file());

        wtr.write_record(&collation.header)
            .map_err(WriteError::Header)?;
        for day in &collation.days {
            wtr.write_record(&day.fields).map_err(WriteError::Body)?;
        }

        wtr.flush().map_err(WriteError::Flush)?;
    }
    staged.as_file().sync_all().map_err(WriteError::Flush)?;

    let persisted = if overwrite {
        staged.persist(output)
    } else {
        staged.persist_noclobber(output)
    };
    persisted.map_err(|err| WriteError::Persist(err.error))?;

    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}
