use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use std::io;
use std::path::PathBuf;

/// Reasons the output path may not be written to.
#[derive(Debug)]
pub enum TargetError {
    IsDirectory(PathBuf),
    AlreadyExists(PathBuf),
    Inaccessible(PathBuf, io::Error),
}

#[derive(Debug)]
pub enum HeaderError {
    Unreadable(csv::Error),
    Missing,
    Mismatch(Vec<String>),
}

/// Ways the readings following the header can be malformed. Line numbers
/// are 1-based and count the header.
#[derive(Debug)]
pub enum BodyError {
    Malformed(csv::Error),
    UnterminatedQuote(u64),
    BareQuote(u64),
    ExtraneousQuote(u64),
}

#[derive(Debug)]
pub enum WriteError {
    Stage(io::Error),
    Header(csv::Error),
    Body(csv::Error),
    Flush(io::Error),
    Persist(io::Error),
}

/// Every way a conversion can fail. None of these are recoverable; the
/// conversion stops at the first one.
#[derive(Debug)]
pub enum ConvertError {
    Target(TargetError),
    InputOpen(PathBuf, io::Error),
    Header(HeaderError),
    Body(BodyError),
    Write(WriteError),
}

impl ConvertError {
    /// The process exit status to report for this failure. Each kind gets
    /// its own status so scripts can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::Target(_) => 3,
            ConvertError::InputOpen(_, _) => 4,
            ConvertError::Header(_) => 5,
            ConvertError::Body(_) => 6,
            ConvertError::Write(_) => 7,
        }
    }
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::IsDirectory(path) => {
                write!(f, "cannot overwrite a directory: {}", path.display())
            }
            TargetError::AlreadyExists(path) => {
                write!(f, "cannot overwrite existing file: {}", path.display())
            }
            TargetError::Inaccessible(path, err) => {
                write!(f, "cannot access output file ({}): {}", path.display(), err)
            }
        }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::Unreadable(err) => {
                write!(f, "failed to read blood pressure CSV header record: {}", err)
            }
            HeaderError::Missing => write!(
                f,
                "failed to read blood pressure CSV header record: input file is empty"
            ),
            HeaderError::Mismatch(found) => write!(
                f,
                "header record of input file does not match blood pressure CSV format, found [{}]",
                found.join(", ")
            ),
        }
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Malformed(err) => write!(f, "{}", err),
            BodyError::UnterminatedQuote(line) => {
                write!(f, "quoted field starting on line {} is never closed", line)
            }
            BodyError::BareQuote(line) => {
                write!(f, "bare \" in unquoted field on line {}", line)
            }
            BodyError::ExtraneousQuote(line) => {
                write!(f, "extraneous \" after quoted field on line {}", line)
            }
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Stage(err) => write!(f, "failed to open output file: {}", err),
            WriteError::Header(err) => write!(f, "failed to write header to output file: {}", err),
            WriteError::Body(err) => write!(
                f,
                "failed to write blood pressure data to output file: {}",
                err
            ),
            WriteError::Flush(err) => write!(f, "failed to flush output file: {}", err),
            WriteError::Persist(err) => {
                write!(f, "failed to move output file into place: {}", err)
            }
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Target(err) => write!(f, "unable to write output: {}", err),
            ConvertError::InputOpen(path, err) => {
                write!(f, "could not open input file {}: {}", path.display(), err)
            }
            ConvertError::Header(err) => write!(f, "{}", err),
            ConvertError::Body(err) => write!(f, "failed to read body of input file: {}", err),
            ConvertError::Write(err) => write!(f, "{}", err),
        }
    }
}

impl From<TargetError> for ConvertError {
    fn from(err: TargetError) -> Self {
        ConvertError::Target(err)
    }
}

impl From<HeaderError> for ConvertError {
    fn from(err: HeaderError) -> Self {
        ConvertError::Header(err)
    }
}

impl From<BodyError> for ConvertError {
    fn from(err: BodyError) -> Self {
        ConvertError::Body(err)
    }
}

impl From<WriteError> for ConvertError {
    fn from(err: WriteError) -> Self {
        ConvertError::Write(err)
    }
}

impl Error for TargetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TargetError::Inaccessible(_, err) => Some(err),
            _ => None,
        }
    }
}

impl Error for HeaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HeaderError::Unreadable(err) => Some(err),
            _ => None,
        }
    }
}

impl Error for BodyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BodyError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WriteError::Stage(err) | WriteError::Flush(err) | WriteError::Persist(err) => {
                Some(err)
            }
            WriteError::Header(err) | WriteError::Body(err) => Some(err),
        }
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConvertError::Target(err) => Some(err),
            ConvertError::InputOpen(_, err) => Some(err),
            ConvertError::Header(err) => Some(err),
            ConvertError::Body(err) => Some(err),
            ConvertError::Write(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_assign_distinct_exit_codes() {
        let errors = [
            ConvertError::Target(TargetError::IsDirectory(PathBuf::from("out"))),
            ConvertError::InputOpen(
                PathBuf::from("in.csv"),
                io::Error::new(io::ErrorKind::NotFound, "missing"),
            ),
            ConvertError::Header(HeaderError::Missing),
            ConvertError::Body(BodyError::UnterminatedQuote(2)),
            ConvertError::Write(WriteError::Flush(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            ))),
        ];

        // Every code is non-zero and no two kinds share one.
        let mut codes: Vec<i32> = errors.iter().map(ConvertError::exit_code).collect();
        assert!(codes.iter().all(|code| *code != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn should_name_the_stage_in_messages() {
        let err = ConvertError::from(TargetError::AlreadyExists(PathBuf::from("out.csv")));
        assert!(err.to_string().contains("cannot overwrite existing file"));

        let err = ConvertError::from(HeaderError::Mismatch(vec![
            String::from("Date"),
            String::from("Systolic"),
        ]));
        assert!(err
            .to_string()
            .contains("header record of input file does not match blood pressure CSV format"));
        assert!(err.to_string().contains("[Date, Systolic]"));
    }
}
