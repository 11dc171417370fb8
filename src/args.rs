use clap::{App, Arg};
use std::ffi::OsString;

pub struct Args {
    pub input: String,
    pub output: String,
}

impl Args {
    /// Parses the process arguments, exiting with a usage message when they
    /// are not exactly an input path and an output path.
    pub fn parse() -> Self {
        Self::from_matches(&app().get_matches())
    }

    pub fn parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            input: matches.value_of("input").unwrap_or_default().to_string(),
            output: matches.value_of("output").unwrap_or_default().to_string(),
        }
    }
}

fn app() -> App<'static, 'static> {
    App::new("bp_daily")
        .version("0.1.0")
        .about("Collates blood pressure readings into one CSV row per day")
        .arg(
            Arg::with_name("input")
                .index(1)
                .takes_value(true)
                .required(true)
                .help("path of the blood pressure CSV file to read from"),
        )
        .arg(
            Arg::with_name("output")
                .index(2)
                .takes_value(true)
                .required(true)
                .help("path of the daily CSV file to create"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_input_and_output_paths() {
        let args = Args::parse_from(["bp_daily", "readings.csv", "daily.csv"]).unwrap();
        assert_eq!(args.input, "readings.csv");
        assert_eq!(args.output, "daily.csv");
    }

    #[test]
    fn should_reject_a_missing_output_path() {
        assert!(Args::parse_from(["bp_daily", "readings.csv"]).is_err());
    }

    #[test]
    fn should_reject_extra_arguments() {
        assert!(Args::parse_from(["bp_daily", "readings.csv", "daily.csv", "more.csv"]).is_err());
    }
}
