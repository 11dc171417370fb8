use bp_daily::args::Args;
use bp_daily::convert::{convert, ConvertOptions};
use log::info;
use std::path::Path;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    // Never replace an output file that already exists.
    let options = ConvertOptions::default();

    match convert(Path::new(&args.input), Path::new(&args.output), &options) {
        Ok(summary) => info!(
            "collated {} readings into {} days, at most {} in one day",
            summary.readings_read, summary.days_written, summary.max_readings_in_one_day
        ),
        Err(err) => {
            eprintln!("ERROR - {}", err);
            process::exit(err.exit_code());
        }
    }
}
