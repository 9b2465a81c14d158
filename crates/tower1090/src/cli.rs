//! Command-line flags plus the interactive prompts that collect whatever
//! the flags left out. Prompts re-ask on invalid input and never abort.

use clap::Parser;
use sim1090::decode::cpr::Position;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Fleet size limit for a standard session
const MAX_AIRCRAFT: usize = 100;
/// Fleet size limit for large-scale exercises
const MAX_AIRCRAFT_EXERCISE: usize = 100_000;

#[derive(Debug, Parser)]
#[command(
    name = "tower1090",
    version,
    about = "Simulate ADS-B traffic, track live feeds and serve a merged view"
)]
pub struct Options {
    /// Downstream Beast consumer for the simulated traffic
    #[arg(long, default_value = "127.0.0.1:30001")]
    pub connect: String,

    /// Port accepting AVR/Beast feeds, on all interfaces
    #[arg(long, default_value_t = 30001)]
    pub listen: u16,

    /// Port of the HTTP view on 127.0.0.1
    #[arg(long, default_value_t = 8888)]
    pub http_port: u16,

    /// Seconds of silence before an aircraft leaves the view
    #[arg(long, short = 'x', default_value_t = 60)]
    pub expire: u64,

    /// Directory holding map tiles and leaflet assets
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    /// Center of the simulated traffic pattern, as "lat,lon"
    #[arg(long)]
    pub center: Option<Position>,

    /// Number of simulated aircraft
    #[arg(long)]
    pub count: Option<usize>,

    /// Raise the fleet limit for large-scale exercises
    #[arg(long, default_value_t = false)]
    pub exercise: bool,
}

impl Options {
    /// Resolve center and fleet size, prompting for anything missing.
    pub fn resolve(&self) -> io::Result<(Position, usize)> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        let latitude = match self.center {
            Some(position) => position.latitude,
            None => prompt_number(
                &mut lines,
                "Enter center latitude (e.g. 33.7490 for Atlanta)",
                -90.0,
                90.0,
            )?,
        };
        let longitude = match self.center {
            Some(position) => position.longitude,
            None => prompt_number(
                &mut lines,
                "Enter center longitude (e.g. -84.3880 for Atlanta)",
                -180.0,
                180.0,
            )?,
        };
        if !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("center out of range: {latitude},{longitude}"),
            ));
        }

        let max = if self.exercise {
            MAX_AIRCRAFT_EXERCISE
        } else {
            MAX_AIRCRAFT
        };
        let count = match self.count {
            Some(count) if (1..=max).contains(&count) => count,
            Some(count) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("aircraft count {count} not in 1..={max}"),
                ));
            }
            None => prompt_count(
                &mut lines,
                &format!("Enter number of aircraft (1-{max})"),
                max,
            )?,
        };

        Ok((
            Position {
                latitude,
                longitude,
            },
            count,
        ))
    }
}

fn read_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    prompt: &str,
) -> io::Result<String> {
    print!("{prompt}: ");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => line,
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed before input was complete",
        )),
    }
}

fn prompt_number(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    prompt: &str,
    min: f64,
    max: f64,
) -> io::Result<f64> {
    loop {
        match read_line(lines, prompt)?.trim().parse::<f64>() {
            Ok(value) if (min..=max).contains(&value) => return Ok(value),
            Ok(_) => println!("Value must be between {min} and {max}"),
            Err(_) => println!("Invalid input, please enter a number"),
        }
    }
}

fn prompt_count(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    prompt: &str,
    max: usize,
) -> io::Result<usize> {
    loop {
        match read_line(lines, prompt)?.trim().parse::<usize>() {
            Ok(value) if (1..=max).contains(&value) => return Ok(value),
            Ok(_) => println!("Value must be between 1 and {max}"),
            Err(_) => println!("Invalid input, please enter a whole number"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::parse_from(["tower1090"]);
        assert_eq!(options.connect, "127.0.0.1:30001");
        assert_eq!(options.listen, 30001);
        assert_eq!(options.http_port, 8888);
        assert_eq!(options.expire, 60);
        assert!(options.center.is_none());
    }

    #[test]
    fn center_flag_parses_coordinates() {
        let options = Options::parse_from([
            "tower1090",
            "--center",
            "33.749,-84.388",
            "--count",
            "8",
        ]);
        let (center, count) = options.resolve().unwrap();
        assert!((center.latitude - 33.749).abs() < 1e-9);
        assert!((center.longitude + 84.388).abs() < 1e-9);
        assert_eq!(count, 8);
    }

    #[test]
    fn count_limit_depends_on_exercise_mode() {
        let options =
            Options::parse_from(["tower1090", "--center", "0,0", "--count", "500"]);
        assert!(options.resolve().is_err());

        let options = Options::parse_from([
            "tower1090",
            "--exercise",
            "--center",
            "0,0",
            "--count",
            "500",
        ]);
        assert_eq!(options.resolve().unwrap().1, 500);
    }

    #[test]
    fn out_of_range_center_is_refused() {
        let options =
            Options::parse_from(["tower1090", "--center", "99,0", "--count", "5"]);
        assert!(options.resolve().is_err());
    }
}
