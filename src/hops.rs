//! Hop collection by scraping the output of the platform trace utility.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::net::IpAddr;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hop {
    pub ip: IpAddr,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ip.fmt(f)
    }
}

/// Something that can produce the ordered list of hops towards a target.
pub trait HopSource {
    fn collect_hops(&self, target: &str) -> Result<Vec<Hop>>;
}

/// Extracts the hop address from one line of trace output.
///
/// Only lines that start with a hop number are considered, which skips the
/// `traceroute to ...` / `Tracing route to ...` banners even when they name
/// an address. The last token wins when it is an address (`tracert`);
/// otherwise the right-most bare address on the line is taken
/// (`traceroute -n`). `* * *` timeouts yield `None`.
pub fn parse_hop_line(line: &str) -> Option<Hop> {
    let mut tokens = line.split_whitespace();
    tokens.next()?.parse::<u32>().ok()?;
    tokens
        .rev()
        .find_map(|token| token.parse::<IpAddr>().ok())
        .map(|ip| Hop { ip })
}

/// Parses a whole trace transcript, keeping hop order and duplicates.
pub fn parse_hops<R: BufRead>(reader: R) -> Result<Vec<Hop>> {
    let mut hops = Vec::new();
    for line in reader.lines() {
        let line = line?;
        match parse_hop_line(&line) {
            Some(hop) => hops.push(hop),
            None => log::debug!("skipping trace line {line:?}"),
        }
    }
    Ok(hops)
}

/// Runs an external trace utility with numeric, IPv4-only output.
#[derive(Clone, Debug)]
pub struct CommandTracer {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandTracer {
    #[cfg(windows)]
    fn default() -> Self {
        CommandTracer {
            program: "tracert".to_owned(),
            args: vec!["-d".to_owned(), "-4".to_owned()],
        }
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        CommandTracer {
            program: "traceroute".to_owned(),
            args: vec!["-n".to_owned(), "-4".to_owned()],
        }
    }
}

impl HopSource for CommandTracer {
    fn collect_hops(&self, target: &str) -> Result<Vec<Hop>> {
        log::debug!("running {} {} {target}", self.program, self.args.join(" "));

        let spawn_error = |source| Error::TraceSpawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(target)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error)?;

        let hops = match child.stdout.take() {
            Some(stdout) => parse_hops(BufReader::new(stdout))?,
            None => Vec::new(),
        };

        let status = child.wait().map_err(spawn_error)?;
        if !status.success() {
            log::warn!("{} exited with {status}", self.program);
        }

        Ok(hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ips(hops: &[Hop]) -> Vec<String> {
        hops.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn skips_timeouts() {
        let out = "1  10.0.0.1  10ms\n2  * * *\n3  8.8.8.8  20ms\n";
        let hops = parse_hops(Cursor::new(out)).unwrap();
        assert_eq!(ips(&hops), vec!["10.0.0.1", "8.8.8.8"]);
    }

    #[test]
    fn tracert_transcript() {
        let out = "\r
Tracing route to example.com [93.184.216.34]\r
over a maximum of 30 hops:\r
\r
  1    <1 ms    <1 ms    <1 ms  192.168.1.1\r
  2     *        *        *     Request timed out.\r
  3    12 ms    11 ms    12 ms  93.184.216.34\r
\r
Trace complete.\r
";
        let hops = parse_hops(Cursor::new(out)).unwrap();
        assert_eq!(ips(&hops), vec!["192.168.1.1", "93.184.216.34"]);
    }

    #[test]
    fn traceroute_transcript() {
        let out = "traceroute to example.com (93.184.216.34), 30 hops max, 60 byte packets
 1  192.168.1.1  0.512 ms  0.480 ms  0.470 ms
 2  * * *
 3  10.10.0.1  3.1 ms 10.10.0.2  3.4 ms  3.3 ms
 4  93.184.216.34  11.0 ms  10.9 ms  11.2 ms
";
        let hops = parse_hops(Cursor::new(out)).unwrap();
        assert_eq!(
            ips(&hops),
            vec!["192.168.1.1", "10.10.0.2", "93.184.216.34"]
        );
    }

    #[test]
    fn banners_naming_the_target_are_not_hops() {
        let linux = "traceroute to 8.8.8.8 (8.8.8.8), 30 hops max, 60 byte packets
 1  192.168.1.1  0.512 ms  0.480 ms  0.470 ms
 2  8.8.8.8  11.0 ms  10.9 ms  11.2 ms
";
        let windows = "\r
Tracing route to 8.8.8.8 over a maximum of 30 hops\r
\r
  1    <1 ms    <1 ms    <1 ms  192.168.1.1\r
  2    12 ms    11 ms    12 ms  8.8.8.8\r
\r
Trace complete.\r
";
        for out in [linux, windows] {
            let hops = parse_hops(Cursor::new(out)).unwrap();
            assert_eq!(ips(&hops), vec!["192.168.1.1", "8.8.8.8"]);
        }
        assert_eq!(parse_hop_line("8.8.8.8 is the target"), None);
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let out = "1 10.0.0.1\n2 10.0.0.1\n3 2001:db8::1\n4 10.0.0.1\n";
        let hops = parse_hops(Cursor::new(out)).unwrap();
        assert_eq!(
            ips(&hops),
            vec!["10.0.0.1", "10.0.0.1", "2001:db8::1", "10.0.0.1"]
        );
    }

    #[test]
    fn rejects_non_literals() {
        for line in [
            "",
            "   ",
            "Trace complete.",
            "1  [10.0.0.1]",
            "1  (10.0.0.1)",
            "1  10.0.0.0/8",
            "1  256.1.1.1",
        ] {
            assert_eq!(parse_hop_line(line), None, "{line:?}");
        }
    }

    #[test]
    fn default_command_requests_numeric_ipv4() {
        let tracer = CommandTracer::default();
        assert!(tracer.args.iter().any(|a| a == "-4"));
        assert!(tracer.args.iter().any(|a| a == "-d" || a == "-n"));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_scraped() {
        let tracer = CommandTracer {
            program: "printf".to_owned(),
            args: vec!["banner %s\\n 1 10.0.0.1 1ms\\n 2 * * *\\n 3 8.8.4.4 2ms\\n".to_owned()],
        };
        let hops = tracer.collect_hops("example.com").unwrap();
        assert_eq!(ips(&hops), vec!["10.0.0.1", "8.8.4.4"]);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tracer = CommandTracer {
            program: "definitely-not-a-trace-utility".to_owned(),
            args: Vec::new(),
        };
        let err = tracer.collect_hops("example.com").unwrap_err();
        assert!(matches!(err, Error::TraceSpawn { .. }), "{err}");
    }
}
