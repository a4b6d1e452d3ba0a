//! # Config-file parsing.
//!
//! One service per line, whitespace-separated fields in order:
//!
//! ```text
//! <executable-path> <service-name> <TCP|UDP> <port> <WAIT|NOWAIT>
//! ```
//!
//! Transport and concurrency tokens are case-insensitive. A line failing
//! any structural check yields no descriptor and is reported with its
//! line number; loading continues with the next line. At most `limit`
//! services are honored; additional lines are ignored silently.
//!
//! ## Rules
//! - Exactly five fields; blank lines are skipped.
//! - Path is capped at [`MAX_PATH_LEN`] bytes, name at [`MAX_NAME_LEN`].
//! - Port must be a decimal integer in 1-65535.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ParseError;
use crate::services::{ConcurrencyMode, ServiceConfig, Transport};

/// Byte cap for the executable path field.
pub const MAX_PATH_LEN: usize = 4096;
/// Byte cap for the service name field.
pub const MAX_NAME_LEN: usize = 255;

/// Result of loading a service table file.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Services honored, in file order, capped at the loader limit.
    pub services: Vec<ServiceConfig>,
    /// Rejected lines as `(line_number, reason)`, 1-based.
    pub rejected: Vec<(usize, ParseError)>,
}

/// Parses a single config line into a [`ServiceConfig`].
pub fn parse_line(line: &str) -> Result<ServiceConfig, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ParseError::FieldCount {
            found: fields.len(),
        });
    }

    let executable = fields[0];
    if executable.len() > MAX_PATH_LEN {
        return Err(ParseError::FieldTooLong {
            field: "executable path",
            limit: MAX_PATH_LEN,
        });
    }

    let name = fields[1];
    if name.len() > MAX_NAME_LEN {
        return Err(ParseError::FieldTooLong {
            field: "service name",
            limit: MAX_NAME_LEN,
        });
    }

    let transport = match fields[2].to_ascii_uppercase().as_str() {
        "TCP" => Transport::Stream,
        "UDP" => Transport::Datagram,
        other => {
            return Err(ParseError::Transport {
                token: other.to_string(),
            })
        }
    };

    // port 0 is not a dispatchable service port
    let port = match fields[3].parse::<u32>() {
        Ok(p) if (1..=65535).contains(&p) => p as u16,
        _ => {
            return Err(ParseError::Port {
                token: fields[3].to_string(),
            })
        }
    };

    let mode = match fields[4].to_ascii_uppercase().as_str() {
        "WAIT" => ConcurrencyMode::Wait,
        "NOWAIT" => ConcurrencyMode::Nowait,
        other => {
            return Err(ParseError::Mode {
                token: other.to_string(),
            })
        }
    };

    Ok(ServiceConfig {
        executable: PathBuf::from(executable),
        name: name.to_string(),
        transport,
        port,
        mode,
    })
}

/// Loads the service table from `path`, honoring at most `limit` services.
///
/// Rejected lines are collected with their 1-based line numbers. Lines
/// past the limit are not read further. An unreadable file is an error
/// for the caller to report; by policy the server still runs with an
/// empty table in that case.
pub fn load_services(path: &Path, limit: usize) -> io::Result<LoadOutcome> {
    let contents = fs::read_to_string(path)?;
    let mut outcome = LoadOutcome::default();

    for (number, line) in contents.lines().enumerate() {
        if outcome.services.len() >= limit {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(service) => outcome.services.push(service),
            Err(reason) => outcome.rejected.push((number + 1, reason)),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_line_fields_match_tokens() {
        let svc = parse_line("/bin/echo echoservice TCP 9007 NOWAIT").unwrap();
        assert_eq!(svc.executable, PathBuf::from("/bin/echo"));
        assert_eq!(svc.name, "echoservice");
        assert_eq!(svc.transport, Transport::Stream);
        assert_eq!(svc.port, 9007);
        assert_eq!(svc.mode, ConcurrencyMode::Nowait);
    }

    #[test]
    fn test_tokens_are_case_insensitive() {
        let svc = parse_line("/usr/bin/myworker worker udp 9100 wait").unwrap();
        assert_eq!(svc.transport, Transport::Datagram);
        assert_eq!(svc.mode, ConcurrencyMode::Wait);
    }

    #[test]
    fn test_single_field_line_is_rejected() {
        assert_eq!(
            parse_line("onlyonefield"),
            Err(ParseError::FieldCount { found: 1 })
        );
    }

    #[test]
    fn test_extra_field_is_rejected() {
        assert_eq!(
            parse_line("/bin/echo echo TCP 9007 NOWAIT surplus"),
            Err(ParseError::FieldCount { found: 6 })
        );
    }

    #[test]
    fn test_port_zero_is_rejected() {
        assert!(matches!(
            parse_line("/bin/echo echo TCP 0 NOWAIT"),
            Err(ParseError::Port { .. })
        ));
    }

    #[test]
    fn test_port_out_of_range_is_rejected() {
        assert!(matches!(
            parse_line("/bin/echo echo TCP 70000 NOWAIT"),
            Err(ParseError::Port { .. })
        ));
    }

    #[test]
    fn test_port_not_numeric_is_rejected() {
        assert!(matches!(
            parse_line("/bin/echo echo TCP http NOWAIT"),
            Err(ParseError::Port { .. })
        ));
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        assert_eq!(
            parse_line("/bin/echo echo SCTP 9007 NOWAIT"),
            Err(ParseError::Transport {
                token: "SCTP".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert_eq!(
            parse_line("/bin/echo echo TCP 9007 MAYBE"),
            Err(ParseError::Mode {
                token: "MAYBE".to_string()
            })
        );
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        let line = format!("/bin/echo {name} TCP 9007 NOWAIT");
        assert!(matches!(
            parse_line(&line),
            Err(ParseError::FieldTooLong { field: "service name", .. })
        ));
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("netvisor-parser-{name}-{}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_loader_skips_malformed_lines_and_keeps_counting() {
        let path = write_temp(
            "mixed",
            "/bin/echo echo TCP 9007 NOWAIT\nonlyonefield\n/bin/cat cat TCP 9008 WAIT\n",
        );
        let outcome = load_services(&path, 10).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(outcome.services.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, 2);
        assert_eq!(outcome.rejected[0].1, ParseError::FieldCount { found: 1 });
    }

    #[test]
    fn test_loader_honors_service_cap() {
        let mut contents = String::new();
        for i in 0..12 {
            contents.push_str(&format!("/bin/echo svc{i} TCP {} NOWAIT\n", 9100 + i));
        }
        let path = write_temp("cap", &contents);
        let outcome = load_services(&path, 10).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(outcome.services.len(), 10);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_loader_reports_unreadable_file() {
        let missing = std::env::temp_dir().join("netvisor-parser-definitely-missing");
        assert!(load_services(&missing, 10).is_err());
    }
}
