use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Error as IOError;
use std::num::{ParseFloatError, ParseIntError};
use std::path::Path;
use std::str::from_utf8;
use std::str::FromStr;
use std::str::Utf8Error;

use logger::{Level, Logger};
use skiplist::{GeometricalLevelGenerator, MAX_LEVEL, P};

/// Tallest list the configuration accepts.
pub const MAX_LEVEL_LIMIT: usize = 64;

#[derive(Debug)]
pub struct Config {
    pub skiplist_max_level: usize,
    pub skiplist_p: f64,
    /// Seed for the level generator, entropy when `None`.
    pub skiplist_seed: Option<u64>,
    /// Run the skiplist self-check after every mutation.
    pub verify_invariants: bool,
    pub loglevel: Level,
    /// `None` keeps the logger's current output.
    pub logfile: Option<String>,
    pub syslog_enabled: bool,
    pub syslog_ident: String,
    pub syslog_facility: String,
    pub logger: Logger,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidFormat,
    InvalidParameter,
    IOError(IOError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::InvalidFormat => f.write_str("invalid configuration format"),
            ConfigError::InvalidParameter => f.write_str("invalid configuration parameter"),
            ConfigError::IOError(ref e) => write!(f, "cannot read configuration: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ConfigError::IOError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<IOError> for ConfigError {
    fn from(e: IOError) -> ConfigError {
        ConfigError::IOError(e)
    }
}

impl From<ParseIntError> for ConfigError {
    fn from(_: ParseIntError) -> ConfigError {
        ConfigError::InvalidParameter
    }
}

impl From<ParseFloatError> for ConfigError {
    fn from(_: ParseFloatError) -> ConfigError {
        ConfigError::InvalidParameter
    }
}

impl From<Utf8Error> for ConfigError {
    fn from(_: Utf8Error) -> ConfigError {
        ConfigError::InvalidParameter
    }
}

fn hex_digit(c: Option<&u8>) -> Option<u8> {
    c.and_then(|c| (*c as char).to_digit(16)).map(|d| d as u8)
}

fn is_separator(c: u8) -> bool {
    c == 0 || c.is_ascii_whitespace()
}

#[derive(PartialEq)]
enum Quote {
    Bare,
    Double,
    Single,
}

/// Splits a configuration line into arguments, honouring double quotes (with `\n`, `\xHH` and
/// friends) and single quotes (with `\'`).
///
/// # Examples
/// ```
/// # use config::split_args;
/// #
/// let res = split_args(b"hello world").unwrap();
/// assert_eq!(res, vec![b"hello".to_vec(), b"world".to_vec()]);
///
/// let res = split_args(b"foo \"bar baz\"").unwrap();
/// assert_eq!(res, vec![b"foo".to_vec(), b"bar baz".to_vec()]);
/// ```
pub fn split_args(line: &[u8]) -> Result<Vec<Vec<u8>>, ConfigError> {
    let mut i = 0;
    let mut result = Vec::new();
    loop {
        while i < line.len() && is_separator(line[i]) {
            i += 1;
        }
        if i >= line.len() {
            return Ok(result);
        }

        let mut quote = Quote::Bare;
        let mut done = false;
        let mut current = Vec::new();
        while !done && i < line.len() {
            let c = line[i];
            match quote {
                Quote::Double => match c {
                    b'\\' if line.get(i + 1) == Some(&b'x')
                        && hex_digit(line.get(i + 2)).is_some()
                        && hex_digit(line.get(i + 3)).is_some() =>
                    {
                        let hi = hex_digit(line.get(i + 2)).unwrap_or(0);
                        let lo = hex_digit(line.get(i + 3)).unwrap_or(0);
                        current.push(hi * 16 + lo);
                        i += 3;
                    }
                    b'\\' if i + 1 < line.len() => {
                        i += 1;
                        current.push(match line[i] {
                            b'n' => b'\n',
                            b'r' => b'\r',
                            b't' => b'\t',
                            b'b' => 0x08,
                            b'a' => 0x07,
                            other => other,
                        });
                    }
                    b'"' => {
                        // closing quote must be followed by a space or nothing at all
                        if i + 1 < line.len() && !is_separator(line[i + 1]) {
                            return Err(ConfigError::InvalidFormat);
                        }
                        done = true;
                    }
                    _ => current.push(c),
                },
                Quote::Single => match c {
                    b'\\' if line.get(i + 1) == Some(&b'\'') => {
                        current.push(b'\'');
                        i += 1;
                    }
                    b'\'' => {
                        if i + 1 < line.len() && !is_separator(line[i + 1]) {
                            return Err(ConfigError::InvalidFormat);
                        }
                        done = true;
                    }
                    _ => current.push(c),
                },
                Quote::Bare => match c {
                    b'"' => quote = Quote::Double,
                    b'\'' => quote = Quote::Single,
                    c if is_separator(c) => done = true,
                    _ => current.push(c),
                },
            }
            i += 1;
        }
        if !done && quote != Quote::Bare {
            // unterminated quotes
            return Err(ConfigError::InvalidFormat);
        }
        result.push(current);
    }
}

fn read_string(args: &[Vec<u8>]) -> Result<String, ConfigError> {
    if args.len() != 2 {
        Err(ConfigError::InvalidFormat)
    } else {
        Ok(from_utf8(&*args[1])?.to_owned())
    }
}

fn read_parse<T>(args: &[Vec<u8>]) -> Result<T, ConfigError>
where
    T: FromStr,
{
    let s = read_string(args)?;
    match s.parse() {
        Ok(f) => Ok(f),
        Err(_) => Err(ConfigError::InvalidParameter),
    }
}

fn read_bool(args: &[Vec<u8>]) -> Result<bool, ConfigError> {
    Ok(match &*read_string(args)? {
        "yes" => true,
        "no" => false,
        _ => return Err(ConfigError::InvalidFormat),
    })
}

impl Config {
    /// Default configuration.  `logger` receives the logging settings once a file is parsed;
    /// until a `logfile` is configured it keeps writing wherever it was created to write.
    pub fn new(logger: Logger) -> Config {
        Config {
            skiplist_max_level: MAX_LEVEL,
            skiplist_p: P,
            skiplist_seed: None,
            verify_invariants: false,
            loglevel: Level::Notice,
            logfile: None,
            syslog_enabled: false,
            syslog_ident: "sortedset".to_owned(),
            syslog_facility: "user".to_owned(),
            logger,
        }
    }

    /// Reads `key value` lines from a file, then applies the logging settings to the logger.
    pub fn parsefile<T: AsRef<Path>>(&mut self, fname: T) -> Result<(), ConfigError> {
        self.readfile(fname.as_ref())?;
        self.apply_logging()
    }

    fn readfile(&mut self, path: &Path) -> Result<(), ConfigError> {
        let file = BufReader::new(File::open(path)?);
        for line_iter in file.lines() {
            let lline = line_iter?;
            let line = lline.trim();
            if line.starts_with('#') {
                continue;
            }

            let args = split_args(line.as_bytes())?;
            if args.is_empty() {
                continue;
            }
            match &*args[0] {
                b"skiplist-max-level" => {
                    let level = read_parse(&args)?;
                    if level == 0 || level > MAX_LEVEL_LIMIT {
                        return Err(ConfigError::InvalidParameter);
                    }
                    self.skiplist_max_level = level;
                }
                b"skiplist-p" => {
                    let p: f64 = read_parse(&args)?;
                    if !(p > 0.0 && p < 1.0) {
                        return Err(ConfigError::InvalidParameter);
                    }
                    self.skiplist_p = p;
                }
                b"skiplist-seed" => self.skiplist_seed = Some(read_parse(&args)?),
                b"verify-invariants" => self.verify_invariants = read_bool(&args)?,
                b"loglevel" => self.loglevel = read_parse(&args)?,
                b"logfile" => {
                    let logfile = read_string(&args)?;
                    self.logfile = if logfile.is_empty() { None } else { Some(logfile) };
                }
                b"syslog-enabled" => self.syslog_enabled = read_bool(&args)?,
                b"syslog-ident" => self.syslog_ident = read_string(&args)?,
                b"syslog-facility" => self.syslog_facility = read_string(&args)?,
                b"include" => {
                    let included = read_string(&args)?;
                    self.readfile(Path::new(&included))?;
                }
                _ => return Err(ConfigError::InvalidFormat),
            };
        }

        Ok(())
    }

    fn apply_logging(&mut self) -> Result<(), ConfigError> {
        self.logger.set_loglevel(self.loglevel);
        if let Some(ref path) = self.logfile {
            self.logger.set_logfile(path)?;
        }
        if self.syslog_enabled {
            self.logger.set_syslog(&self.syslog_ident, &self.syslog_facility)?;
        } else {
            self.logger.disable_syslog();
        }
        Ok(())
    }

    /// Builds the level generator described by the configuration.
    pub fn level_generator(&self) -> GeometricalLevelGenerator {
        match self.skiplist_seed {
            Some(seed) => {
                GeometricalLevelGenerator::with_seed(self.skiplist_max_level, self.skiplist_p, seed)
            }
            None => GeometricalLevelGenerator::new(self.skiplist_max_level, self.skiplist_p),
        }
    }
}
