//! The line-based `KEY = value` configuration file.

use crate::error::ConfigError;
use armc_abstraction::{Direction, RefinementHeuristic};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output format for printed automata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomataFormat {
    Dot,
    Timbuk,
    Fsa,
    Fsm,
}

impl AutomataFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AutomataFormat::Dot => "dot",
            AutomataFormat::Timbuk => "tmb",
            AutomataFormat::Fsa => "fsa",
            AutomataFormat::Fsm => "fsm",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AutomataFormat::Dot => "DOT",
            AutomataFormat::Timbuk => "TIMBUK",
            AutomataFormat::Fsa => "FSA",
            AutomataFormat::Fsm => "FSM",
        }
    }
}

/// Raster format for external rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Jpg,
    Pdf,
    Png,
    Svg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Gif => "gif",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Pdf => "pdf",
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Which automata seed a predicate abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPredicate {
    Init,
    Bad,
    Both,
}

/// How the initial bound of a finite-length abstraction is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialBound {
    One,
    Init,
    Bad,
}

/// How the bound grows on refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundIncrementKind {
    One,
    /// By the size of the spurious witness.
    X,
    /// By the size of the collapsed machine.
    M,
}

/// The selected abstraction with its options.
#[derive(Debug, Clone)]
pub enum AbstractionChoice {
    PredicateLanguages {
        initial_predicate: InitialPredicate,
        include_guard: bool,
        include_action: bool,
        heuristic: Option<RefinementHeuristic>,
    },
    FiniteLengthLanguages {
        trace_languages: bool,
        initial_bound: InitialBound,
        halve_initial_bound: bool,
        bound_increment: BoundIncrementKind,
        halve_bound_increment: bool,
    },
}

/// The full configuration. Every recognised key must appear exactly once.
#[derive(Debug, Clone)]
pub struct ArmcConfig {
    pub init_file_path: PathBuf,
    pub bad_file_path: PathBuf,
    pub tau_file_paths: Vec<PathBuf>,
    pub computation_direction: Direction,
    pub language_direction: Direction,
    /// `None` when the configured timeout is zero.
    pub timeout: Option<Duration>,
    pub verbose: bool,
    pub print_automata: bool,
    pub automata_format: AutomataFormat,
    pub output_directory: PathBuf,
    pub image_format: Option<ImageFormat>,
    pub abstraction: AbstractionChoice,
}

const KEYS: &[&str] = &[
    "INIT_FILE_PATH",
    "BAD_FILE_PATH",
    "TAU_FILE_PATHS",
    "COMPUTATION_DIRECTION",
    "LANGUAGE_DIRECTION",
    "TIMEOUT",
    "VERBOSE",
    "PRINT_AUTOMATA",
    "AUTOMATA_FORMAT",
    "OUTPUT_DIRECTORY",
    "IMAGE_FORMAT",
    "PREDICATE_LANGUAGES",
    "INITIAL_PREDICATE",
    "INCLUDE_GUARD",
    "INCLUDE_ACTION",
    "HEURISTIC",
    "FINITE_LENGTH_LANGUAGES",
    "TRACE_LANGUAGES",
    "INITIAL_BOUND",
    "HALVE_INITIAL_BOUND",
    "BOUND_INCREMENT",
    "HALVE_BOUND_INCREMENT",
];

impl ArmcConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut values: BTreeMap<&str, String> = BTreeMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: index + 1 });
            };
            let key = key.trim();
            let value = value.trim().to_string();
            let Some(&known) = KEYS.iter().find(|k| **k == key) else {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                });
            };
            if values.insert(known, value).is_some() {
                return Err(ConfigError::DuplicateKey {
                    key: key.to_string(),
                });
            }
        }
        for &key in KEYS {
            if !values.contains_key(key) {
                return Err(ConfigError::MissingKey { key });
            }
        }

        let predicate_languages = parse_yes_no("PREDICATE_LANGUAGES", &values["PREDICATE_LANGUAGES"])?;
        let finite_length = parse_yes_no("FINITE_LENGTH_LANGUAGES", &values["FINITE_LENGTH_LANGUAGES"])?;
        let abstraction = match (predicate_languages, finite_length) {
            (true, false) => AbstractionChoice::PredicateLanguages {
                initial_predicate: parse_initial_predicate(&values["INITIAL_PREDICATE"])?,
                include_guard: parse_yes_no("INCLUDE_GUARD", &values["INCLUDE_GUARD"])?,
                include_action: parse_yes_no("INCLUDE_ACTION", &values["INCLUDE_ACTION"])?,
                heuristic: parse_heuristic(&values["HEURISTIC"])?,
            },
            (false, true) => AbstractionChoice::FiniteLengthLanguages {
                trace_languages: parse_yes_no("TRACE_LANGUAGES", &values["TRACE_LANGUAGES"])?,
                initial_bound: parse_initial_bound(&values["INITIAL_BOUND"])?,
                halve_initial_bound: parse_yes_no(
                    "HALVE_INITIAL_BOUND",
                    &values["HALVE_INITIAL_BOUND"],
                )?,
                bound_increment: parse_bound_increment(&values["BOUND_INCREMENT"])?,
                halve_bound_increment: parse_yes_no(
                    "HALVE_BOUND_INCREMENT",
                    &values["HALVE_BOUND_INCREMENT"],
                )?,
            },
            _ => return Err(ConfigError::AbstractionSelection),
        };

        Ok(ArmcConfig {
            init_file_path: PathBuf::from(&values["INIT_FILE_PATH"]),
            bad_file_path: PathBuf::from(&values["BAD_FILE_PATH"]),
            tau_file_paths: std::env::split_paths(&values["TAU_FILE_PATHS"]).collect(),
            computation_direction: parse_direction(
                "COMPUTATION_DIRECTION",
                &values["COMPUTATION_DIRECTION"],
            )?,
            language_direction: parse_direction(
                "LANGUAGE_DIRECTION",
                &values["LANGUAGE_DIRECTION"],
            )?,
            timeout: parse_timeout(&values["TIMEOUT"])?,
            verbose: parse_yes_no("VERBOSE", &values["VERBOSE"])?,
            print_automata: parse_yes_no("PRINT_AUTOMATA", &values["PRINT_AUTOMATA"])?,
            automata_format: parse_format(&values["AUTOMATA_FORMAT"])?,
            output_directory: PathBuf::from(&values["OUTPUT_DIRECTORY"]),
            image_format: parse_image_format(&values["IMAGE_FORMAT"])?,
            abstraction,
        })
    }

    /// Render back to the properties syntax, for the input dump.
    pub fn to_properties(&self) -> String {
        let mut out = String::new();
        let yes_no = |b: bool| if b { "YES" } else { "NO" };
        let dir = |d: Direction| match d {
            Direction::Forward => "Forward",
            Direction::Backward => "Backward",
        };
        writeln!(out, "INIT_FILE_PATH = {}", self.init_file_path.display()).ok();
        writeln!(out, "BAD_FILE_PATH = {}", self.bad_file_path.display()).ok();
        let taus = std::env::join_paths(&self.tau_file_paths)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(out, "TAU_FILE_PATHS = {taus}").ok();
        writeln!(out, "COMPUTATION_DIRECTION = {}", dir(self.computation_direction)).ok();
        writeln!(out, "LANGUAGE_DIRECTION = {}", dir(self.language_direction)).ok();
        writeln!(out, "TIMEOUT = {}", format_timeout(self.timeout)).ok();
        writeln!(out, "VERBOSE = {}", yes_no(self.verbose)).ok();
        writeln!(out, "PRINT_AUTOMATA = {}", yes_no(self.print_automata)).ok();
        writeln!(out, "AUTOMATA_FORMAT = {}", self.automata_format.as_str()).ok();
        writeln!(out, "OUTPUT_DIRECTORY = {}", self.output_directory.display()).ok();
        writeln!(
            out,
            "IMAGE_FORMAT = {}",
            self.image_format.map(ImageFormat::as_str).unwrap_or("")
        )
        .ok();
        match &self.abstraction {
            AbstractionChoice::PredicateLanguages {
                initial_predicate,
                include_guard,
                include_action,
                heuristic,
            } => {
                writeln!(out, "PREDICATE_LANGUAGES = YES").ok();
                let ip = match initial_predicate {
                    InitialPredicate::Init => "Init",
                    InitialPredicate::Bad => "Bad",
                    InitialPredicate::Both => "Both",
                };
                writeln!(out, "INITIAL_PREDICATE = {ip}").ok();
                writeln!(out, "INCLUDE_GUARD = {}", yes_no(*include_guard)).ok();
                writeln!(out, "INCLUDE_ACTION = {}", yes_no(*include_action)).ok();
                let h = match heuristic {
                    None => "",
                    Some(RefinementHeuristic::ImportantStates) => "ImportantStates",
                    Some(RefinementHeuristic::KeyStates) => "KeyStates",
                };
                writeln!(out, "HEURISTIC = {h}").ok();
                writeln!(out, "FINITE_LENGTH_LANGUAGES = NO").ok();
                writeln!(out, "TRACE_LANGUAGES = NO").ok();
                writeln!(out, "INITIAL_BOUND = One").ok();
                writeln!(out, "HALVE_INITIAL_BOUND = NO").ok();
                writeln!(out, "BOUND_INCREMENT = One").ok();
                writeln!(out, "HALVE_BOUND_INCREMENT = NO").ok();
            }
            AbstractionChoice::FiniteLengthLanguages {
                trace_languages,
                initial_bound,
                halve_initial_bound,
                bound_increment,
                halve_bound_increment,
            } => {
                writeln!(out, "PREDICATE_LANGUAGES = NO").ok();
                writeln!(out, "INITIAL_PREDICATE = Both").ok();
                writeln!(out, "INCLUDE_GUARD = NO").ok();
                writeln!(out, "INCLUDE_ACTION = NO").ok();
                writeln!(out, "HEURISTIC = ").ok();
                writeln!(out, "FINITE_LENGTH_LANGUAGES = YES").ok();
                writeln!(out, "TRACE_LANGUAGES = {}", yes_no(*trace_languages)).ok();
                let ib = match initial_bound {
                    InitialBound::One => "One",
                    InitialBound::Init => "Init",
                    InitialBound::Bad => "Bad",
                };
                writeln!(out, "INITIAL_BOUND = {ib}").ok();
                writeln!(out, "HALVE_INITIAL_BOUND = {}", yes_no(*halve_initial_bound)).ok();
                let bi = match bound_increment {
                    BoundIncrementKind::One => "One",
                    BoundIncrementKind::X => "X",
                    BoundIncrementKind::M => "M",
                };
                writeln!(out, "BOUND_INCREMENT = {bi}").ok();
                writeln!(
                    out,
                    "HALVE_BOUND_INCREMENT = {}",
                    yes_no(*halve_bound_increment)
                )
                .ok();
            }
        }
        out
    }

    /// The template written by `--generate-config`.
    pub fn default_template() -> &'static str {
        "\
# armc configuration

INIT_FILE_PATH = init.tmb
BAD_FILE_PATH = bad.tmb
TAU_FILE_PATHS = tau.tmb
COMPUTATION_DIRECTION = Forward
LANGUAGE_DIRECTION = Forward
# [d.]hh:mm:ss[.fffffff]; zero disables
TIMEOUT = 00:00:00
VERBOSE = NO
PRINT_AUTOMATA = YES
AUTOMATA_FORMAT = TIMBUK
OUTPUT_DIRECTORY = armc-output
# one of gif, jpg, pdf, png, svg; blank disables rendering
IMAGE_FORMAT =

# exactly one abstraction must be selected
PREDICATE_LANGUAGES = YES
INITIAL_PREDICATE = Both
INCLUDE_GUARD = NO
INCLUDE_ACTION = NO
# ImportantStates, KeyStates, or blank
HEURISTIC =

FINITE_LENGTH_LANGUAGES = NO
TRACE_LANGUAGES = NO
INITIAL_BOUND = One
HALVE_INITIAL_BOUND = NO
BOUND_INCREMENT = One
HALVE_BOUND_INCREMENT = NO
"
    }
}

fn parse_yes_no(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "YES" => Ok(true),
        "NO" => Ok(false),
        _ => Err(ConfigError::BadValue {
            key,
            value: value.to_string(),
            expected: "YES or NO",
        }),
    }
}

fn parse_direction(key: &'static str, value: &str) -> Result<Direction, ConfigError> {
    match value {
        "Forward" => Ok(Direction::Forward),
        "Backward" => Ok(Direction::Backward),
        _ => Err(ConfigError::BadValue {
            key,
            value: value.to_string(),
            expected: "Forward or Backward",
        }),
    }
}

fn parse_format(value: &str) -> Result<AutomataFormat, ConfigError> {
    match value {
        "DOT" => Ok(AutomataFormat::Dot),
        "TIMBUK" => Ok(AutomataFormat::Timbuk),
        "FSA" => Ok(AutomataFormat::Fsa),
        "FSM" => Ok(AutomataFormat::Fsm),
        _ => Err(ConfigError::BadValue {
            key: "AUTOMATA_FORMAT",
            value: value.to_string(),
            expected: "DOT, TIMBUK, FSA or FSM",
        }),
    }
}

fn parse_image_format(value: &str) -> Result<Option<ImageFormat>, ConfigError> {
    match value {
        "" => Ok(None),
        "gif" => Ok(Some(ImageFormat::Gif)),
        "jpg" => Ok(Some(ImageFormat::Jpg)),
        "pdf" => Ok(Some(ImageFormat::Pdf)),
        "png" => Ok(Some(ImageFormat::Png)),
        "svg" => Ok(Some(ImageFormat::Svg)),
        _ => Err(ConfigError::BadValue {
            key: "IMAGE_FORMAT",
            value: value.to_string(),
            expected: "gif, jpg, pdf, png, svg or blank",
        }),
    }
}

fn parse_initial_predicate(value: &str) -> Result<InitialPredicate, ConfigError> {
    match value {
        "Init" => Ok(InitialPredicate::Init),
        "Bad" => Ok(InitialPredicate::Bad),
        "Both" => Ok(InitialPredicate::Both),
        _ => Err(ConfigError::BadValue {
            key: "INITIAL_PREDICATE",
            value: value.to_string(),
            expected: "Init, Bad or Both",
        }),
    }
}

fn parse_heuristic(value: &str) -> Result<Option<RefinementHeuristic>, ConfigError> {
    match value {
        "" => Ok(None),
        "ImportantStates" => Ok(Some(RefinementHeuristic::ImportantStates)),
        "KeyStates" => Ok(Some(RefinementHeuristic::KeyStates)),
        _ => Err(ConfigError::BadValue {
            key: "HEURISTIC",
            value: value.to_string(),
            expected: "ImportantStates, KeyStates or blank",
        }),
    }
}

fn parse_initial_bound(value: &str) -> Result<InitialBound, ConfigError> {
    match value {
        "One" => Ok(InitialBound::One),
        "Init" => Ok(InitialBound::Init),
        "Bad" => Ok(InitialBound::Bad),
        _ => Err(ConfigError::BadValue {
            key: "INITIAL_BOUND",
            value: value.to_string(),
            expected: "One, Init or Bad",
        }),
    }
}

fn parse_bound_increment(value: &str) -> Result<BoundIncrementKind, ConfigError> {
    match value {
        "One" => Ok(BoundIncrementKind::One),
        "X" => Ok(BoundIncrementKind::X),
        "M" => Ok(BoundIncrementKind::M),
        _ => Err(ConfigError::BadValue {
            key: "BOUND_INCREMENT",
            value: value.to_string(),
            expected: "One, X or M",
        }),
    }
}

/// `[d.]hh:mm:ss[.fffffff]`; a zero span disables the timeout.
fn parse_timeout(value: &str) -> Result<Option<Duration>, ConfigError> {
    let bad = || ConfigError::BadValue {
        key: "TIMEOUT",
        value: value.to_string(),
        expected: "[d.]hh:mm:ss[.fffffff]",
    };
    let parts: Vec<&str> = value.split(':').collect();
    let [hours_part, minutes, seconds_part] = parts.as_slice() else {
        return Err(bad());
    };
    let (days, hours): (u64, u64) = match hours_part.split_once('.') {
        Some((d, h)) => (d.parse().map_err(|_| bad())?, h.parse().map_err(|_| bad())?),
        None => (0, hours_part.parse().map_err(|_| bad())?),
    };
    let minutes: u64 = minutes.parse().map_err(|_| bad())?;
    let (seconds, fraction): (u64, &str) = match seconds_part.split_once('.') {
        Some((s, f)) => (s.parse().map_err(|_| bad())?, f),
        None => (seconds_part.parse().map_err(|_| bad())?, ""),
    };
    if fraction.len() > 7 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let nanos = if fraction.is_empty() {
        0
    } else {
        let scale = 10u64.pow(7 - fraction.len() as u32);
        fraction.parse::<u64>().map_err(|_| bad())? * scale * 100
    };
    let total = Duration::from_secs(((days * 24 + hours) * 60 + minutes) * 60 + seconds)
        + Duration::from_nanos(nanos);
    Ok((total > Duration::ZERO).then_some(total))
}

fn format_timeout(timeout: Option<Duration>) -> String {
    let Some(t) = timeout else {
        return "00:00:00".to_string();
    };
    let secs = t.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    let frac = t.subsec_nanos() / 100;
    let mut out = String::new();
    if days > 0 {
        write!(out, "{days}.").ok();
    }
    write!(out, "{hours:02}:{minutes:02}:{seconds:02}").ok();
    if frac > 0 {
        write!(out, ".{frac:07}").ok();
    }
    out
}
