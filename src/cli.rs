use std::path::PathBuf;

use fat_inspector::config::{InspectConfig, OutputFormat};

pub const USAGE: &str = "\
Usage: fat-inspector [OPTIONS] <IMAGE>

Decode the MBR, FAT32 boot sectors, FS-Info sectors, FATs and root
directories of a raw disk image. Nothing is ever written to the image.

Options:
      --json             Print the report as JSON
      --max-chain <N>    Follow at most N clusters per file
      --no-deleted       Omit deleted directory entries
      --no-fat-compare   Do not compare FAT copies against FAT #0
      --config <PATH>    Read settings from PATH instead of the default locations
  -v, --verbose          More log output (repeatable)
  -q, --quiet            Less log output (repeatable)
  -h, --help             Show this help
  -V, --version          Show version
";

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Inspect(Args),
    Help,
    Version,
}

/// Parsed options. `None`/`false` means "keep the configured value".
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub image: PathBuf,
    pub json: bool,
    pub max_chain: Option<u32>,
    pub no_deleted: bool,
    pub no_fat_compare: bool,
    pub config: Option<PathBuf>,
    pub verbose: u8,
    pub quiet: u8,
}

impl Args {
    /// Command-line flags take precedence over the configuration file.
    pub fn apply_to(&self, config: &mut InspectConfig) {
        if self.json {
            config.format = OutputFormat::Json;
        }
        if self.max_chain.is_some() {
            config.max_chain_length = self.max_chain;
        }
        if self.no_deleted {
            config.include_deleted = false;
        }
        if self.no_fat_compare {
            config.compare_fat_copies = false;
        }
    }
}

pub fn parse<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut image = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--json" => parsed.json = true,
            "--no-deleted" => parsed.no_deleted = true,
            "--no-fat-compare" => parsed.no_fat_compare = true,
            "-v" | "--verbose" => parsed.verbose = parsed.verbose.saturating_add(1),
            "-q" | "--quiet" => parsed.quiet = parsed.quiet.saturating_add(1),
            "--max-chain" => {
                let value = args.next().ok_or("--max-chain needs a value")?;
                let n = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --max-chain value '{value}'"))?;
                if n == 0 {
                    return Err("--max-chain must be at least 1".into());
                }
                parsed.max_chain = Some(n);
            }
            "--config" => {
                let value = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option '{flag}'"));
            }
            _ if image.is_some() => return Err(format!("unexpected argument '{arg}'")),
            _ => image = Some(PathBuf::from(arg)),
        }
    }

    parsed.image = image.ok_or("missing image path")?;
    Ok(Command::Inspect(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Result<Command, String> {
        parse(args.iter().map(|s| s.to_string()))
    }

    fn inspect_args(args: &[&str]) -> Args {
        match parse_args(args) {
            Ok(Command::Inspect(args)) => args,
            other => panic!("expected inspect command, got {other:?}"),
        }
    }

    #[test]
    fn test_image_only() {
        let args = inspect_args(&["disk.img"]);
        assert_eq!(args.image, PathBuf::from("disk.img"));
        assert!(!args.json);
        assert_eq!(args.max_chain, None);
    }

    #[test]
    fn test_all_flags() {
        let args = inspect_args(&[
            "--json",
            "--max-chain",
            "128",
            "--no-deleted",
            "--no-fat-compare",
            "--config",
            "/tmp/c.json",
            "-v",
            "-v",
            "-q",
            "disk.img",
        ]);
        assert!(args.json);
        assert_eq!(args.max_chain, Some(128));
        assert!(args.no_deleted);
        assert!(args.no_fat_compare);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.json")));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.quiet, 1);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(&["-h"]), Ok(Command::Help));
        assert_eq!(parse_args(&["disk.img", "--version"]), Ok(Command::Version));
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse_args(&[]).unwrap_err().contains("missing image"));
        assert!(parse_args(&["--max-chain"]).is_err());
        assert!(parse_args(&["--max-chain", "lots", "a.img"]).is_err());
        assert!(parse_args(&["--max-chain", "0", "a.img"]).is_err());
        assert!(parse_args(&["--frobnicate", "a.img"])
            .unwrap_err()
            .contains("unknown option"));
        assert!(parse_args(&["a.img", "b.img"])
            .unwrap_err()
            .contains("unexpected argument"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = InspectConfig {
            max_chain_length: Some(10),
            ..Default::default()
        };
        inspect_args(&["--json", "--no-deleted", "a.img"]).apply_to(&mut config);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.include_deleted);
        assert!(config.compare_fat_copies);
        assert_eq!(config.max_chain_length, Some(10));

        inspect_args(&["--max-chain", "3", "a.img"]).apply_to(&mut config);
        assert_eq!(config.max_chain_length, Some(3));
    }
}
