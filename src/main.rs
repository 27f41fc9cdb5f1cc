use anyhow::{Context, Result, bail};
use chess_tabulate::chess::{self, CompressionMode, DEFAULT_CHANNEL_CAPACITY, PipelineConfig};
use clap::Parser;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Convert PGN game archives (plain or zstd-compressed) into CSV.
#[derive(Debug, Parser)]
#[command(name = "chess-tabulate", version)]
struct Cli {
    /// Archive path or glob pattern. Matches are converted one after another.
    input: String,

    /// Output CSV path (single input only). Defaults to the input path with
    /// its extensions replaced by `.csv`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input decoding: auto, plain or zstd.
    #[arg(long, default_value = "auto", value_parser = CompressionMode::parse)]
    compression: CompressionMode,

    /// Completed games buffered between parser and writer.
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,
}

fn expand_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    if !(pattern.contains('*') || pattern.contains('?')) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("invalid glob pattern '{}'", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                log::warn!("Skipping unreadable glob match: {}", err);
                None
            }
        })
        .collect();

    if paths.is_empty() {
        bail!("no files match '{}'", pattern);
    }
    Ok(paths)
}

fn default_output(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("games");
    let stem = file_name.split('.').next().filter(|s| !s.is_empty()).unwrap_or(file_name);
    input.with_file_name(format!("{}.csv", stem))
}

/// Pair every input with its output path. Rejects outputs shared by two
/// inputs and outputs that would overwrite one of the inputs.
fn plan_outputs(inputs: Vec<PathBuf>, output: Option<PathBuf>) -> Result<Vec<(PathBuf, PathBuf)>> {
    if output.is_some() && inputs.len() > 1 {
        bail!("--output cannot be used when the input matches {} files", inputs.len());
    }

    let plan: Vec<(PathBuf, PathBuf)> = inputs
        .into_iter()
        .map(|input| {
            let target = output.clone().unwrap_or_else(|| default_output(&input));
            (input, target)
        })
        .collect();

    let input_set: HashSet<&Path> = plan.iter().map(|(input, _)| input.as_path()).collect();
    let mut claimed: HashMap<&Path, &Path> = HashMap::new();
    for (input, target) in &plan {
        if input_set.contains(target.as_path()) {
            bail!(
                "output '{}' for '{}' would overwrite an input archive",
                target.display(),
                input.display()
            );
        }
        if let Some(previous) = claimed.insert(target.as_path(), input.as_path()) {
            bail!(
                "'{}' and '{}' would both be written to '{}'",
                previous.display(),
                input.display(),
                target.display()
            );
        }
    }
    Ok(plan)
}

fn main() -> Result<()> {
    chess::log::init();
    let cli = Cli::parse();

    let config = PipelineConfig {
        channel_capacity: cli.channel_capacity,
        compression: cli.compression,
    };

    let plan = plan_outputs(expand_inputs(&cli.input)?, cli.output)?;
    for (input, output) in &plan {
        let summary = chess::convert_file(input, output, &config)
            .with_context(|| format!("converting '{}'", input.display()))?;
        println!(
            "{} -> {}: {} games",
            input.display(),
            output.display(),
            summary.serialize.rows
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_strips_all_extensions() {
        assert_eq!(
            default_output(Path::new("/data/lichess_db_2013-01.pgn.zst")),
            PathBuf::from("/data/lichess_db_2013-01.csv")
        );
        assert_eq!(default_output(Path::new("games.pgn")), PathBuf::from("games.csv"));
    }

    #[test]
    fn test_expand_inputs_plain_path() {
        assert_eq!(
            expand_inputs("games.pgn").unwrap(),
            vec![PathBuf::from("games.pgn")]
        );
    }

    #[test]
    fn test_expand_inputs_glob() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.pgn", "b.pgn", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.pgn", dir.path().display());

        let paths = expand_inputs(&pattern).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.extension().unwrap() == "pgn"));
    }

    #[test]
    fn test_expand_inputs_glob_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.pgn", dir.path().display());
        assert!(expand_inputs(&pattern).is_err());
    }

    #[test]
    fn test_plan_outputs_rejects_shared_default_output() {
        let inputs = vec![PathBuf::from("games.pgn"), PathBuf::from("games.pgn.zst")];
        let err = plan_outputs(inputs, None).unwrap_err().to_string();
        assert!(err.contains("games.csv"));
    }

    #[test]
    fn test_plan_outputs_rejects_input_as_output() {
        assert!(plan_outputs(vec![PathBuf::from("games.csv")], None).is_err());

        let inputs = vec![PathBuf::from("a.pgn"), PathBuf::from("a.csv")];
        assert!(plan_outputs(inputs, None).is_err());

        let explicit = Some(PathBuf::from("games.pgn"));
        assert!(plan_outputs(vec![PathBuf::from("games.pgn")], explicit).is_err());
    }

    #[test]
    fn test_plan_outputs_pairs_inputs() {
        let inputs = vec![PathBuf::from("a.pgn.zst"), PathBuf::from("b.pgn")];
        let plan = plan_outputs(inputs, None).unwrap();
        assert_eq!(
            plan,
            vec![
                (PathBuf::from("a.pgn.zst"), PathBuf::from("a.csv")),
                (PathBuf::from("b.pgn"), PathBuf::from("b.csv")),
            ]
        );

        let plan = plan_outputs(vec![PathBuf::from("a.pgn")], Some(PathBuf::from("out.csv")))
            .unwrap();
        assert_eq!(plan[0].1, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "chess-tabulate",
            "games.pgn.zst",
            "--compression",
            "ZSTD",
            "--channel-capacity",
            "8",
        ])
        .unwrap();
        assert_eq!(cli.compression, CompressionMode::Zstd);
        assert_eq!(cli.channel_capacity, 8);
        assert!(cli.output.is_none());

        assert!(Cli::try_parse_from(["chess-tabulate", "x", "--compression", "gzip"]).is_err());
    }
}
