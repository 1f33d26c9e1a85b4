use imgdiff::{ComparisonRequest, ComparisonResult, DiffOptions, ImageDiff};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Options(imgdiff::ConfigError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Options(err) => write!(f, "invalid comparison options: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<imgdiff::ConfigError> for CliError {
    fn from(value: imgdiff::ConfigError) -> Self {
        Self::Options(value)
    }
}

#[derive(Debug, Default)]
struct Args {
    test_dir: Option<String>,
    out_files: Vec<String>,
    options_file: Option<String>,
    overrides: DiffOptions,
    json: bool,
    pretty: bool,
}

fn usage() -> &'static str {
    "imgdiff-cli\n\
\n\
USAGE:\n\
  imgdiff-cli [--zero-threshold <x>] [--rel-err <x>] [--options <file.json>] [--option <key>=<value>]... [--json] [--pretty] <test-dir> <file>...\n\
\n\
NOTES:\n\
  - Each <file> is compared as <test-dir>/<file> against <test-dir>/gold/<file>.\n\
  - --options reads a JSON object; --option and the shorthands override it.\n\
  - Exit status: 0 same, 1 different, 2 usage error, 3 I/O or options error.\n\
  - Set IMGDIFF_LOG (e.g. imgdiff=debug) for diagnostics on stderr.\n\
"
}

fn usage_err() -> CliError {
    CliError::Usage(usage().to_string())
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    let mut positional = Vec::new();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(usage_err()),
            "--json" => args.json = true,
            "--pretty" => args.pretty = true,
            "--zero-threshold" | "--rel-err" => {
                let Some(value) = it.next() else {
                    return Err(usage_err());
                };
                let key = a.trim_start_matches("--").replace('-', "_");
                args.overrides.set(&key, value).map_err(CliError::Usage)?;
            }
            "--option" => {
                let Some(pair) = it.next() else {
                    return Err(usage_err());
                };
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(CliError::Usage(format!(
                        "--option expects <key>=<value>, got `{pair}`"
                    )));
                };
                args.overrides
                    .set(key.trim(), value)
                    .map_err(CliError::Usage)?;
            }
            "--options" => {
                let Some(path) = it.next() else {
                    return Err(usage_err());
                };
                args.options_file = Some(path.clone());
            }
            "--" => positional.extend(it.by_ref().cloned()),
            other if other.starts_with('-') => return Err(usage_err()),
            path => positional.push(path.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    args.test_dir = positional.next();
    args.out_files = positional.collect();
    if args.test_dir.is_none() || args.out_files.is_empty() {
        return Err(usage_err());
    }
    Ok(args)
}

fn load_options(args: &Args) -> Result<DiffOptions, CliError> {
    let mut options = match args.options_file.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<DiffOptions>(&text)?
        }
        None => DiffOptions::default(),
    };
    options.merge(&args.overrides);
    Ok(options)
}

fn write_report(result: &ComparisonResult, json: bool, pretty: bool) -> Result<(), CliError> {
    if json {
        let stdout = std::io::stdout().lock();
        if pretty {
            serde_json::to_writer_pretty(stdout, result)?;
        } else {
            serde_json::to_writer(stdout, result)?;
        }
        println!();
        return Ok(());
    }

    if result.same() {
        println!("same");
    } else {
        println!("different");
        for message in result.messages() {
            println!("  {message}");
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<bool, CliError> {
    let options = load_options(&args)?;
    tracing::debug!(options = ?imgdiff::resolve_options(&options), "effective comparison options");
    let test_dir = args.test_dir.clone().unwrap_or_default();
    let request = ComparisonRequest::new(test_dir, args.out_files.iter()).with_options(options);
    let comparator = ImageDiff::new(request)?;
    let result = comparator.diff();
    write_report(&result, args.json, args.pretty)?;
    Ok(result.same())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("IMGDIFF_LOG").unwrap_or_else(|_| EnvFilter::new("imgdiff=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
    };

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
    }
}
