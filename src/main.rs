//! CLI entry point for `mimewalk`.

use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};

use mimewalk::config::{self, Config};
use mimewalk::error::MimeError;
use mimewalk::session::{BodyMode, HeaderMode, Session, ShowOptions};
use mimewalk::visitor::{ExtractTarget, ListFormat, Selector};

#[derive(Parser)]
#[command(
    name = "mimewalk",
    version,
    about = "Display, list, quote and extract the parts of MIME messages",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    show: ShowArgs,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Display messages with their parts rendered as text
    Show(ShowArgs),
    /// Print the part tree of each message
    List {
        /// Message files (read from stdin when omitted)
        files: Vec<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the plain-text parts of each message, for quoting
    Reply {
        /// Message files (read from stdin when omitted)
        files: Vec<PathBuf>,
    },
    /// Extract parts by number or file name
    Extract {
        /// Message file
        file: PathBuf,
        /// Part numbers or file names; all named parts when omitted
        selectors: Vec<String>,
        /// Write part contents to stdout instead of files
        #[arg(short = 'O', long)]
        stdout: bool,
        /// Directory to create files in
        #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
        directory: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args, Clone, Default)]
struct ShowArgs {
    /// Message files (read from stdin when omitted)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Print the header block as it appears in the message
    #[arg(short = 'H', long, conflicts_with_all = ["all_headers", "header_list"])]
    raw_headers: bool,

    /// Print all headers, decoded
    #[arg(short = 'L', long, conflicts_with = "header_list")]
    all_headers: bool,

    /// Colon-separated list of headers to print
    #[arg(short = 'F', long = "headers", value_name = "LIST")]
    header_list: Option<String>,

    /// Print headers only
    #[arg(short, long, conflicts_with = "raw_body")]
    quiet: bool,

    /// Print the body as it appears in the message
    #[arg(short, long)]
    raw_body: bool,

    /// Do not pipe parts through filters
    #[arg(long)]
    no_filters: bool,
}

impl ShowArgs {
    fn options(&self, config: &Config) -> ShowOptions {
        let headers = if self.raw_headers {
            HeaderMode::Raw
        } else if self.all_headers {
            HeaderMode::All
        } else {
            HeaderMode::selected(
                self.header_list
                    .as_deref()
                    .unwrap_or(config.display.headers.as_str()),
            )
        };
        let body = if self.quiet {
            BodyMode::Skip
        } else if self.raw_body {
            BodyMode::Raw
        } else {
            BodyMode::Mime
        };
        ShowOptions {
            headers,
            body,
            filters: !self.no_filters,
            page_break: config.display.page_break,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        None => cmd_show(&cli.show, &config),
        Some(Commands::Show(args)) => cmd_show(&args, &config),
        Some(Commands::List { files, json }) => {
            let format = if json {
                ListFormat::Json
            } else {
                ListFormat::Text
            };
            cmd_list(&files, format)
        }
        Some(Commands::Reply { files }) => cmd_reply(&files),
        Some(Commands::Extract {
            file,
            selectors,
            stdout,
            directory,
        }) => {
            let target = if stdout {
                ExtractTarget::Console
            } else {
                ExtractTarget::Directory(directory)
            };
            cmd_extract(&file, &selectors, &target)
        }
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mimewalk.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// The files named on the command line, or one per line from stdin.
fn message_files(files: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files.to_vec());
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        anyhow::bail!("no message files given");
    }
    let mut paths = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(paths)
}

/// Run `op` for every file, reporting failures and carrying on.
///
/// Fails at the end if any file failed.
fn for_each_file(
    files: &[PathBuf],
    mut op: impl FnMut(&Path) -> mimewalk::error::Result<()>,
) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for path in files {
        if let Err(e) = op(path) {
            // reader went away, e.g. `mimewalk ... | head`
            if let MimeError::Output(ref io) = e {
                if io.kind() == std::io::ErrorKind::BrokenPipe {
                    break;
                }
            }
            eprintln!("mimewalk: {e}");
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} message(s) failed", files.len());
    }
    Ok(())
}

fn cmd_show(args: &ShowArgs, config: &Config) -> anyhow::Result<()> {
    let files = message_files(&args.files)?;
    let options = args.options(config);
    let filters = if options.filters {
        config::load_filters(config)
    } else {
        Default::default()
    };

    let stdout = std::io::stdout();
    let mut session = Session::new(stdout.lock(), filters);
    let result = for_each_file(&files, |path| session.show(path, &options));
    session.into_inner().flush()?;
    result
}

fn cmd_list(files: &[PathBuf], format: ListFormat) -> anyhow::Result<()> {
    let files = message_files(files)?;
    let stdout = std::io::stdout();
    let mut session = Session::new(stdout.lock(), Default::default());
    let result = for_each_file(&files, |path| session.list(path, format).map(|_| ()));
    session.into_inner().flush()?;
    result
}

fn cmd_reply(files: &[PathBuf]) -> anyhow::Result<()> {
    let files = message_files(files)?;
    let stdout = std::io::stdout();
    let mut session = Session::new(stdout.lock(), Default::default());
    let result = for_each_file(&files, |path| session.reply(path));
    session.into_inner().flush()?;
    result
}

fn cmd_extract(file: &Path, selectors: &[String], target: &ExtractTarget) -> anyhow::Result<()> {
    let selectors: Vec<Selector> = selectors.iter().map(|s| Selector::parse(s)).collect();
    let stdout = std::io::stdout();
    let mut session = Session::new(stdout.lock(), Default::default());
    let written = session.extract(file, &selectors, target)?;
    session.into_inner().flush()?;
    tracing::info!(files = written.len(), "Extraction finished");
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimewalk", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
