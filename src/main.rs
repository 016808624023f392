use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use proxy_sweep::{
    proxy::sources::{load_from_folder, load_from_txt},
    CheckerConfig, ProxyChecker, ProxyType, SourceLoader,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Where candidate proxies are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Fetch listings from the URLs in a file
    Api,
    /// Read a single text file
    Txt,
    /// Read every .txt file below a directory
    Folder,
}

impl Mode {
    fn default_input(self) -> &'static str {
        match self {
            Mode::Api => "apis.txt",
            Mode::Txt => "proxies.txt",
            Mode::Folder => "sources",
        }
    }
}

/// Check HTTP and SOCKS proxies under a bounded concurrency ceiling
#[derive(Parser)]
#[command(name = "proxy-sweep")]
#[command(about = "Check HTTP and SOCKS proxies under a bounded concurrency ceiling")]
struct Cli {
    /// Candidate source; prompts when omitted
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Source path (defaults to apis.txt, proxies.txt or sources/ by mode)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Timeout in seconds
    #[arg(long, default_value = "4")]
    timeout: u64,

    /// Number of concurrent checks
    #[arg(short = 'n', long, default_value = "200")]
    concurrency: usize,

    /// Only check proxies of this type (http, socks4, socks5)
    #[arg(long)]
    only: Option<String>,

    /// No progress output and no exit prompt
    #[arg(short, long)]
    silent: bool,

    /// Directory under which timestamped result directories are created
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// URL to test proxies against
    #[arg(long, default_value = "https://www.google.com")]
    test_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("proxy_sweep", log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let mode = match cli.mode {
        Some(mode) => mode,
        None => prompt_mode()?,
    };
    let protocol_filter = cli.only.as_deref().map(str::parse::<ProxyType>).transpose()?;

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(mode.default_input()));

    let raw = match mode {
        Mode::Api => SourceLoader::new()?.load_from_apis(&input).await,
        Mode::Txt => load_from_txt(&input),
        Mode::Folder => load_from_folder(&input),
    };

    let config = CheckerConfig::new()
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_concurrency(cli.concurrency)
        .with_test_url(cli.test_url.clone())
        .with_protocol_filter(protocol_filter)
        .with_silent(cli.silent)
        .with_output_root(cli.output.clone());

    let checker = ProxyChecker::with_config(config);
    let candidates = checker.prepare(&raw);

    if !cli.silent {
        println!("Checking {} proxies...", candidates.len());
    }

    let summary = checker.check_candidates(candidates).await?;

    if let Some(dir) = &summary.output_dir {
        println!("\nResults saved in: {}", dir.display());
    }
    println!(
        "Done! Working: {} / {} | Time: {:.2}s",
        summary.working,
        summary.total,
        summary.elapsed.as_secs_f64()
    );

    if !cli.silent {
        print!("Press ENTER to exit...");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }

    Ok(())
}

fn prompt_mode() -> Result<Mode> {
    println!("Choose source:");
    println!("1. API (apis.txt)");
    println!("2. TXT (proxies.txt)");
    println!("3. Folder (sources/)");
    print!("Your choice: ");
    io::stdout().flush()?;

    let mut choice = String::new();
    io::stdin().lock().read_line(&mut choice)?;

    match choice.trim() {
        "1" => Ok(Mode::Api),
        "2" => Ok(Mode::Txt),
        "3" => Ok(Mode::Folder),
        other => Err(anyhow!("Invalid choice: {}", other)),
    }
}
