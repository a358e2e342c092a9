use std::{
    path::PathBuf,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fake_user_agent::get_chrome_rua;
use ottscan::{CancellationToken, DashWindow, HttpClient, Scanner};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    ClientBuilder, Url,
};

#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct OttscanArgs {
    /// Debug output
    #[clap(long, alias = "debug", global = true)]
    verbose: bool,

    /// Threads limit
    #[clap(long, env = "OTTSCAN_THREADS", default_value = "10", global = true)]
    threads: u32,

    /// Cookies used to request manifests and segments
    #[clap(long, global = true)]
    cookies: Option<String>,

    /// HTTP Header used to request manifests and segments
    ///
    /// Custom header. eg. "User-Agent: xxxxx". A "Cookie" header here overrides --cookies.
    #[clap(short = 'H', long, global = true)]
    headers: Vec<String>,

    /// Skip the HEAD request sent to the manifest before resolving it
    #[clap(long, global = true)]
    no_preflight: bool,

    /// Presentation window in seconds used to enumerate DASH `$Number$` segments
    ///
    /// Defaults to the duration declared by the manifest.
    #[clap(long, global = true)]
    dash_window: Option<u64>,

    /// Print results as JSON lines
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: OttscanCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OttscanCommand {
    /// List variant streams of a manifest
    Streams {
        /// m3u8 or mpd url
        url: String,
    },

    /// List segments of every variant stream
    Segments {
        /// m3u8 or mpd url
        url: String,
    },

    /// Check that every segment is reachable
    Scan {
        /// m3u8 or mpd url
        url: String,
    },

    /// Download every variant stream
    Download {
        /// Output directory. A new temporary directory is used when absent.
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// m3u8 or mpd url
        url: String,
    },
}

impl OttscanCommand {
    fn url(&self) -> &str {
        match self {
            Self::Streams { url }
            | Self::Segments { url }
            | Self::Scan { url }
            | Self::Download { url, .. } => url,
        }
    }
}

impl OttscanArgs {
    fn client(&self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header: {header}"))?;
            headers.insert(
                HeaderName::from_str(key.trim()).context("Invalid header name")?,
                HeaderValue::from_str(value.trim()).context("Invalid header value")?,
            );
        }

        let builder = ClientBuilder::new()
            .default_headers(headers)
            .user_agent(get_chrome_rua())
            .timeout(Duration::from_secs(60));
        let client = HttpClient::new(builder)?;

        if let Some(cookies) = &self.cookies {
            let url = Url::parse(self.command.url())?;
            let cookies = cookies
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            client.add_cookies(cookies, &url);
        }

        Ok(client)
    }

    fn scanner(&self, cancellation: CancellationToken) -> anyhow::Result<Scanner> {
        let dash_window = match self.dash_window {
            Some(secs) => DashWindow::Fixed(Duration::from_secs(secs)),
            None => DashWindow::FromManifest,
        };

        Ok(Scanner::builder(self.command.url())
            .client(self.client()?)
            .max_concurrency(self.threads)
            .dash_window(dash_window)
            .preflight(!self.no_preflight)
            .cancellation(cancellation)
            .build()?)
    }
}

fn output_dir(output: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    Ok(match output {
        Some(output) => output,
        None => {
            let started_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
            std::env::temp_dir().join(format!("ottscan_{started_at}"))
        }
    })
}

async fn run(args: OttscanArgs, cancellation: CancellationToken) -> anyhow::Result<()> {
    let mut scanner = args.scanner(cancellation)?;
    tracing::info!("{} manifest: {}", scanner.format(), scanner.url());

    match args.command {
        OttscanCommand::Streams { .. } => {
            for stream in scanner.streams().await? {
                if args.json {
                    println!("{}", stream.to_json()?);
                } else {
                    println!(
                        "{}\t{}\t{} segments",
                        stream.name,
                        stream.url,
                        stream.segments.len()
                    );
                }
            }
        }
        OttscanCommand::Segments { .. } => {
            for segment in scanner.segments().await? {
                if args.json {
                    println!("{}", segment.to_json()?);
                } else {
                    match segment.byte_range {
                        Some(range) => println!("{}\t{}", segment.url, range.to_http_range()),
                        None => println!("{}", segment.url),
                    }
                }
            }
        }
        OttscanCommand::Scan { .. } => {
            let results = scanner.scan().await?;
            let mut unreachable = 0;
            for (segment, reachable) in results.iter() {
                if !reachable {
                    unreachable += 1;
                }
                if args.json {
                    println!(
                        "{}",
                        serde_json::json!({ "segment": segment, "reachable": reachable })
                    );
                } else {
                    println!("{}\t{}", if *reachable { "OK" } else { "FAIL" }, segment.url);
                }
            }
            eprintln!("{unreachable} of {} segments unreachable", results.len());
        }
        OttscanCommand::Download { output, .. } => {
            let output = output_dir(output)?;
            scanner.download(&output, args.threads).await?;

            let mut failed = 0;
            for (stream, files) in scanner.files() {
                for file in files {
                    match file.error() {
                        Some(e) => {
                            failed += 1;
                            tracing::warn!("{stream}: {} failed. {e}", file.file().display());
                        }
                        None => println!("{}", file.file().display()),
                    }
                }
            }
            eprintln!("downloaded to {} ({failed} failed)", output.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = OttscanArgs::parse();

    let default_level = if args.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancellation = CancellationToken::new();
    let trigger = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling.");
            trigger.cancel();
        }
    });

    run(args, cancellation).await
}
