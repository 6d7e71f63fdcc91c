//! CLI binary for the Dimensions client.
//!
//! Usage: dimcli query 'search publications for "malaria" return publications'

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use dimensions_client::config::{Credentials, DEFAULT_ENDPOINT, DEFAULT_INSTANCE};
    use dimensions_client::error::{DslError, Result};
    use dimensions_client::setup::{run_setup, SetupAnswers};
    use dimensions_client::{DslClient, DslResult, LoopOptions};
    use std::time::Duration;

    #[derive(Parser)]
    #[command(name = "dimcli", about = "Dimensions DSL API client", version)]
    struct Cli {
        /// Instance name in ~/.dimensions/dsl.ini
        #[arg(long, short, global = true, default_value = DEFAULT_INSTANCE)]
        instance: String,

        /// API endpoint (used with --user)
        #[arg(long, global = true)]
        endpoint: Option<String>,

        /// Username (overrides the credentials file)
        #[arg(long, global = true)]
        user: Option<String>,

        /// Password (prompted for when --user is given without it)
        #[arg(long, global = true)]
        password: Option<String>,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Run a single DSL query
        Query {
            /// DSL query
            query: String,
            /// Retries for unexpected HTTP statuses
            #[arg(short, long, default_value = "0")]
            retry: u32,
        },
        /// Run a loop query, fetching every page of results
        Loop {
            /// DSL query without limit/skip clauses
            query: String,
            /// Records per page
            #[arg(short, long, default_value = "1000")]
            page_size: u32,
            /// Stop after this many records
            #[arg(short, long)]
            max: Option<u64>,
            /// Pause between pages, in milliseconds
            #[arg(long, default_value = "1500")]
            pause_ms: u64,
            /// Abort the loop after this many seconds
            #[arg(long)]
            deadline_secs: Option<u64>,
            /// Return what was fetched when the 50 000 record skip window is reached
            #[arg(long)]
            allow_truncated: bool,
        },
        /// Describe the DSL schema or a single source
        Describe {
            /// Source name (e.g. publications)
            source: Option<String>,
        },
        /// Create or update a credentials-file instance
        Init {
            /// Skip the test login
            #[arg(long)]
            skip_validation: bool,
            /// Do not prompt; use flags and defaults
            #[arg(long, short)]
            yes: bool,
        },
    }

    fn resolve_credentials(cli: &Cli) -> Result<Credentials> {
        match &cli.user {
            Some(user) => {
                let password = match &cli.password {
                    Some(p) => p.clone(),
                    None => dialoguer::Password::new()
                        .with_prompt("Password")
                        .interact()
                        .map_err(|e| DslError::Config(format!("Failed to read password: {}", e)))?,
                };
                let endpoint = cli.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
                Credentials::new(endpoint, user.as_str(), password)
            }
            None => Credentials::from_profile(&cli.instance),
        }
    }

    fn print_result_table(result: &DslResult) {
        use comfy_table::{ContentArrangement, Table};

        if let Some(message) = result.error_message() {
            eprintln!("DSL error (HTTP {}): {}", result.status(), message);
            return;
        }

        if let Some(total) = result.total_count() {
            println!("Total matching records: {}", total);
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Key", "Records"]);
        for (key, count) in result.keys_and_count() {
            table.add_row(vec![key, count.to_string()]);
        }
        println!("{table}");

        if let Some(warnings) = result.get("_warnings").as_array() {
            for warning in warnings {
                eprintln!("warning: {}", warning.as_str().unwrap_or(&warning.to_string()));
            }
        }
    }

    fn print_result(result: &DslResult, output: OutputFormat) -> Result<()> {
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result.data())?),
            OutputFormat::Table => print_result_table(result),
        }
        Ok(())
    }

    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        if let Commands::Init {
            skip_validation,
            yes,
        } = cli.command
        {
            let answers = SetupAnswers {
                instance: Some(cli.instance.clone()),
                endpoint: cli.endpoint.clone(),
                username: cli.user.clone(),
                password: cli.password.clone(),
            };
            return run_setup(answers, skip_validation, yes).await;
        }

        let client = DslClient::connect(resolve_credentials(&cli)?).await?;

        match cli.command {
            Commands::Query { query, retry } => {
                let result = client.query_with_retry(&query, retry).await?;
                print_result(&result, cli.output)?;
            }

            Commands::Loop {
                query,
                page_size,
                max,
                pause_ms,
                deadline_secs,
                allow_truncated,
            } => {
                let mut options = LoopOptions::new()
                    .page_size(page_size)
                    .pause(Duration::from_millis(pause_ms))
                    .allow_truncation(allow_truncated);
                if let Some(max) = max {
                    options = options.max_records(max);
                }
                if let Some(secs) = deadline_secs {
                    options = options.deadline(Duration::from_secs(secs));
                }
                let result = client.query_iterative_with(&query, &options).await?;
                print_result(&result, cli.output)?;
            }

            Commands::Describe { source } => {
                let result = match source {
                    Some(source) => client.describe_source(&source).await?,
                    None => client.describe().await?,
                };
                println!("{}", serde_json::to_string_pretty(result.data())?);
            }

            Commands::Init { .. } => {}
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
