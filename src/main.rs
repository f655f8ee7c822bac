use clap::Parser;
use form_designer::cli::commands::{
    cmd_init, cmd_inspect, cmd_load, cmd_migrate, cmd_save, cmd_values,
};
use form_designer::cli::config::{Cli, Commands, build_session_config, load_config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let session_config = build_session_config(&config, cli.trace.as_deref());

    // sessions spawn !Send tasks
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            match cli.command {
                Commands::Init { output, columns } => cmd_init(&output, columns)?,
                Commands::Inspect { doc } => cmd_inspect(&doc)?,
                Commands::Migrate { doc, output } => cmd_migrate(&doc, output.as_deref())?,
                Commands::Save { doc, store } => {
                    let fingerprint = cmd_save(&doc, &store, &session_config).await?;
                    println!("Fingerprint: {}", fingerprint);
                }
                Commands::Load { store, output } => {
                    if !cmd_load(&store, output.as_deref(), &session_config).await? {
                        std::process::exit(1);
                    }
                }
                Commands::Values { doc, store } => {
                    cmd_values(&doc, &store, &session_config).await?
                }
            }
            Ok::<(), Box<dyn std::error::Error>>(())
        })
        .await
}

/// Log to stderr. `RUST_LOG` wins; otherwise -v raises the level.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("form_designer={}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
