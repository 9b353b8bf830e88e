use clap::{Parser, Subcommand};
use df_api::rest::health::init_start_time;
use df_api::{build_router, AppState};
use df_config::{ConfigPaths, FactoryConfig};
use dfactoryd::{
    daemon_base_url, format_app_line, is_process_alive, pid_looks_like_dfactoryd, read_pid_file,
    remove_pid_file, write_pid_file, DaemonClient,
};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "dfactoryd",
    version = dfactoryd::DAEMON_VERSION,
    about = "dApp factory daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground
    Run {
        /// Port to bind to (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create an app and launch its command
    Create {
        name: String,
        command: String,
        /// Arguments passed to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List managed apps
    List,
    /// Stop an app and its process tree
    Stop { id: Uuid },
    /// Stop an app and delete its workspace
    Remove { id: Uuid },
    /// Check daemon status
    Status,
    /// Print version
    Version,
}

fn read_pid(paths: &ConfigPaths) -> Option<u32> {
    read_pid_file(&paths.pid_path())
}

fn client() -> anyhow::Result<DaemonClient> {
    let config = FactoryConfig::load()?;
    Ok(DaemonClient::new(daemon_base_url(&config)))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run(port: Option<u16>) -> anyhow::Result<()> {
    let paths = ConfigPaths::new()?;
    let mut config = FactoryConfig::load_from(&paths)?;
    if let Some(port) = port {
        config.port = port;
        config.validate()?;
    }

    if let Some(pid) = read_pid(&paths) {
        if is_process_alive(pid) && pid_looks_like_dfactoryd(pid) {
            anyhow::bail!(
                "Daemon already running (PID {}). Stop it before starting another.",
                pid
            );
        }
        tracing::warn!("Removing stale PID file for process {}", pid);
        remove_pid_file(&paths.pid_path());
    }

    paths.ensure_config_dir()?;
    write_pid_file(&paths.pid_path())?;

    init_start_time();

    let state = AppState::new(config.clone())?;
    let factory = state.factory.clone();
    let app = build_router(state);

    let addr: SocketAddr = config.bind_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    println!("dApp factory daemon running...");
    println!();
    println!("  API:  http://{}", addr);
    println!();

    let shutdown = async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutting down...");
        factory.shutdown().await;
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    remove_pid_file(&paths.pid_path());
    served?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dfactoryd=info,df_api=info,df_factory=info,df_supervisor=info,app_output=info,tower_http=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port } => run(port).await,

        Commands::Create {
            name,
            command,
            args,
        } => {
            let created = client()?.create(&name, &command, &args).await?;
            println!("{}", created.id);
            for warning in &created.warnings {
                eprintln!("warning: {}", warning);
            }
            Ok(())
        }

        Commands::List => {
            let apps = client()?.list().await?;
            if apps.is_empty() {
                println!("No apps.");
            }
            for app in &apps {
                println!("{}", format_app_line(app));
            }
            Ok(())
        }

        Commands::Stop { id } => {
            client()?.stop(&id).await?;
            println!("Stopped {}", id);
            Ok(())
        }

        Commands::Remove { id } => {
            client()?.remove(&id).await?;
            println!("Removed {}", id);
            Ok(())
        }

        Commands::Status => {
            let paths = ConfigPaths::new()?;
            match read_pid(&paths) {
                Some(pid) if is_process_alive(pid) && pid_looks_like_dfactoryd(pid) => {
                    println!("Daemon is running (PID {})", pid);
                    match client()?.health().await {
                        Ok(health) => {
                            println!("Version: {}", health.version);
                            println!("Uptime: {}s", health.uptime_secs);
                            println!("Apps: {}", health.apps);
                        }
                        Err(_) => {
                            println!("(Could not reach health endpoint)");
                        }
                    }
                }
                Some(pid) => {
                    println!("Daemon is not running (stale PID file for {}).", pid);
                    remove_pid_file(&paths.pid_path());
                }
                None => {
                    println!("Daemon is not running.");
                }
            }
            Ok(())
        }

        Commands::Version => {
            println!("dfactoryd {}", dfactoryd::DAEMON_VERSION);
            Ok(())
        }
    }
}
