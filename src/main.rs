use clap::{Parser, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jobsync::config::ServerConfig;
use jobsync::repo::Repository;
use jobsync::runner::Task;
use jobsync::server::Server;
use jobsync::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "jobsync")]
#[command(version)]
#[command(about = "HTTP job runner and repository checkout manager")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Server(ServerArgs),

    /// Task commands
    Task {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Repository commands
    Repo {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: RepoCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to bind the HTTP gateway to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Parent directory of all repository checkouts
    #[arg(long, default_value = "builds")]
    build_root: PathBuf,

    /// Directory holding the record database
    #[arg(long, default_value = "db")]
    db_root: PathBuf,

    /// Remote name used when a create request does not name one
    #[arg(long, default_value = "origin")]
    remote: String,

    /// Shell used to run task commands
    #[arg(long, default_value = "sh")]
    shell: String,
}

// =============================================================================
// Client Arguments (shared by task and repo commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server base URL
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:8080")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum TaskCommands {
    /// Submit a command for background execution
    Submit {
        /// The command line to run (e.g., "ls -la")
        command: String,
    },
    /// Show one task
    Status {
        /// The task ID (UUID)
        task_id: String,
    },
    /// List all tasks
    List,
}

#[derive(clap::Subcommand, Debug)]
enum RepoCommands {
    /// Register and clone a repository
    Create {
        /// Remote URL
        url: String,

        /// Remote name (server default if omitted)
        #[arg(long)]
        remote: Option<String>,
    },
    /// Fast-forward a repository from its remote
    Pull {
        /// The repository ID (UUID)
        repo_id: String,
    },
    /// Show one repository, or all when no ID is given
    Status {
        /// The repository ID (UUID)
        repo_id: Option<String>,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = ServerConfig::new(listen_addr, args.build_root, args.db_root)
        .with_default_remote(args.remote)
        .with_shell(args.shell);

    tracing::info!(
        listen_addr = %config.listen_addr,
        build_root = %config.build_root.display(),
        db_root = %config.db_root.display(),
        "Starting jobsync server"
    );

    let shutdown = install_shutdown_handler()?;
    Server::open(config)?.run(shutdown).await
}

// =============================================================================
// Client Implementation
// =============================================================================

struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    fn new(addr: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: addr.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> CliResult<T> {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> CliResult<T> {
        let mut request = self.http.post(format!("{}{}", self.base, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::decode(request.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> CliResult<T> {
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown error");
            return Err(format!("{} ({})", message, status).into());
        }
        Ok(serde_json::from_value(body)?)
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_task(task: &Task) {
    println!("Task ID:   {}", task.id);
    println!("Command:   {}", task.command);
    println!("Status:    {}", task.status);
    if let Some(exit_code) = task.exit_code {
        println!("Exit Code: {}", exit_code);
    }
    if let Some(ref stdout) = task.stdout {
        println!("Output:");
        for line in stdout.lines() {
            println!("  {}", line);
        }
    }
    if let Some(ref error) = task.error {
        println!("Error:");
        for line in error.lines() {
            println!("  {}", line);
        }
    }
}

fn print_repository(repo: &Repository) {
    println!("Repository ID: {}", repo.id);
    println!("URL:           {}", repo.url);
    println!("Remote:        {}", repo.remote_name);
    println!("Directory:     {}", repo.directory.display());
    println!("Clone Status:  {}", repo.clone_status);
    if let Some(ref error) = repo.clone_error {
        println!("Clone Error:   {}", error);
    }
}

async fn handle_task(client: ClientArgs, command: TaskCommands) -> CliResult<()> {
    let api = ApiClient::new(&client.addr);

    match command {
        TaskCommands::Submit { command } => {
            let body = serde_json::json!({ "command": command });
            let response: serde_json::Value = api.post("/task/submit", Some(&body)).await?;
            match client.output {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Table => {
                    println!("Task submitted successfully!");
                    println!("Task ID: {}", response["id"].as_str().unwrap_or_default());
                }
            }
        }
        TaskCommands::Status { task_id } => {
            let task: Task = api.get(&format!("/task/status/{}", task_id)).await?;
            match client.output {
                OutputFormat::Json => print_json(&task)?,
                OutputFormat::Table => print_task(&task),
            }
        }
        TaskCommands::List => {
            let tasks: Vec<Task> = api.get("/task/status").await?;
            match client.output {
                OutputFormat::Json => print_json(&tasks)?,
                OutputFormat::Table => {
                    if tasks.is_empty() {
                        println!("No tasks found.");
                        return Ok(());
                    }
                    println!("{:<38} {:<10} COMMAND", "TASK ID", "STATUS");
                    println!("{}", "-".repeat(70));
                    for task in &tasks {
                        let cmd_display = if task.command.chars().count() > 20 {
                            format!("{}...", task.command.chars().take(17).collect::<String>())
                        } else {
                            task.command.clone()
                        };
                        println!("{:<38} {:<10} {}", task.id, task.status, cmd_display);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_repo(client: ClientArgs, command: RepoCommands) -> CliResult<()> {
    let api = ApiClient::new(&client.addr);

    let repo: Repository = match command {
        RepoCommands::Create { url, remote } => {
            let body = serde_json::json!({ "url": url, "remote_name": remote });
            api.post("/repo/create", Some(&body)).await?
        }
        RepoCommands::Pull { repo_id } => {
            api.post::<_, ()>(&format!("/repo/pull/{}", repo_id), None)
                .await?
        }
        RepoCommands::Status {
            repo_id: Some(repo_id),
        } => api.get(&format!("/repo/status/{}", repo_id)).await?,
        RepoCommands::Status { repo_id: None } => {
            let repos: Vec<Repository> = api.get("/repo/status").await?;
            match client.output {
                OutputFormat::Json => print_json(&repos)?,
                OutputFormat::Table => {
                    if repos.is_empty() {
                        println!("No repositories found.");
                    }
                    for (i, repo) in repos.iter().enumerate() {
                        if i > 0 {
                            println!();
                        }
                        print_repository(repo);
                    }
                }
            }
            return Ok(());
        }
    };

    match client.output {
        OutputFormat::Json => print_json(&repo)?,
        OutputFormat::Table => print_repository(&repo),
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => run_server(server_args).await?,
        Commands::Task { client, command } => handle_task(client, command).await?,
        Commands::Repo { client, command } => handle_repo(client, command).await?,
    }

    Ok(())
}
