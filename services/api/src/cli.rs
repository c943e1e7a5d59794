use crate::commands::{run_batch_predict, run_model_info, PredictArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scholar_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Scholar Risk",
    about = "Serve and run student academic-risk predictions from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Predict every student in a CSV export without storing the results
    Predict(PredictArgs),
    /// Describe the model artifacts found on the configured paths
    ModelInfo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Predict(args) => run_batch_predict(args),
        Command::ModelInfo => run_model_info(),
    }
}
