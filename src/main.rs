use clap::Parser;
use deghiblify::config::{load_dotenv, setup_logging};
use deghiblify::web::AppState;
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    load_dotenv();
    let cli = deghiblify::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return ExitCode::FAILURE;
    }

    let (client, pipeline) = match cli.openai.build_pipeline() {
        Ok(built) => built,
        Err(err) => {
            error!("Startup error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(&client, pipeline, cli.output_size, &cli.openai.output_prefix);

    if let Err(err) = deghiblify::web::setup_server(&cli.listen_address, cli.port, state).await {
        error!("Application error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
