use crate::demo::{run_demo, run_stages, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Estate Pipeline",
    about = "Run and demonstrate the property listing and offer pipeline",
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
    /// Walk a listing from first offer to sale and print each step
    Demo(DemoArgs),
    /// Print the pipeline stage table
    Stages,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load a handful of sample listings before accepting traffic
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Stages => {
            run_stages();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["estate-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["estate-api", "serve", "--port", "8081", "--seed"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8081));
                assert!(args.seed);
                assert!(args.host.is_none());
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }

    #[test]
    fn demo_flags_parse() {
        let cli = Cli::try_parse_from(["estate-api", "demo", "--skip-inquiry"]).expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Demo(DemoArgs {
                skip_inquiry: true,
                ..
            }))
        ));
    }
}
