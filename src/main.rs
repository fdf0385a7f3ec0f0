use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ip_context_tools::commands::{self, extract::ExtractArgs, resolve::ResolveArgs};
use ip_context_tools::utils::logging;

#[derive(Parser)]
#[command(name = "ip-context")]
#[command(
    about = "Extract IP addresses from logs and documents and resolve their geolocation and reputation",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract IP addresses and resolve them via ip-api.com and/or VirusTotal
    Resolve(ResolveArgs),

    /// Extract and count IP addresses without resolving them
    Extract(ExtractArgs),

    /// Generate shell completion script
    ///
    /// Install completions:
    ///   Bash: ip-context generate-completion bash > ~/.local/share/bash-completion/completions/ip-context
    ///   Zsh:  ip-context generate-completion zsh > ~/.zfunc/_ip-context
    ///   Fish: ip-context generate-completion fish > ~/.config/fish/completions/ip-context.fish
    GenerateCompletion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve(args) => {
            let (config_path, config) = args.common.load_config()?;
            let settings = args.settings(&config, config_path);
            logging::init(Some(&settings.common.log_file), settings.common.verbose)?;
            commands::resolve::run(&settings).await
        }
        Commands::Extract(args) => {
            let (config_path, config) = args.common.load_config()?;
            let settings = args.common.settings(&config, config_path);
            logging::init(Some(&settings.log_file), settings.verbose)?;
            commands::extract::run(&settings)
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "ip-context", &mut std::io::stdout());
            Ok(())
        }
    }
}
