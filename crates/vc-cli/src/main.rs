//! vCenter connectivity CLI (vcconn)

use anyhow::Result;
use clap::{Parser, Subcommand};
use vc_shared_types::ConnectionMode;
use vc_sim::SimSettings;
use vcconn::commands::{
    ApplyCommand, CheckConfigCommand, GenerateConfigCommand, InspectCommand, OutputFormat,
    PortGroupNameCommand,
};

#[derive(Parser)]
#[command(name = "vcconn")]
#[command(about = "vCenter VLAN connectivity CLI")]
#[command(version)]
#[command(long_about = "
vCenter VLAN connectivity CLI

Derives the port group names the connector uses, checks and generates
resource configuration files, and runs connectivity requests against a
simulated vCenter inventory stored as JSON.

Examples:
  vcconn port-group-name -s dvSwitch-01 -l 100                 # Access VLAN name
  vcconn port-group-name -s dvSwitch-01 -l 10-20,30 -m trunk   # Trunk name
  vcconn port-group-name --classify Production-LAN             # Generated or not
  vcconn check-config -c resource.toml                         # Validate config
  vcconn generate-config -D DC1 -s dvSwitch-01 -n Holding      # New config
  vcconn apply -c resource.toml -i inventory.json -r request.json
  vcconn apply -c resource.toml -i inventory.json -r request.json -j events.jsonl
  vcconn inspect -i inventory.json -f yaml                     # Show inventory
")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the port group name for a VLAN
    PortGroupName {
        /// Switch the port group lives on
        #[arg(short, long, default_value = "")]
        switch: String,

        /// VLAN id, or ranges for trunk mode
        #[arg(short = 'l', long, default_value = "")]
        vlan: String,

        /// Port mode (access, trunk)
        #[arg(short, long, default_value = "access")]
        mode: ConnectionMode,

        /// Report whether a network name looks generated instead
        #[arg(long)]
        classify: Option<String>,
    },

    /// Validate a resource configuration file
    CheckConfig {
        /// Configuration file to check
        #[arg(short, long, default_value = "resource.toml")]
        config: String,
    },

    /// Write a resource configuration file
    GenerateConfig {
        /// Datacenter name
        #[arg(short = 'D', long)]
        datacenter: String,

        /// Default distributed switch or host vSwitch
        #[arg(short, long)]
        switch: String,

        /// Holding network
        #[arg(short = 'n', long)]
        holding_network: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run a connectivity request against a simulated inventory
    Apply {
        /// Resource configuration file
        #[arg(short, long, default_value = "resource.toml")]
        config: String,

        /// Inventory state file
        #[arg(short, long)]
        inventory: String,

        /// Connectivity request (JSON)
        #[arg(short, long)]
        request: String,

        /// Save the resulting inventory back to the state file
        #[arg(short, long)]
        write_back: bool,

        /// Polls before a simulated task completes
        #[arg(long, default_value_t = 1)]
        task_polls: u32,

        /// Listings a new port group stays hidden for
        #[arg(long, default_value_t = 2)]
        visibility_lag: u32,

        /// Write the run's events to this file as JSON lines
        #[arg(short, long)]
        journal: Option<String>,
    },

    /// Show switches, port groups and VM wiring of an inventory
    Inspect {
        /// Inventory state file
        #[arg(short, long)]
        inventory: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::PortGroupName {
            switch,
            vlan,
            mode,
            classify,
        } => {
            let cmd = PortGroupNameCommand::new();
            match classify {
                Some(network) => cmd.classify(&network),
                None => cmd.execute(&switch, &vlan, mode),
            }
        }

        Commands::CheckConfig { config } => CheckConfigCommand::new().execute(&config),

        Commands::GenerateConfig {
            datacenter,
            switch,
            holding_network,
            output,
        } => GenerateConfigCommand::new().execute(
            &datacenter,
            &switch,
            &holding_network,
            output.as_deref(),
        ),

        Commands::Apply {
            config,
            inventory,
            request,
            write_back,
            task_polls,
            visibility_lag,
            journal,
        } => {
            let cmd = ApplyCommand::new(SimSettings {
                task_polls,
                visibility_lag,
            })
            .with_journal(journal);
            cmd.execute(&config, &inventory, &request, write_back).await
        }

        Commands::Inspect { inventory, format } => {
            InspectCommand::new().execute(&inventory, format)
        }
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                log::info!("Command completed successfully");
            }
            std::process::exit(0);
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);

                if cli.verbose || cli.debug {
                    for cause in e.chain().skip(1) {
                        eprintln!("  Caused by: {}", cause);
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
