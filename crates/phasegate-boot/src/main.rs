use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use phasegate_boot::commands::{self, CommandOutput};
use phasegate_boot::logging::init_tracing;
use phasegate_boot::DemoOptions;
use std::path::PathBuf;

fn policy_arg() -> Arg {
    Arg::new("policy")
        .long("policy")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("TOML file overriding auth thresholds and the secret deny-list")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the report as JSON")
}

fn cli() -> Command {
    Command::new("phasegate")
        .version(phasegate_boot::VERSION)
        .about("Dependency-ordered service boot with readiness gates")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Flat TOML file read beneath the process environment"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("validate-auth")
                .about("Validate auth configuration and print a consolidated summary")
                .arg(policy_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("boot")
                .about("Boot the demo service graph, print the startup report, then shut down")
                .arg(policy_arg())
                .arg(json_arg())
                .arg(
                    Arg::new("fail")
                        .long("fail")
                        .value_name("SERVICE")
                        .action(ArgAction::Append)
                        .help("Force SERVICE's initializer to fail (repeatable)"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Seed for simulated connection latencies"),
                ),
        )
        .subcommand(Command::new("phases").about("Print the boot phase order"))
}

fn demo_options(args: &ArgMatches) -> anyhow::Result<DemoOptions> {
    let policy = commands::load_policy(args.get_one::<PathBuf>("policy").map(PathBuf::as_path))?;
    let mut options = DemoOptions::default()
        .with_policy(policy)
        .with_seed(args.get_one::<u64>("seed").copied().unwrap_or(42));
    if let Some(failing) = args.get_many::<String>("fail") {
        for service in failing {
            options = options.failing(service.clone());
        }
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = commands::config_provider(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    let output: CommandOutput = match matches.subcommand() {
        Some(("validate-auth", args)) => {
            let policy = commands::load_policy(args.get_one::<PathBuf>("policy").map(PathBuf::as_path))?;
            commands::validate_auth(config, policy, args.get_flag("json"))?
        }
        Some(("boot", args)) => {
            commands::boot(config, demo_options(args)?, args.get_flag("json")).await?
        }
        Some(("phases", _)) => commands::phases(),
        _ => unreachable!("clap requires a subcommand"),
    };

    print!("{}", output.stdout);
    if !output.stdout.ends_with('\n') {
        println!();
    }
    if output.exit_code != 0 {
        std::process::exit(output.exit_code);
    }
    Ok(())
}
