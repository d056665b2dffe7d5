mod cli;

use webpforge::config;
use webpforge_common::{size::parse_shorthand_size, ConversionOptions};
use webpforge_convert::{BackendRegistry, ConversionReport};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConvertArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "webpforge=debug,webpforge_convert=debug,webpforge_common=debug".to_string()
        } else {
            "webpforge=info,webpforge_convert=warn,webpforge_common=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert(args) => convert(args, cli.config.as_deref()),
        Commands::CheckBackends { json } => check_backends(cli.config.as_deref(), json),
        Commands::ParseSize { size } => parse_size(&size),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("webpforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Config-file options with command-line overrides applied.
fn merge_options(base: ConversionOptions, args: &ConvertArgs) -> ConversionOptions {
    let mut options = base;
    if let Some(quality) = args.quality {
        options.quality = quality;
    }
    if let Some(encoding) = args.encoding {
        options.encoding = encoding;
    }
    if let Some(ref preset) = args.preset {
        options.preset = Some(preset.clone());
    }
    if let Some(ref metadata) = args.metadata {
        options.metadata = metadata.clone();
    }
    if let Some(level) = args.near_lossless {
        options.near_lossless = level;
    }
    if let Some(alpha) = args.alpha_quality {
        options.alpha_quality = alpha;
    }
    if args.smart_subsample {
        options.smart_subsample = true;
    }
    options.validated()
}

fn convert(args: ConvertArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let options = merge_options(config.options.clone(), &args);
    let registry = BackendRegistry::from_config(&config);

    let backend = registry.require(&args.backend)?;
    tracing::debug!("Converting {} with {}", args.source, backend.name());

    let report = webpforge_convert::convert(backend, &args.source, &args.destination, &options)
        .with_context(|| format!("Failed to convert {}", args.source))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ConversionReport) {
    println!(
        "{} -> {}",
        report.source.display(),
        report.destination.display()
    );
    println!("  Backend: {}", report.backend);
    println!("  Encoding: {} (quality {})", report.encoding, report.quality);
    match report.source_size {
        Some(src) if src > 0 => println!(
            "  Size: {} -> {} bytes ({:.1}%)",
            src,
            report.destination_size,
            report.destination_size as f64 * 100.0 / src as f64
        ),
        _ => println!("  Size: {} bytes", report.destination_size),
    }
    if !report.pruned.is_empty() {
        let names: Vec<String> = report.pruned.iter().map(|k| k.to_string()).collect();
        println!("  Unsupported by backend, dropped: {}", names.join(", "));
    }
}

fn check_backends(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = BackendRegistry::from_config(&config);
    let statuses = registry.check_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Checking backends...\n");

    let mut any_ok = false;
    for status in &statuses {
        let mark = if status.capability.is_operational() {
            any_ok = true;
            "✓"
        } else {
            "✗"
        };

        print!("{} {}", mark, status.name);
        if let Some(ref version) = status.version {
            print!(" ({})", version);
        }
        if let webpforge_convert::CapabilityResult::NotOperational(ref reason) = status.capability
        {
            print!(" - {}", reason);
        }
        println!();
    }

    println!();
    if any_ok {
        println!("At least one backend is operational.");
    } else {
        println!("No backend is operational. Install vips or cwebp, or configure [cloud].");
    }

    Ok(())
}

fn parse_size(size: &str) -> Result<()> {
    let bytes = parse_shorthand_size(size)?;
    println!("{}", bytes as u64);
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let (config, path) = match path {
        Some(p) => (config::load_config(p)?, Some(p.to_path_buf())),
        None => match config::find_config() {
            Some(p) => (config::load_config(&p)?, Some(p)),
            None => (config::Config::default(), None),
        },
    };

    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file found, using defaults"),
    }

    let warnings = config.validate();
    println!("✓ Configuration is valid");
    println!("  Quality: {}", config.options.quality);
    println!("  Encoding: {}", config.options.encoding);
    println!("  Metadata: {}", config.options.metadata);
    println!(
        "  Upload limits: upload_max_filesize={}, post_max_size={}",
        config.limits.upload_max_filesize.as_deref().unwrap_or("unset"),
        config.limits.post_max_size.as_deref().unwrap_or("unset")
    );
    println!("  Tool timeout: {}s", config.tools.timeout_secs);
    println!(
        "  Cloud: {}",
        config.cloud.url.as_deref().unwrap_or("not configured")
    );

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
