use anyhow::Context;
use clap::Parser;
use year_review::domain::ports::Storage;
use year_review::utils::{logger, validation::Validate};
use year_review::{
    ActivityCollector, CliConfig, EtlEngine, LocalStorage, ReviewError, ReviewPipeline, TeamConfig,
};

fn load_config(cli: &CliConfig) -> anyhow::Result<TeamConfig> {
    let mut config = TeamConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load team config from {}", cli.config))?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Lists what a run would do without touching the network or writing files.
async fn print_plan(config: &TeamConfig, refresh: bool) {
    let cache = LocalStorage::new(&config.data_dir);

    println!("Year Review {} - {}", config.year, config.team_name);
    println!("Cache: {}", cache.base_path().display());
    println!("Output: {}", config.output_dir);
    println!(
        "GitHub token: {}, Slack token: {}",
        if config.github_pat.is_empty() { "missing" } else { "set" },
        if config.slack_token.is_empty() { "missing" } else { "set" }
    );

    for member in &config.members {
        let key = member.key();
        let cached = !refresh
            && cache.exists(&format!("{}_data.json", key)).await
            && cache.exists(&format!("{}_projects.json", key)).await;

        let mut sources = Vec::new();
        if let Some(login) = member.github_login() {
            sources.push(format!("github:{}", login));
        }
        if let Some(email) = member.slack_email() {
            sources.push(format!("slack:{}", email));
        }
        if let Some(file) = member.calendar_path() {
            sources.push(format!("calendar:{}", file));
        }

        println!(
            "  {} -> {}.html [{}] {}",
            member.name,
            key,
            sources.join(", "),
            if cached { "(cached)" } else { "(collect)" }
        );
    }
}

async fn run(cli: &CliConfig) -> anyhow::Result<Option<String>> {
    let config = load_config(cli)?;
    tracing::info!(
        "Year Review Data Collection - {} (team: {})",
        config.year,
        config.team_name
    );
    tracing::debug!("Team config: {:?}", config);

    if cli.dry_run {
        print_plan(&config, cli.refresh).await;
        return Ok(None);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = ActivityCollector::from_config(&config)?;
    let cache = LocalStorage::new(&config.data_dir);
    let output = LocalStorage::new(&config.output_dir);
    let pipeline = ReviewPipeline::new(cache, output, config, source).with_refresh(cli.refresh);

    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
    Ok(Some(engine.run().await?))
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI args: {:?}", cli);

    match run(&cli).await {
        Ok(Some(index)) => {
            tracing::info!("✅ Year review completed successfully!");
            println!("✅ Year review completed successfully!");
            println!("📁 Team page: {}", index);
        }
        Ok(None) => {}
        Err(e) => {
            let Some(review_error) = e.downcast_ref::<ReviewError>() else {
                tracing::error!("❌ Year review failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            };

            tracing::error!(
                "❌ Year review failed: {:#} (Category: {:?}, Severity: {:?})",
                e,
                review_error.category(),
                review_error.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", review_error.recovery_suggestion());
            eprintln!("❌ {}", review_error.user_friendly_message());
            eprintln!("💡 Suggestion: {}", review_error.recovery_suggestion());

            std::process::exit(review_error.severity().exit_code());
        }
    }
}
