use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reagent_enrich::{cli, config, enrich, error, errorlog, report, resolver, scanner, store};
use cli::{Cli, Commands};
use config::Config;
use error::{EnrichError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_store(file: &Path) -> Result<store::XlsxStore> {
    if !file.exists() {
        return Err(EnrichError::FileNotFound(file.display().to_string()));
    }
    Ok(store::XlsxStore::open(file)?)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} ({eta})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Scan {
            file,
            report: report_path,
            alias,
        } => {
            let mut config = config;
            if let Some(path) = alias {
                config.alias_file = Some(path);
            }
            let aliases = config.column_aliases()?;

            println!("🧪 reagent-enrich - 空欄走査\n");

            println!("[1/2] 台帳を読み込み中...");
            let store = open_store(&file)?;
            println!("✔ {}\n", file.display());

            println!("[2/2] 化学式列を走査中...");
            let scans = scanner::scan_workbook(&store, &aliases)?;
            for scan in &scans {
                println!("\n[{}]", scan.sheet);
                for line in report::summary_lines(&scan.empty_rows) {
                    println!("  {}", line);
                }
            }

            if let Some(path) = report_path.or(config.report_path) {
                report::write_empty_row_report(&path, &file, &scans)?;
                println!("\n✔ レポートを保存: {}", path.display());
            }

            println!("\n✅ 走査完了");
        }

        Commands::Enrich {
            file,
            concurrency,
            timeout,
            persist_every,
            error_log,
            report: report_path,
            alias,
            json,
        } => {
            let mut config = config;
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            if let Some(secs) = timeout {
                config.timeout_seconds = secs;
            }
            if let Some(n) = persist_every {
                config.persist_every = n;
            }
            if let Some(path) = error_log {
                config.error_log = path;
            }
            if let Some(path) = report_path {
                config.report_path = Some(path);
            }
            if let Some(path) = alias {
                config.alias_file = Some(path);
            }
            config.validate()?;
            let aliases = config.column_aliases()?;

            println!("🧪 reagent-enrich - 化学式補完\n");

            println!("[1/3] 台帳を読み込み中...");
            let mut store = open_store(&file)?;
            println!("✔ {}\n", file.display());

            println!(
                "[2/3] 化学式を取得中...（同時取得数 {}, Ctrl-C で中断）",
                config.concurrency
            );
            let fetcher = resolver::HttpFetcher::new(&config)?;
            let resolver = resolver::FormulaResolver::new(
                fetcher,
                config.url_template.clone(),
                Duration::from_secs(config.timeout_seconds),
            );
            let enricher = enrich::Enricher::new(
                resolver,
                aliases,
                enrich::RunOptions::from(&config),
            )
            .with_progress(progress_bar());

            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = cancel_tx.send(true);
                }
            });

            let mut log = errorlog::FileErrorLog::new(&config.error_log);
            let outcome = enricher.run(&mut store, &mut log, &cancel_rx).await?;
            if outcome.cancelled {
                println!("⚠ 中断しました（取得済みの行は保存済み）\n");
            } else {
                println!("✔ 取得完了\n");
            }

            println!("[3/3] 集計中...");
            if let Some(path) = &config.report_path {
                report::write_empty_row_report(path, &file, &outcome.sheets)?;
                println!("✔ レポートを保存: {}", path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.statistics)?);
            } else {
                for line in report::statistics_lines(&outcome.statistics) {
                    println!("  {}", line);
                }
                if outcome.statistics.failures_of(reagent_enrich_common::FailureKind::FetchError) > 0 {
                    println!("  エラーログ: {}", config.error_log.display());
                }
            }

            println!("\n✅ 補完完了");
        }

        Commands::Lookup { cas } => {
            let fetcher = resolver::HttpFetcher::new(&config)?;
            let resolver = resolver::FormulaResolver::new(
                fetcher,
                config.url_template.clone(),
                Duration::from_secs(config.timeout_seconds),
            );

            println!("照会先: {}", resolver.lookup_url(&reagent_enrich::cas::normalize(&cas)));
            match resolver.resolve(&cas).await {
                Ok(info) => {
                    println!("  CAS番号: {}", info.cas);
                    println!("  中文名: {}", info.chinese_name);
                    println!("  英文名: {}", info.english_name);
                    println!("  構造式画像: {}", info.structure_image);
                    println!("  分子式: {}", info.formula);
                }
                Err(failure) => {
                    println!("✖ {} ({})", failure, failure.kind());
                }
            }
        }

        Commands::Config { set_url_template, show } => {
            let mut config = config;

            if let Some(template) = set_url_template {
                config.url_template = template;
                config.save()?;
                println!("✔ 参照URLを設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  参照URL: {}", config.url_template);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  同時取得数: {}", config.concurrency);
                println!("  保存間隔: {}件ごと", config.persist_every);
                println!("  既定の文字コード: {}", config.default_encoding);
                println!("  エラーログ: {}", config.error_log.display());
                match &config.report_path {
                    Some(path) => println!("  レポート: {}", path.display()),
                    None => println!("  レポート: なし"),
                }
                if let Some(path) = &config.alias_file {
                    println!("  エイリアス: {}", path.display());
                }
            }
        }
    }

    Ok(())
}
