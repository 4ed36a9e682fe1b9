use anyhow::{Context, Result};
use clap::Parser;
use smooth_scroll::config::{Config, LoggingConfig};
use smooth_scroll::services::blacklist::{ProcFsResolver, ProcessResolver};
use smooth_scroll::services::window_detector::query_foreground_once;
use smooth_scroll::services::{EngineComponents, ScrollEngine};
use smooth_scroll::utils::permissions;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "smooth-scroll")]
#[command(about = "Системная плавная прокрутка колесом мыши")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "smooth-scroll.toml")]
    config: String,

    /// Режим сухого запуска (без захвата мыши и инъекции событий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Вывести имя программы активного окна и выйти
    #[arg(long)]
    print_foreground: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    init_tracing(&config.logging, args.log_level.as_deref())?;

    info!("Запуск smooth-scroll v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.print_foreground {
        return print_foreground(&config);
    }

    if args.dry_run {
        warn!("Режим сухого запуска - мышь не захватывается, события не инъектируются");
    } else if let Err(e) = permissions::check_permissions() {
        error!("{}", e);
        for command in permissions::setup_commands() {
            warn!("  {}", command);
        }
        return Err(e.into());
    }

    let components = EngineComponents::build(config, args.dry_run)?;
    let mut engine = ScrollEngine::start(components)?;

    match signal::ctrl_c().await {
        Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
        Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
    }

    // Остановка ждёт потоки синхронно
    let stopped = tokio::task::block_in_place(|| engine.stop(SHUTDOWN_TIMEOUT));
    if !stopped {
        warn!("Не все потоки завершились за {:?}", SHUTDOWN_TIMEOUT);
    }

    info!("smooth-scroll завершил работу");
    Ok(())
}

/// Помогает составить чёрный список: печатает имя программы в фокусе
fn print_foreground(config: &Config) -> Result<()> {
    let window = query_foreground_once(&config.window.detection_method)
        .context("Не удалось определить активное окно")?;
    info!("Активное окно: {}", window);

    let pid = window
        .pid
        .context("Оконная система не сообщила pid владельца окна")?;
    let identity = ProcFsResolver::new()
        .resolve(pid)
        .with_context(|| format!("Не удалось определить процесс {}", pid))?;

    println!("{}", identity.name.to_lowercase());
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Уровень из командной строки заменяет и уровень, и фильтр конфигурации
    let directives = match level_override {
        Some(level) => level.to_string(),
        None if logging.filter.is_empty() => logging.level.clone(),
        None => format!("{},{}", logging.level, logging.filter),
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_thread_names(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_thread_names(true))
            .init();
    }

    Ok(())
}
