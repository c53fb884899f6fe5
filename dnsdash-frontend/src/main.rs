use tracing::info;
use tracing_subscriber::EnvFilter;

use dnsdash_frontend::app::DnsDashboard;
use dnsdash_frontend::cli::CliConfig;

pub fn main() -> anyhow::Result<()> {
    let cli = CliConfig::from_args()?;

    // Respect RUST_LOG, but keep GPU/windowing crates quiet by default
    let filter = if cli.verbose {
        EnvFilter::new("debug,wgpu_core=warn,wgpu_hal=warn,naga=warn,winit=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn,winit=warn")
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .event_format(
            tracing_subscriber::fmt::format()
                .with_target(false)
                .compact(),
        )
        .init();

    let config = cli.backend_config()?;
    info!(
        "Starting dnsdash-frontend against {} (poll every {}, timeout {:?})",
        config.base_url, config.initial_interval, config.request_timeout
    );

    iced::application(
        move || DnsDashboard::new(config.clone()),
        DnsDashboard::update,
        DnsDashboard::view,
    )
    .title("DNS Traffic Monitor")
    .subscription(DnsDashboard::subscription)
    .run()?;

    Ok(())
}
