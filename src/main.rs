use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = vitrine::config::ViewerConfig::load()?;
    log::info!("loading {}", config.assets.model.display());
    vitrine::run(config)
}
