use vidmark_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under many
// concurrent uploads, especially on musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Initialize the application (telemetry, storage, engine, routes)
    let (_state, router) = vidmark_api::setup::initialize_app(config.clone()).await?;

    vidmark_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
