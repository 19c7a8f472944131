use anyhow::Context;
use clap::Parser;
use futures::FutureExt;
use std::sync::Arc;

/// sgt-facade serves a GraphQL API over the SGT SOAP webservices.
/// Each request names the service to call via its X-Target-WSDL header.
#[derive(clap::Parser, Debug)]
struct Args {
    /// Port to listen on.
    #[clap(long, env, default_value = "8000")]
    api_port: u16,
    /// Number of bound services to keep cached.
    #[clap(long, env, default_value = "10")]
    cache_capacity: usize,
    /// Timeout of requests to SGT services, including WSDL fetches.
    #[clap(long, env, default_value = "60s")]
    soap_timeout: humantime::Duration,
    /// Origin to allow in CORS contexts. May be specified multiple times.
    /// Any origin is allowed if none are given.
    #[clap(long = "allow-origin", env = "ALLOW_ORIGIN", value_delimiter = ',')]
    allow_origin: Vec<String>,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // Use reasonable defaults for printing structured logs to stderr.
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env());
    tracing::subscriber::set_global_default(builder.json().finish())
        .context("setting tracing default failed")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tracing::info!(?args, "started!");

    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(
    Args {
        api_port,
        cache_capacity,
        soap_timeout,
        allow_origin,
    }: Args,
) -> anyhow::Result<()> {
    let transport = sgt_facade::SoapTransport::new(soap_timeout.into())
        .context("failed to build HTTP client")?;
    let client = Arc::new(sgt_facade::ServiceClient::new(
        Arc::new(transport),
        cache_capacity,
    ));
    tracing::info!(
        capacity = client.cache().capacity(),
        "caching bound SOAP services"
    );

    let app = sgt_facade::server::build_router(client, &allow_origin)?;

    let api_listener = tokio::net::TcpListener::bind(format!("[::]:{api_port}"))
        .await
        .context("failed to bind server port")?;

    // Share-able future which completes when the server should exit.
    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();

    tracing::info!(api_port, "serving GraphQL at /graphql");

    axum::serve(api_listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
