use std::{net::TcpListener, sync::Arc};

use actix_web::web;
use anyhow::Context;
use env_logger::Env;
use scout::{
    configuration::get_configuration,
    services::{
        BackendClient, Classifier, DirectoryWriter, HttpSearchClient, JobPoller, LanguageModel,
        OpenaiClient, UnconfiguredModel,
    },
    session::{Session, SessionOptions},
    startup::run,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let timeout = configuration.search.request_timeout();

    let search_client = HttpSearchClient::new(&configuration.search.endpoint, timeout)
        .context("Failed to build the search client")?;
    let backend = Arc::new(
        BackendClient::new(&configuration.backend.base_url, timeout)
            .context("Failed to build the backend client")?,
    );
    let llm: Arc<dyn LanguageModel> = match configuration.api_keys.openai.as_ref() {
        Some(key) => Arc::new(
            OpenaiClient::new(
                key,
                &configuration.classification.model,
                configuration.classification.temperature,
                timeout,
            )
            .context("Failed to build the OpenAI client")?,
        ),
        None => {
            log::warn!("No OpenAI key configured, single classification is disabled");
            Arc::new(UnconfiguredModel)
        }
    };

    let classifier = Classifier::new(
        llm,
        backend.clone(),
        backend.clone(),
        configuration.classification.inline_threshold,
    );
    let poller = JobPoller::new(
        backend.clone(),
        configuration.classification.poll_interval(),
        configuration.classification.poll_ceiling(),
    );
    let session = web::Data::new(Session::new(
        configuration.api_keys.search_credentials(),
        Arc::new(search_client),
        backend.clone(),
        classifier,
        DirectoryWriter::new(backend),
        poller,
        SessionOptions::from(&configuration),
    ));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on {}", address);

    run(listener, session.clone())?.await?;
    session.shutdown();

    Ok(())
}
