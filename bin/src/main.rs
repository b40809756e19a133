#![allow(clippy::cognitive_complexity)]
use std::sync::Arc;

use anyhow::{Context, Result, bail};

mod dry_run;
mod settings;

use beacon_client::{
    EncodedPublicKey, EventClient, ExternalProvider, KeyMaterial, OrchestrationClient,
    RegistrationClient, Transport,
};
use config::ClientConfig;
use tokio::runtime::Builder;
use tracing::*;

use crate::{
    dry_run::DryRunTransport,
    settings::{
        cli::{self, Command, Parser, to_map},
        trace,
    },
};

fn main() -> Result<()> {
    // parses from cli or environment var
    let config = cli::Config::parse();
    let trace_config = trace::Config::parse(&config.beacon_log, &config.log_format)?;
    debug!(?config, ?trace_config);
    if let Err(err) = dotenv::dotenv() {
        debug!(?err, ".env file not loaded");
    }

    let mut builder = Builder::new_multi_thread();
    // configure thread name & enable IO/time
    builder.thread_name(&config.thread_name).enable_all();
    if let Some(num) = config.threads {
        builder.worker_threads(num);
    }
    let rt = builder.build()?;

    rt.block_on(async move {
        match tokio::spawn(async move { start(config).await }).await {
            Err(err) => {
                error!(?err, "failed to start client");
                Err(err.into())
            }
            Ok(Err(err)) => {
                error!(?err, "exited with error");
                Err(err)
            }
            Ok(Ok(())) => {
                debug!("exiting...");
                Ok(())
            }
        }
    })
}

async fn start(config: cli::Config) -> Result<()> {
    debug!(path = ?config.config_path, "parsing client config");
    let client_cfg = Arc::new(ClientConfig::parse(&config.config_path)?);
    info!(
        system = %client_cfg.system().name,
        address = %client_cfg.system().address,
        port = client_cfg.system().port,
        "loaded client identity"
    );

    let mut transport = DryRunTransport::stdout();
    if let Some(path) = &config.orchestration_response {
        transport = transport.with_orchestration_response(dry_run::load_response(path)?);
    }
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let keys: Option<Arc<dyn KeyMaterial>> = match &client_cfg.security().public_key_path {
        Some(path) => {
            let key = EncodedPublicKey::load(path)
                .with_context(|| format!("failed to load public key {}", path.display()))?;
            debug!(?key, "loaded public key");
            let key: Arc<dyn KeyMaterial> = Arc::new(key);
            Some(key)
        }
        None => None,
    };

    match config.command {
        Command::Register(args) => {
            let mut client = RegistrationClient::new(Arc::clone(&client_cfg), transport);
            if let Some(keys) = keys {
                client = client.with_key_material(keys);
            }
            let report = client
                .register(
                    &args.service_definition,
                    &args.service_uri,
                    args.http_method.as_ref(),
                    args.metadata().as_ref(),
                )
                .await?;
            for (address, err) in report.failed() {
                error!(address, ?err, "registration failed");
            }
            let addresses = report.into_result()?;
            info!(?addresses, service = %args.service_definition, "registered");
        }
        Command::RegisterExternal(args) => {
            let mut client = RegistrationClient::new(Arc::clone(&client_cfg), transport);
            if let Some(keys) = keys {
                client = client.with_key_material(keys);
            }
            let system = client_cfg.system();
            let provider = ExternalProvider {
                system_name: args.system_name,
                address: args.address,
                port: args.port,
                token_filter_enabled: args.token,
                ssl_enabled: args.ssl,
                secure_interface: system.secure_interface.clone(),
                insecure_interface: system.insecure_interface.clone(),
            };
            client
                .register_external(
                    &provider,
                    &args.service.service_definition,
                    &args.service.service_uri,
                    args.service.http_method.as_ref(),
                    args.service.metadata().as_ref(),
                )
                .await?;
            info!(provider = %provider.system_name, "registered external provider");
        }
        Command::Unregister { service_definition } => {
            let report = RegistrationClient::new(Arc::clone(&client_cfg), transport)
                .unregister(&service_definition)
                .await?;
            for (address, err) in report.failed() {
                error!(address, ?err, "removal failed");
            }
            let addresses = report.into_result()?;
            info!(?addresses, service = %service_definition, "unregistered");
        }
        Command::Orchestrate {
            service_definition,
            interface,
            http_method,
            metadata,
            validate,
        } => {
            let mut client = OrchestrationClient::new(Arc::clone(&client_cfg), transport);
            if let Some(keys) = keys {
                client = client.with_key_material(keys);
            }
            let results = client
                .orchestrate(
                    &service_definition,
                    &interface,
                    &http_method,
                    to_map(&metadata).as_ref(),
                )
                .await?;
            if validate {
                for result in &results {
                    client.validate_result(result, &service_definition)?;
                }
            }
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Subscribe { event, path } => {
            let client = event_client(&client_cfg, transport, keys);
            match (event, path) {
                (Some(event), Some(path)) => client.subscribe_event(&event, &path, None).await?,
                (None, _) => {
                    if client.configured_events(false).is_empty() {
                        bail!("no subscriber events configured");
                    }
                    client.subscribe_configured(None).await?
                }
                (Some(event), None) => bail!("--path is required to subscribe to {event}"),
            }
        }
        Command::Unsubscribe { event } => {
            event_client(&client_cfg, transport, keys)
                .unsubscribe(&event)
                .await?;
        }
        Command::Publish {
            event,
            payload,
            metadata,
        } => {
            event_client(&client_cfg, transport, keys)
                .publish(&event, to_map(&metadata).unwrap_or_default(), payload)
                .await?;
        }
        Command::Events { publisher } => {
            let client = event_client(&client_cfg, transport, keys);
            println!(
                "{}",
                serde_json::to_string_pretty(client.configured_events(publisher))?
            );
        }
    }
    Ok(())
}

fn event_client(
    cfg: &Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    keys: Option<Arc<dyn KeyMaterial>>,
) -> EventClient {
    let client = EventClient::new(Arc::clone(cfg), transport);
    match keys {
        Some(keys) => client.with_key_material(keys),
        None => client,
    }
}
