use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use kube::client::Client;
use log::{debug, info};
use naisd::{
    apply::KubeClusterClient, errors, http::ReqwestFetcher, metrics, views, Config, Deployer, NaisdEnvironmentConfig,
};
use prometheus::Registry;

#[actix_rt::main]
async fn main() -> Result<(), errors::Error> {
    env_logger::init();

    let env_config: NaisdEnvironmentConfig = envy::from_env::<NaisdEnvironmentConfig>()
        .map_err(|err| errors::Error::InvalidConfig(format!("environment: {}", err)))?;
    debug!("Environment config: {:?}", &env_config);
    let naisd_config = Config::from_env_config(env_config)?;
    info!("Starting with config: {:?}", naisd_config);

    let bind_address = format!("{}:{}", &naisd_config.server_host, naisd_config.server_port);

    let client = Client::try_default().await?;
    let fetcher = ReqwestFetcher::new(naisd_config.http_timeout)?;
    let deployer = web::Data::new(Deployer::new(
        Arc::new(fetcher),
        Arc::new(KubeClusterClient::new(client)),
        naisd_config,
    ));

    let registry = Registry::new();
    metrics::custom_metrics(&registry)
        .map_err(|err| errors::Error::InvalidConfig(format!("metrics: {}", err)))?;
    let prometheus = PrometheusMetricsBuilder::new(metrics::METRICS_NAMESPACE)
        .registry(registry)
        .endpoint("/metrics")
        .build()
        .map_err(|err| errors::Error::InvalidConfig(format!("metrics: {}", err)))?;

    info!("Listening on {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(deployer.clone())
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default()
                    .exclude("/health")
                    .exclude("/metrics"))
            .wrap(middleware::Compress::default())
            .service(web::resource("/health").to(views::health))
            .service(web::resource("/deploy").route(web::post().to(views::deploy)))
        })
        .bind(&bind_address)?
        .run()
        .await?;

    info!("actix exited");
    Ok(())
}
