use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use log::debug;

use crate::errors::Error;
use crate::metrics;
use crate::utils::result_text;
use crate::{DeploymentRequest, Deployer};

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Error::Validation(violations) => format!("invalid deployment request:\n{}\n", violations.join("\n")),
            Error::Apply { applied, .. } => format!("{}error: {}\n", result_text(applied), self),
            _ => format!("{}\n", self),
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}

// Simple health check endpoint
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::new(StatusCode::OK)
}

// Run a deployment, responding with the list of applied objects
pub async fn deploy(data: web::Data<Deployer>, body: web::Bytes) -> Result<HttpResponse, Error> {
    let request = DeploymentRequest::from_slice(&body).map_err(|err| {
        metrics::error_happened(err.stage());
        metrics::deployment_finished(false);
        err
    })?;
    debug!(
        "Deployment request for {} version {} in {}",
        request.application, request.version, request.namespace
    );

    let actions = data.deploy(&request).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(result_text(&actions)))
}
