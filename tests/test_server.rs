use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};

use naisd::manifest::ClusterObject;
use naisd::{metrics, views};

mod helpers;

use helpers::{deployer, deployment_request, testdata, FakeCluster, FakeHttp, SCOPED_RESOURCE_URL};

const APP_CONFIG: &str = r#"
image: name/Container
port: 321
fasitResources:
  used:
    - alias: alias1
      resourceType: db
"#;

fn happy_path_http() -> FakeHttp {
    FakeHttp::new()
        .reply("http://repo.com/app", &[], 200, APP_CONFIG)
        .reply(
            SCOPED_RESOURCE_URL,
            &[
                ("alias", "alias1"),
                ("type", "db"),
                ("environment", "namespace"),
                ("application", "appname"),
                ("zone", "fss"),
            ],
            200,
            &testdata("fasitResponse.json"),
        )
}

// POST `body` to /deploy, returning the status and response body
async fn post_deploy(http: Arc<FakeHttp>, cluster: Arc<FakeCluster>, body: Vec<u8>) -> (StatusCode, String) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(deployer(http, cluster)))
            .service(web::resource("/deploy").route(web::post().to(views::deploy))),
    )
    .await;

    let req = test::TestRequest::post().uri("/deploy").set_payload(body).to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    (status, String::from_utf8_lossy(&bytes).to_string())
}

#[actix_rt::test]
async fn test_view_health() {
    let req = test::TestRequest::default().to_http_request();
    let resp = views::health(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_an_incorrect_payload_gives_error() {
    let http = Arc::new(FakeHttp::new());
    let cluster = Arc::new(FakeCluster::new());

    let (status, _) = post_deploy(http.clone(), cluster.clone(), b"gibberish".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(http.calls().is_empty());
    assert!(cluster.applied_kinds().is_empty());
}

#[actix_rt::test]
async fn test_an_incorrect_payload_is_counted() {
    let decode_errors = metrics::ERRORS.with_label_values(&["decode"]).get();
    let failures = metrics::DEPLOYMENTS.with_label_values(&["failure"]).get();

    let (status, _) = post_deploy(Arc::new(FakeHttp::new()), Arc::new(FakeCluster::new()), b"{".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(metrics::ERRORS.with_label_values(&["decode"]).get() > decode_errors);
    assert!(metrics::DEPLOYMENTS.with_label_values(&["failure"]).get() > failures);
}

#[actix_rt::test]
async fn test_invalid_request_lists_every_violation() {
    let http = Arc::new(FakeHttp::new());
    let cluster = Arc::new(FakeCluster::new());
    let mut request = deployment_request();
    request.zone = String::new();
    request.password = String::new();

    let (status, body) = post_deploy(http.clone(), cluster, serde_json::to_vec(&request).unwrap()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Zone is required and is empty"));
    assert!(body.contains("Zone can only be fss or sbs"));
    assert!(body.contains("Password is required and is empty"));
    assert!(http.calls().is_empty());
}

#[actix_rt::test]
async fn test_no_manifest_gives_error() {
    let http = Arc::new(FakeHttp::new().reply("http://repo.com/app", &[], 400, r#"{"foo": "bar"}"#));
    let cluster = Arc::new(FakeCluster::new());

    let (status, _) = post_deploy(http.clone(), cluster.clone(), serde_json::to_vec(&deployment_request()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(http.calls().len(), 1);
    assert_eq!(http.calls_to(SCOPED_RESOURCE_URL), 0);
    assert!(cluster.applied_kinds().is_empty());
}

#[actix_rt::test]
async fn test_valid_deployment_request_and_app_config_create_resources() {
    let http = Arc::new(happy_path_http());
    let cluster = Arc::new(FakeCluster::new());

    let (status, body) = post_deploy(http.clone(), cluster.clone(), serde_json::to_vec(&deployment_request()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(http.all_routes_called());
    assert_eq!(
        body,
        "result: \n- created deployment\n- created service\n- created ingress\n- created autoscaler\n"
    );
    assert_eq!(cluster.applied_kinds(), vec!["deployment", "service", "ingress", "autoscaler"]);

    let applied = cluster.applied();
    assert!(applied.iter().all(|(namespace, _)| namespace == "namespace"));
    match &applied[0].1 {
        ClusterObject::Deployment(deployment) => {
            let container = &deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0];
            assert_eq!(container.image.as_deref(), Some("name/Container:123"));
            let env = container.env.as_ref().unwrap();
            assert!(env
                .iter()
                .any(|var| var.name == "ALIAS1_USERNAME" && var.value.as_deref() == Some("basta")));
        }
        other => panic!("Expected a deployment first, got {:?}", other),
    }
}

#[actix_rt::test]
async fn test_failing_resource_lookup_applies_nothing() {
    let http = Arc::new(
        FakeHttp::new()
            .reply("http://repo.com/app", &[], 200, APP_CONFIG)
            .reply(SCOPED_RESOURCE_URL, &[("alias", "alias1")], 500, "oops"),
    );
    let cluster = Arc::new(FakeCluster::new());

    let (status, _) = post_deploy(http, cluster.clone(), serde_json::to_vec(&deployment_request()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(cluster.applied_kinds().is_empty());
}

#[actix_rt::test]
async fn test_apply_failure_reports_partial_result() {
    let http = Arc::new(happy_path_http());
    let cluster = Arc::new(FakeCluster::failing("ingress"));

    let (status, body) = post_deploy(http, cluster.clone(), serde_json::to_vec(&deployment_request()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("result: \n- created deployment\n- created service\n"));
    assert!(body.contains("Failed to apply ingress"));
    assert_eq!(cluster.applied_kinds(), vec!["deployment", "service"]);
}

#[actix_rt::test]
async fn test_invalid_cpu_threshold_applies_nothing() {
    let app_config = "image: name/Container\nport: 321\nreplicas:\n  cpuThresholdPercentage: 0\n";
    let http = Arc::new(FakeHttp::new().reply("http://repo.com/app", &[], 200, app_config));
    let cluster = Arc::new(FakeCluster::new());

    let (status, body) = post_deploy(http, cluster.clone(), serde_json::to_vec(&deployment_request()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Invalid CPU threshold: 0%"));
    assert!(cluster.applied_kinds().is_empty());
}
