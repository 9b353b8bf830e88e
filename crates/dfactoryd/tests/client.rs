#![cfg(unix)]

use df_api::{build_router, AppState};
use df_config::FactoryConfig;
use df_factory::AppStatus;
use dfactoryd::DaemonClient;
use uuid::Uuid;

async fn serve() -> (tempfile::TempDir, AppState, DaemonClient) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = FactoryConfig::default();
    config.apps_dir = Some(dir.path().join("dapps"));
    config.stop_grace_ms = 1000;
    let state = AppState::new(config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (dir, state, DaemonClient::new(format!("http://{addr}")))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_drives_full_lifecycle() {
    let (_dir, state, client) = serve().await;

    let created = client
        .create("web", "sleep", &["30".to_string()])
        .await
        .unwrap();
    assert!(created.warnings.is_empty());

    let apps = client.list().await.unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].handle, created.id);
    assert_eq!(apps[0].status, AppStatus::Running);
    assert_eq!(apps[0].args, vec!["30".to_string()]);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.apps, 1);

    assert!(client.stop(&created.id).await.unwrap().success);
    let err = client.stop(&created.id).await.unwrap_err();
    assert!(err.to_string().contains("APP_NOT_FOUND"), "{err}");

    assert!(client.remove(&created.id).await.unwrap().success);
    assert!(client.remove(&created.id).await.unwrap().success);
    assert!(client.list().await.unwrap().is_empty());

    state.factory.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_surfaces_api_errors() {
    let (_dir, _state, client) = serve().await;

    let err = client.create("demo", "", &[]).await.unwrap_err();
    assert!(err.to_string().contains("INVALID_REQUEST"), "{err}");

    let err = client
        .create("ghost", "definitely-not-a-real-command-df", &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("SPAWN_FAILED"), "{err}");

    assert!(client.remove(&Uuid::new_v4()).await.unwrap().success);
}
