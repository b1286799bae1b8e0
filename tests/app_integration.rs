use fintree::core::config::AppConfig;
use fintree::core::error::ApiError;
use fintree::core::mutation::MoveTarget;
use fintree::core::notice::{CollectingNotifier, Notice};
use fintree::core::transaction::Direction;
use fintree::{App, AppCommand, TransactionInput};
use std::fs;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const ASSETS: &str = r#"{"success": true, "data": [
        {"id": 1, "type": "group", "belong_id": "", "description": "Portfolio",
         "quantity": 0, "remain_cost": 0, "currency": "CNY", "userId": "alice"},
        {"id": 2, "type": "stock", "belong_id": "1", "description": "ACME",
         "quantity": 10, "remain_cost": 15, "currency": "USD", "price": 20, "userId": "alice"},
        {"id": 3, "type": "cash", "belong_id": "1", "description": "Wallet",
         "quantity": "100", "remain_cost": 1, "currency": "CNY", "userId": "alice"},
        {"id": 4, "type": "group", "belong_id": null, "description": "Savings",
         "quantity": 0, "remain_cost": 0, "currency": "CNY", "userId": "alice"}
    ]}"#;

    /// Backend answering the asset list and a fixed exchange rate.
    pub async fn create_mock_backend(rate: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/assets/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ASSETS))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/get_foreign_currency_rate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"success": true, "data": {{"converted_amount": "{rate}"}}}}"#
            )))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(base_url: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
            backend:
              base_url: {base_url}
              timeout_secs: 2
            user_id: alice
            currency: CNY
            supported_currencies: [CNY, USD]
            rates:
              timeout_secs: 2
            "#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

fn app_for(base_url: &str) -> (App, Arc<CollectingNotifier>) {
    let config_file = test_utils::write_config(base_url);
    let config = AppConfig::load_from_path(config_file.path()).expect("config should load");
    let notifier = Arc::new(CollectingNotifier::new());
    let app = App::new(config, notifier.clone()).expect("app should build");
    (app, notifier)
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_backend("7.2").await;
    let config_file = test_utils::write_config(&mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    for command in [
        AppCommand::Tree,
        AppCommand::Dist { select: vec![] },
        AppCommand::Dist {
            select: vec!["1".into()],
        },
        AppCommand::Value {
            id: Some("2".into()),
        },
    ] {
        let result = fintree::run_command(command, Some(config_path)).await;
        assert!(result.is_ok(), "Command failed with: {:?}", result.err());
    }
}

#[test_log::test(tokio::test)]
async fn test_values_are_converted_into_display_currency() {
    let mock_server = test_utils::create_mock_backend("7.2").await;
    let (app, notifier) = app_for(&mock_server.uri());

    app.load_assets().await.unwrap();
    let total = app.dashboard.total("CNY").await;
    info!(total, "Converted total");

    // 10 ACME at 20 USD plus 100 CNY cash
    assert!((total - 1540.0).abs() < 1e-6, "unexpected total {total}");

    app.dashboard.select("1");
    let distribution = app.dashboard.distribution("CNY").await;
    assert!(distribution.filtered);
    let names: Vec<_> = distribution.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ACME", "Wallet"]);
    assert!(notifier.take().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_missing_rate_falls_back_to_identity_with_notice() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_utils::ASSETS))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/get_foreign_currency_rate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, notifier) = app_for(&mock_server.uri());
    app.load_assets().await.unwrap();

    let total = app.dashboard.total("CNY").await;
    assert_eq!(total, 300.0);
    assert_eq!(
        notifier.take(),
        vec![Notice::RateUnavailable {
            from: "USD".into(),
            to: "CNY".into()
        }]
    );
}

#[test_log::test(tokio::test)]
async fn test_move_sends_new_parent_and_reloads() {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock_server = test_utils::create_mock_backend("7.2").await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/assets/update"))
        .and(body_json(serde_json::json!({
            "id": "3", "userId": "alice", "belong_id": "4"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success": true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, _) = app_for(&mock_server.uri());
    let result = fintree::run_with_app(
        &app,
        AppCommand::Move {
            ids: vec!["3".into()],
            target: MoveTarget::Group("4".into()),
        },
    )
    .await;

    assert!(result.is_ok(), "Move failed with: {:?}", result.err());
    let requests = mock_server.received_requests().await.unwrap_or_default();
    let asset_fetches = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/assets/info")
        .count();
    // initial load plus the reload after the move
    assert_eq!(asset_fetches, 2);
}

#[test_log::test(tokio::test)]
async fn test_move_into_descendant_is_rejected_locally() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock_server = test_utils::create_mock_backend("7.2").await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/assets/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success": true}"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (app, _) = app_for(&mock_server.uri());
    app.load_assets().await.unwrap();
    let err = app
        .dashboard
        .move_node("1", &MoveTarget::Group("1".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::SelfMove { .. }));
}

#[test_log::test(tokio::test)]
async fn test_unreachable_backend_reports_disconnect() {
    let (app, notifier) = app_for("http://127.0.0.1:9");

    let result = fintree::run_with_app(&app, AppCommand::Tree).await;

    let err = result.expect_err("tree should fail without a backend");
    assert!(format!("{err:#}").contains("Failed to load assets"));
    assert!(app.dashboard.forest().await.is_empty());
    assert!(matches!(
        notifier.take().as_slice(),
        [Notice::Disconnected(_)]
    ));
}

#[test_log::test(tokio::test)]
async fn test_rates_command_warms_every_pair() {
    let mock_server = test_utils::create_mock_backend("0.5").await;
    let (app, _) = app_for(&mock_server.uri());

    fintree::run_with_app(&app, AppCommand::Rates).await.unwrap();

    let rates = app.rates.cached_rates().await;
    assert_eq!(
        rates,
        vec![("CNY-USD".to_string(), 0.5), ("USD-CNY".to_string(), 0.5)]
    );
}

#[test_log::test(tokio::test)]
async fn test_transactions_flow() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions"))
        .and(query_param("userId", "alice"))
        .and(query_param("page_index", "1"))
        .and(query_param("accountId", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"success": true, "data": [
                {"id": 7, "userId": "alice", "accountId": 2, "description": "buy",
                 "date": "2024-05-01", "direction": 0, "quantity": "10", "price": "15",
                 "currency": "USD"}
            ], "pagination": {"page_index": 1, "page_size": 20, "total_count": 21,
                "total_pages": 2, "has_next": false, "has_prev": true}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success": true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, _) = app_for(&mock_server.uri());

    fintree::run_with_app(
        &app,
        AppCommand::Transactions {
            account: Some("2".into()),
            page: 2,
        },
    )
    .await
    .unwrap();

    let valid = TransactionInput {
        account: "2".into(),
        direction: Direction::Outflow,
        quantity: 1.0,
        price: 21.0,
        currency: None,
        description: Some("trim".into()),
        date: None,
    };
    fintree::run_with_app(&app, AppCommand::Record(valid.clone()))
        .await
        .unwrap();

    // rejected before any request is made
    let invalid = TransactionInput {
        quantity: 0.0,
        ..valid
    };
    let err = fintree::run_with_app(&app, AppCommand::Record(invalid))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("quantity"));
}

#[test_log::test(tokio::test)]
async fn test_first_page_is_requested_by_default() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions"))
        .and(query_param("page_index", "0"))
        .and(query_param("page_size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success": true, "data": []}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, _) = app_for(&mock_server.uri());
    fintree::run_with_app(
        &app,
        AppCommand::Transactions {
            account: None,
            page: 1,
        },
    )
    .await
    .unwrap();
}

#[test_log::test(tokio::test)]
async fn test_delete_transaction_command() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/transactions/7"))
        .and(query_param("userId", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success": true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, _) = app_for(&mock_server.uri());
    fintree::run_with_app(&app, AppCommand::DeleteTransaction { id: "7".into() })
        .await
        .unwrap();

    let err = fintree::run_with_app(&app, AppCommand::DeleteTransaction { id: " ".into() })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");

    let result = fintree::run_command(AppCommand::Tree, missing.to_str()).await;

    let err = result.expect_err("missing config must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_setup_then_load() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");

    fintree::cli::setup::setup_at_path(&path).unwrap();
    let config = AppConfig::load_from_path(&path).unwrap();

    assert_eq!(config.user_id, "test_user_001");
    assert_eq!(config.supported_currencies, vec!["CNY", "USD", "HKD"]);
    assert!(fs::read_to_string(&path).unwrap().contains("refresh_interval_secs"));
}
