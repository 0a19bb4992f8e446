/// Integration tests for the SMS client with a mocked gateway
use bdn_api::errors::ApiError;
use bdn_api::models::{BulkSms, Sender, SingleSms};
use bdn_api::{Credentials, SmsClient};
use chrono::{DateTime, Utc};
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(server: &MockServer) -> SmsClient {
    SmsClient::new(server.uri(), Credentials::new("test_key", "test_account")).unwrap()
}

fn fixed_send_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_send_single_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Rpc/Single/Send"))
        .and(header("x-bdn-key", "test_key"))
        .and(header("x-bdn-account", "test_account"))
        .and(body_json(json!({
            "PhoneNumber": "+4790000000",
            "Message": "Hei!",
            "From": 2262
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client
        .send_single(&SingleSms::new("+4790000000", "Hei!"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_send_single_with_named_sender() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Rpc/Single/Send"))
        .and(body_json(json!({
            "PhoneNumber": "+4790000000",
            "Message": "Hei!",
            "From": "Netlife"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    client
        .send_single(&SingleSms::new("+4790000000", "Hei!").sender(Sender::Name("Netlife".into())))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_single_rejected_is_remote_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid phone number"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .send_single(&SingleSms::new("abc", "Hei!"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::RemoteFailure(_)));
}

#[tokio::test]
async fn test_send_bulk_dedups_and_returns_shipment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Rpc/Bulk/Send"))
        .and(body_json(json!({
            "Template": { "MessageTemplate": "Heihei :)", "From": 2262 },
            "Recipients": "MOBILE\n+4790000001\n+4790000002",
            "RecipientsPhoneColumnName": "MOBILE",
            "SendTime": "2024-05-01T08:00:00.000Z"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ShipmentId": "shp-1001" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let bulk = BulkSms::new(
        vec![
            "+4790000001".to_string(),
            "+4790000002".to_string(),
            "+4790000001".to_string(),
        ],
        "Heihei :)",
    )
    .send_at(fixed_send_time());

    let client = create_test_client(&mock_server);
    let shipment_id = client.send_bulk(&bulk).await.unwrap();

    assert_eq!(shipment_id, "shp-1001");
}

#[tokio::test]
async fn test_send_bulk_numeric_shipment_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Rpc/Bulk/Send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentId": 5511 })))
        .mount(&mock_server)
        .await;

    let bulk = BulkSms::new(vec!["+4790000001".to_string()], "Hei").keep_duplicates();

    let client = create_test_client(&mock_server);
    assert_eq!(client.send_bulk(&bulk).await.unwrap(), "5511");
}

#[tokio::test]
async fn test_send_bulk_without_recipients_issues_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);

    let err = client
        .send_bulk(&BulkSms::new(vec![], "Hei"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    let err = client
        .send_bulk(&BulkSms::new(vec!["+4790000001".to_string()], ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_get_shipment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Rpc/Report/GetShipment"))
        .and(query_param("shipmentId", "shp-1001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ShipmentId": "shp-1001", "Delivered": 2, "Failed": 0 })),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let shipment = client.get_shipment("shp-1001").await.unwrap();

    assert_eq!(shipment["Delivered"], json!(2));
}

#[tokio::test]
async fn test_unauthorized_sms_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert!(matches!(
        client.get_shipment("shp-1001").await,
        Err(ApiError::Unauthorized(_))
    ));

    let anonymous = SmsClient::new(mock_server.uri(), Credentials::default()).unwrap();
    assert!(matches!(
        anonymous.get_shipment("").await,
        Err(ApiError::Unauthorized(_))
    ));
}
