/// Integration tests for the record-linking client with a mocked remote
use bdn_api::errors::ApiError;
use bdn_api::models::{MultiSearch, SearchCriteria, SingleSearch};
use bdn_api::{Credentials, RecordLinkingClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(server: &MockServer) -> RecordLinkingClient {
    RecordLinkingClient::new(server.uri(), Credentials::new("test_key", "test_account")).unwrap()
}

fn ola() -> SearchCriteria {
    SearchCriteria {
        first_name: Some("Ola".to_string()),
        last_name: Some("Nordmann".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_get_multi_converts_keys() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Multi/20"))
        .and(query_param("FirstName", "Ola"))
        .and(query_param("LastName", "Nordmann"))
        .and(header("x-bdn-key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FirstName": "Ola", "LastName": "Nordmann", "ZipCode": "0150" },
            { "FirstName": "Ola", "LastName": "Nordmann", "ZipCode": "5003" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let records = client.get_multi(&MultiSearch::new(ola())).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("firstName"), Some(&json!("Ola")));
    assert_eq!(records[1].get("zipCode"), Some(&json!("5003")));
    assert!(records[0].get("FirstName").is_none());
}

#[tokio::test]
async fn test_get_multi_fulltext_and_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Multi/5"))
        .and(query_param("Fulltext", "Ola Nordmann Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let search = SearchCriteria {
        fulltext: Some("Ola Nordmann Oslo".to_string()),
        ..ola()
    };

    let client = create_test_client(&mock_server);
    let records = client
        .get_multi(&MultiSearch::new(search).max_results(5))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_get_multi_requires_criteria() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    let err = client
        .get_multi(&MultiSearch::new(SearchCriteria::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_get_single_resolves_one_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Multi/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FirstName": "Ola", "LastName": "Nordmann", "City": "Oslo", "Mobile": "" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Single/1"))
        .and(query_param(
            "ContactFields",
            "KrId,Phone,Mobile,FirstName,MiddleName,LastName,StreetName,StreetNumber,StreetLetter,StreetZipCode,StreetCity,Age,Gender",
        ))
        .and(query_param("FirstName", "Ola"))
        .and(query_param("LastName", "Nordmann"))
        .and(query_param("City", "Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "KrId": "K-1",
            "FirstName": "Ola",
            "StreetCity": "Oslo",
            "Age": 41
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let record = client
        .get_single(&SingleSearch::new(ola()).wash_degree(1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.get("krId"), Some(&json!("K-1")));
    assert_eq!(record.get("streetCity"), Some(&json!("Oslo")));
    assert_eq!(record.get("age"), Some(&json!(41)));
}

#[tokio::test]
async fn test_get_single_ambiguous_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Multi/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "FirstName": "Ola" },
            { "FirstName": "Ola" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Single/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .get_single(&SingleSearch::new(ola()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_get_single_no_match_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Multi/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let record = client.get_single(&SingleSearch::new(ola())).await.unwrap();

    assert!(record.is_none());
}

#[tokio::test]
async fn test_remote_error_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client.get_multi(&MultiSearch::new(ola())).await.unwrap_err();

    assert!(matches!(err, ApiError::RemoteFailure(_)));
}
