//! HttpGateway against a mock gateway server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront::gateway::{GatewayError, HttpGateway, PaymentGateway, PaymentMetadata, PaymentRequest, VerifyRequest};

fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::with_client(
        reqwest::Client::new(),
        &format!("{}/pg/v4/payment/request.json", server.uri()),
        &format!("{}/pg/v4/payment/verify.json", server.uri()),
    )
}

fn payment_request() -> PaymentRequest {
    PaymentRequest {
        merchant_id: "merchant-test".into(),
        amount: 200,
        callback_url: "http://localhost:8083/api/v1/payment/callback".into(),
        currency: "IRT".into(),
        description: "Order payment".into(),
        metadata: PaymentMetadata { email: "sara@example.com".into(), order_id: "order-1".into() },
    }
}

fn verify_request() -> VerifyRequest {
    VerifyRequest { merchant_id: "merchant-test".into(), amount: 200, authority: "A0000012345".into() }
}

#[tokio::test]
async fn test_request_payment_returns_authority() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/request.json"))
        .and(header("accept", "application/json"))
        .and(body_partial_json(json!({
            "merchant_id": "merchant-test",
            "amount": 200,
            "currency": "IRT",
            "metadata": { "email": "sara@example.com", "order_id": "order-1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "code": 100, "message": "Success", "authority": "A0000012345", "fee_type": "Merchant", "fee": 0 },
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authority = gateway(&server).request_payment(&payment_request()).await.unwrap();
    assert_eq!(authority.as_str(), "A0000012345");
}

#[tokio::test]
async fn test_request_payment_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/request.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "data": [],
            "errors": { "code": -9, "message": "The input params invalid, validation error.", "validations": [] }
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).request_payment(&payment_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(-9)));
}

#[tokio::test]
async fn test_request_payment_missing_authority() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/request.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "code": 100 }, "errors": [] })))
        .mount(&server)
        .await;

    let err = gateway(&server).request_payment(&payment_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
}

#[tokio::test]
async fn test_request_payment_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/request.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = gateway(&server).request_payment(&payment_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status(503)));
}

#[tokio::test]
async fn test_verify_payment_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/verify.json"))
        .and(body_partial_json(json!({ "merchant_id": "merchant-test", "amount": 200, "authority": "A0000012345" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "code": 101, "message": "Verified", "ref_id": 201, "card_pan": "502229******5995" },
            "errors": []
        })))
        .mount(&server)
        .await;

    let verification = gateway(&server).verify_payment(&verify_request()).await.unwrap();
    assert_eq!(verification.code, 101);
    assert_eq!(verification.ref_id, Some(201));
    assert!(verification.is_accepted());
    assert!(verification.is_replay());
}

#[tokio::test]
async fn test_verify_payment_error_code_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/verify.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "data": [],
            "errors": { "code": -51, "message": "Session is not valid, session is not active paid try.", "validations": [] }
        })))
        .mount(&server)
        .await;

    let verification = gateway(&server).verify_payment(&verify_request()).await.unwrap();
    assert_eq!(verification.code, -51);
    assert!(!verification.is_accepted());
}

#[tokio::test]
async fn test_verify_payment_without_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pg/v4/payment/verify.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "errors": [] })))
        .mount(&server)
        .await;

    let err = gateway(&server).verify_payment(&verify_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
}
