use actix_web::{http::StatusCode, test};
use ito_insight::create_base_app;
use serde_json::{Value, json};

const ZABBIX_EXPORT: &str = "Time,Host,Severity,Status,Problem,Duration\n\
    2024-05-01 09:10:00,web-01,Disaster,PROBLEM,Disk full on /var,1h\n\
    2024-05-01 09:40:00,web-01,Warning,OK,CPU load high,30m\n\
    2024-05-02 14:00:00,db-01,Warning,PROBLEM,Disk full on /var,\n\
    2024-05-03 09:00:00,web-02,Information,OK,Agent restarted,2h 15m\n";

const LOCALIZED_EXPORT: &str = "발생시간,호스트,심각도,상태,설명,지속시간\n\
    2024-05-03 10:00:00,db-02,High,PROBLEM,Replication lag,45m\n\
    2024-05-03 11:00:00,db-02,Average,PROBLEM,Replication lag,5m\n";

fn request(sources: &[(&str, &str)]) -> Value {
    let sources: Vec<Value> = sources
        .iter()
        .map(|(name, content)| json!({ "name": name, "content": content }))
        .collect();
    json!({ "sources": sources })
}

#[actix_web::test]
async fn test_analyze_merges_sources_and_aliases() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/analyze")
        .set_json(request(&[
            ("zabbix.csv", ZABBIX_EXPORT),
            ("localized.csv", LOCALIZED_EXPORT),
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = test::read_body_json(resp).await;
    let stats = &json["statistics"];
    assert_eq!(stats["total_events"], 6);
    assert_eq!(stats["severity"]["critical"], 2);
    assert_eq!(stats["severity"]["warning"], 3);
    assert_eq!(stats["severity"]["informational"], 1);
    assert_eq!(stats["severity"]["unclassified"], 0);
    assert_eq!(stats["hosts"]["distinct_hosts"], 4);
    assert_eq!(stats["hosts"]["top_hosts"][0]["label"], "web-01");
    assert_eq!(stats["time"]["hourly"].as_array().unwrap().len(), 24);
    assert_eq!(stats["top_descriptions"][0]["label"], "Disk full on /var");
    assert_eq!(json["sources"].as_array().unwrap().len(), 2);
    assert!(json["rejected"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_analyze_drops_duplicate_upload() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/analyze")
        .set_json(request(&[("a.csv", ZABBIX_EXPORT), ("copy.csv", ZABBIX_EXPORT)]))
        .to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(json["statistics"]["total_events"], 4);
    assert_eq!(json["rejected"][0]["name"], "copy.csv");
}

#[actix_web::test]
async fn test_analyze_applies_request_options() {
    let app = test::init_service(create_base_app()).await;

    let mut body = request(&[("zabbix.csv", ZABBIX_EXPORT)]);
    body["options"] = json!({
        "top_hosts": 1,
        "locale": "ko",
        "severity_overrides": { "information": "critical" }
    });
    let req = test::TestRequest::post()
        .uri("/api/events/analyze")
        .set_json(body)
        .to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;

    let stats = &json["statistics"];
    assert_eq!(stats["hosts"]["top_hosts"].as_array().unwrap().len(), 1);
    assert_eq!(stats["severity"]["critical"], 2);
    assert_eq!(stats["durations"]["average"], "1시간 15분");
}

#[actix_web::test]
async fn test_analyze_without_sources_is_bad_request() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/analyze")
        .set_json(json!({ "sources": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_report_download() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/report")
        .set_json(request(&[("zabbix.csv", ZABBIX_EXPORT)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );

    let body = test::read_body(resp).await;
    let report = std::str::from_utf8(&body).unwrap();
    assert!(report.starts_with("ITO Event Report"));
    assert!(report.contains("## Top Issues"));
    assert!(report.contains("- Average duration: 1h 15m"));
}

#[actix_web::test]
async fn test_summary_download() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/summary")
        .set_json(request(&[("zabbix.csv", ZABBIX_EXPORT)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let csv = std::str::from_utf8(&body).unwrap();
    let mut lines = csv.trim_start_matches('\u{feff}').lines();
    assert_eq!(lines.next(), Some("Item,Value,Share"));
    assert_eq!(lines.next(), Some("Total events,4,-"));
    assert!(csv.contains("Critical,1,25.0%"));
}

#[actix_web::test]
async fn test_narrative_requires_internal_access() {
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/narrative")
        .peer_addr("203.0.113.1:40000".parse().unwrap())
        .insert_header(("X-Forwarded-For", "127.0.0.1"))
        .set_json(request(&[("zabbix.csv", ZABBIX_EXPORT)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_narrative_with_internal_key() {
    unsafe {
        std::env::set_var("INTERNAL_API_KEY", "test-key");
    }
    let app = test::init_service(create_base_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/events/narrative")
        .insert_header(("X-Internal-API-Key", "test-key"))
        .set_json(request(&[("zabbix.csv", ZABBIX_EXPORT)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = test::read_body_json(resp).await;
    assert!(!json["narrative"].as_str().unwrap().is_empty());
    assert_eq!(json["statistics"]["total_events"], 4);
    assert!(json["metadata"]["payload_bytes"].as_u64().unwrap() <= 16 * 1024);
}
