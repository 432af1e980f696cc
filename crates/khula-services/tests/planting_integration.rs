//! End-to-end planting calendar tests against mock provider and advisor
//! endpoints.
//!
//! One mock server stands in for OpenWeatherMap, another for Gemini; the
//! stores live in a temp directory. This exercises the full composition:
//! cached weather -> market context -> advisor -> persisted calendar.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use khula_advisor::AdvisorClient;
use khula_services::{
    CalendarEntry, MarketService, PlantingError, PlantingService, SqliteMarketStore,
    SqliteScheduleStore,
};
use khula_weather::{OpenWeatherProvider, SqliteWeatherStore, SystemClock, WeatherService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_current_body() -> serde_json::Value {
    serde_json::json!({
        "main": { "temp": 24.0, "feels_like": 25.0, "humidity": 55.0, "pressure": 1013.0 },
        "weather": [ { "id": 800 } ],
        "wind": { "speed": 3.0, "deg": 120.0 }
    })
}

fn advisor_text(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

async fn mock_weather_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_current_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })))
        .mount(&server)
        .await;
    server
}

fn planting_service(
    weather_server: &MockServer,
    advisor_server: &MockServer,
    dir: &std::path::Path,
) -> PlantingService {
    let db_path = dir.join("khula.db");

    let advisor = Arc::new(
        AdvisorClient::new(
            &advisor_server.uri(),
            Some("test-key".to_string()),
            "gemini-1.5-flash",
        )
        .unwrap(),
    );
    let provider = Arc::new(
        OpenWeatherProvider::new(
            &weather_server.uri(),
            Some("weather-key".to_string()),
            Duration::from_secs(5),
            7,
        )
        .unwrap(),
    );
    let clock = Arc::new(SystemClock);

    let weather = Arc::new(WeatherService::new(
        provider,
        Box::new(SqliteWeatherStore::new(&db_path).unwrap()),
        advisor.clone(),
        clock.clone(),
    ));
    let market = Arc::new(MarketService::new(
        SqliteMarketStore::new(&db_path).unwrap(),
        advisor.clone(),
        30,
    ));

    PlantingService::new(
        weather,
        market,
        advisor,
        SqliteScheduleStore::new(&db_path).unwrap(),
        clock,
    )
}

#[tokio::test]
async fn test_schedule_combines_weather_market_and_advisor() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(advisor_text("Plant mid-October after soil temperature holds 15°C.")),
        )
        .mount(&advisor_server)
        .await;

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let schedule = service
        .schedule("maize", "Bloemfontein", Some(12.0))
        .await
        .unwrap();

    assert_eq!(schedule.crop, "maize");
    assert_eq!(schedule.location, "Bloemfontein");
    assert_eq!(schedule.plot_size_ha, Some(12.0));
    assert_eq!(schedule.growing_days, 120);
    let summary = schedule.weather_summary.unwrap();
    assert_eq!(summary.temperature, 24.0);
    // Market analysis and schedule text both come from the mock advisor.
    assert!(schedule.market_outlook.is_some());
    assert!(schedule.recommendations.contains("mid-October"));
}

#[tokio::test]
async fn test_schedule_survives_market_outage() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // The first advisor call (market analysis) fails; the second (schedule)
    // succeeds. Market context is best-effort.
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&advisor_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(advisor_text("Plant in spring.")))
        .mount(&advisor_server)
        .await;

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let schedule = service.schedule("wheat", "Cape Town", None).await.unwrap();
    assert!(schedule.market_outlook.is_none());
    assert_eq!(schedule.recommendations, "Plant in spring.");
}

#[tokio::test]
async fn test_unknown_crop_fails_before_any_network_call() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let err = service.schedule("bananas", "Durban", None).await.unwrap_err();
    assert!(matches!(err, PlantingError::UnknownCrop(_)));
    assert!(advisor_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_location_propagates_weather_error() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let err = service.schedule("maize", "Gotham", None).await.unwrap_err();
    assert!(matches!(err, PlantingError::Weather(_)));
}

#[tokio::test]
async fn test_create_calendar_persists_per_user() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(advisor_text("Stagger plantings.")))
        .mount(&advisor_server)
        .await;

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let entries = vec![
        CalendarEntry {
            crop: "maize".to_string(),
            location: "Bloemfontein".to_string(),
            plot_size_ha: Some(10.0),
        },
        CalendarEntry {
            crop: "sunflower".to_string(),
            location: "Upington".to_string(),
            plot_size_ha: None,
        },
    ];

    let calendar = service.create_calendar("farmer-1", &entries).await.unwrap();
    assert_eq!(calendar.crops.len(), 2);

    let saved = service.calendars_for_user("farmer-1").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, calendar.id);
    assert_eq!(saved[0].crops[1].crop, "sunflower");

    assert!(service.calendars_for_user("farmer-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_monthly_tasks_validates_month() {
    let weather_server = mock_weather_server().await;
    let advisor_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let service = planting_service(&weather_server, &advisor_server, dir.path());

    let err = service
        .monthly_tasks(13, "Durban", &["maize".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, PlantingError::InvalidMonth(13)));
}
