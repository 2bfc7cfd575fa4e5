//! Test utilities for aura-core
//!
//! This module provides testing infrastructure including a mock Ollama server
//! and record fixtures that can be used for development and integration tests.

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

use crate::ai::ChatTurn;
use crate::models::{HealthSnapshot, MenstrualPhase, Record, Trigger, WeatherSnapshot};

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/api/chat", post(handle_chat));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    // These patterns match the prompt files in prompts/*.md
    let response = if request.prompt.contains("Pain level") {
        "Your logged short sleep and low hydration may have contributed to this migraine. \
         Consider tracking water intake on similar days. \
         This is not medical advice; please consult a healthcare professional."
            .to_string()
    } else if request.prompt.contains("Insight:") {
        "This pattern suggests a factor worth watching. This is not medical advice.".to_string()
    } else {
        "I can only comment on your migraine log. This is not medical advice.".to_string()
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
}

/// Ollama chat endpoint; replies with how much history it was sent
async fn handle_chat(Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    let last = request
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    Json(ChatResponse {
        model: request.model,
        message: ChatTurn::assistant(format!(
            "Received {} messages. You said: {}",
            request.messages.len(),
            last
        )),
        done: true,
    })
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[allow(dead_code)]
    #[serde(default)]
    system: Option<String>,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatTurn>,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    model: String,
    message: ChatTurn,
    done: bool,
}

/// Fixed reference instant so window arithmetic is reproducible
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

/// `fixed_now()` minus whole days
pub fn days_ago(days: i64) -> DateTime<Utc> {
    fixed_now() - Duration::days(days)
}

/// A realistic log that triggers most analyzers: a rising recent window,
/// recurring stress, low hydration, and low-pressure days with worse pain.
pub fn sample_records() -> Vec<Record> {
    let weather = |pressure: f64, humidity: f64, temp: f64| WeatherSnapshot {
        pressure_hpa: pressure,
        temperature_celsius: temp,
        humidity_percent: humidity,
        condition: "cloudy".to_string(),
    };
    let health = |water: f64, sleep: f64, phase: MenstrualPhase| HealthSnapshot {
        water_liters: Some(water),
        sleep_hours: Some(sleep),
        caffeine_mg: Some(180.0),
        menstrual_phase: Some(phase),
        ..Default::default()
    };

    vec![
        Record::new(1, days_ago(1), 8, 7)
            .with_end(days_ago(1) + Duration::hours(6))
            .with_trigger(Trigger::Stress)
            .with_trigger(Trigger::LackOfSleep)
            .with_food("chocolate")
            .with_health(health(0.9, 5.5, MenstrualPhase::Menstrual))
            .with_weather(weather(1004.0, 82.0, 3.0))
            .with_note("Woke up with it"),
        Record::new(2, days_ago(3), 7, 6)
            .with_end(days_ago(3) + Duration::hours(5))
            .with_trigger(Trigger::Stress)
            .with_custom_trigger("perfume")
            .with_health(health(1.0, 6.0, MenstrualPhase::Menstrual))
            .with_weather(weather(1006.0, 75.0, 8.0)),
        Record::new(3, days_ago(5), 6, 5)
            .with_end(days_ago(5) + Duration::hours(4))
            .with_trigger(Trigger::Caffeine)
            .with_food("cheese")
            .with_health(health(1.1, 6.5, MenstrualPhase::Follicular))
            .with_weather(weather(1008.0, 65.0, 12.0)),
        Record::new(4, days_ago(8), 4, 3)
            .with_end(days_ago(8) + Duration::hours(3))
            .with_trigger(Trigger::Stress)
            .with_food("chocolate")
            .with_health(health(1.4, 7.5, MenstrualPhase::Follicular))
            .with_weather(weather(1015.0, 50.0, 15.0)),
        Record::new(5, days_ago(12), 3, 2)
            .with_trigger(Trigger::BrightLight)
            .with_health(health(1.2, 8.0, MenstrualPhase::Luteal))
            .with_weather(weather(1018.0, 45.0, 30.0)),
        Record::new(6, days_ago(20), 5, 4)
            .with_end(days_ago(20) + Duration::hours(2))
            .with_trigger(Trigger::Stress)
            .with_health(health(1.8, 7.0, MenstrualPhase::Luteal))
            .with_weather(weather(1016.0, 55.0, 14.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Generate<'a> {
        model: &'a str,
        prompt: &'a str,
        stream: bool,
    }

    #[tokio::test]
    async fn test_mock_server_tags() {
        let server = MockOllamaServer::start().await;
        let resp = reqwest::get(format!("{}/api/tags", server.url()))
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_mock_server_generate_record_prompt() {
        let server = MockOllamaServer::start().await;
        let body: serde_json::Value = reqwest::Client::new()
            .post(format!("{}/api/generate", server.url()))
            .json(&Generate {
                model: "test-model",
                prompt: "Pain level: 8/10",
                stream: false,
            })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let text = body["response"].as_str().unwrap();
        assert!(text.contains("not medical advice"));
        assert_eq!(body["model"], "test-model");
    }

    #[test]
    fn test_fixtures_are_stable() {
        assert_eq!(fixed_now(), fixed_now());
        assert_eq!(fixed_now() - days_ago(14), Duration::days(14));
        let records = sample_records();
        assert!(records.iter().all(|r| r.validate().is_ok()));
        assert!(records.iter().all(|r| r.start_date <= fixed_now()));
    }
}
