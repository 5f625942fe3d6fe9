mod common;

use common::{json_reply, refused_url, StubServer};
use std::thread;
use std::time::Duration;
use ussd_simulator::api::{ApiClient, Transport, UssdResponse};
use ussd_simulator::config::{Scenario, SimConfig};
use ussd_simulator::runner::{ScenarioReport, ScriptObserver, ScriptedRunner};
use ussd_simulator::session::Session;

fn config_for(server: &StubServer) -> SimConfig {
    SimConfig {
        api_url: server.url("/api/ussd"),
        health_url: server.url("/health"),
        step_delay: Duration::ZERO,
        input_delay: Duration::ZERO,
        ..SimConfig::default()
    }
}

struct Silent;

impl ScriptObserver for Silent {
    fn started(&mut self, _scenario: &Scenario, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }

    fn step(&mut self, _scenario: &Scenario, _current: &UssdResponse, _step: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn finished(&mut self, _scenario: &Scenario, _report: &ScenarioReport) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn submit_posts_the_four_form_fields() {
    let server = StubServer::start(|_| json_reply("Registration\nEnter your full name:", false));
    let api = ApiClient::new(&config_for(&server)).unwrap();

    let resp = api.submit("1*John Doe", "SIM_1700000000_4242_0", "+254712345678");

    assert_eq!(resp.message, "Registration\nEnter your full name:");
    assert!(!resp.end_session);

    let reqs = server.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].method, "POST");
    assert_eq!(reqs[0].path, "/api/ussd");
    let form = &reqs[0].form;
    assert_eq!(form["SessionId"], "SIM_1700000000_4242_0");
    assert_eq!(form["PhoneNumber"], "+254712345678");
    assert_eq!(form["Text"], "1*John Doe");
    assert_eq!(form["ServiceCode"], "*123#");
}

#[test]
fn initial_dial_sends_empty_text() {
    let server = StubServer::start(|_| json_reply("Welcome", false));
    let api = ApiClient::new(&config_for(&server)).unwrap();

    api.submit("", "SIM_1_1000_0", "+254712345678");

    let reqs = server.requests();
    assert_eq!(reqs[0].form.get("Text").map(String::as_str), Some(""));
}

#[test]
fn server_error_status_ends_session() {
    let server = StubServer::start(|_| (500, "boom".to_string()));
    let api = ApiClient::new(&config_for(&server)).unwrap();

    let resp = api.submit("", "SIM_1_1000_0", "+254712345678");

    assert!(resp.end_session);
    assert_eq!(resp.message, "Error: Server returned status 500");
}

#[test]
fn non_ok_success_status_also_ends_session() {
    let server = StubServer::start(|_| (201, "created".to_string()));
    let api = ApiClient::new(&config_for(&server)).unwrap();

    let resp = api.submit("", "SIM_1_1000_0", "+254712345678");

    assert!(resp.end_session);
    assert!(resp.message.contains("201"));
}

#[test]
fn refused_connection_ends_session() {
    let config = SimConfig {
        api_url: refused_url(),
        ..SimConfig::default()
    };
    let api = ApiClient::new(&config).unwrap();

    let resp = api.submit("", "SIM_1_1000_0", "+254712345678");

    assert!(resp.end_session);
    assert!(resp.message.contains("Cannot connect"), "{}", resp.message);
}

#[test]
fn malformed_body_ends_session() {
    let server = StubServer::start(|_| (200, r#"{"msg":"wrong shape"}"#.to_string()));
    let api = ApiClient::new(&config_for(&server)).unwrap();

    let resp = api.submit("", "SIM_1_1000_0", "+254712345678");

    assert!(resp.end_session);
    assert!(
        resp.message.starts_with("Error: Invalid response from server"),
        "{}",
        resp.message
    );
}

#[test]
fn slow_server_hits_request_timeout() {
    let server = StubServer::start(|_| {
        thread::sleep(Duration::from_secs(3));
        json_reply("too late", false)
    });
    let config = SimConfig {
        request_timeout: Some(Duration::from_secs(1)),
        ..config_for(&server)
    };
    let api = ApiClient::new(&config).unwrap();

    let resp = api.submit("", "SIM_1_1000_0", "+254712345678");

    assert!(resp.end_session);
    assert_eq!(resp.message, "Error: Request timed out after 1s");
}

#[test]
fn health_check_passes_on_200() {
    let server = StubServer::start(|req| {
        if req.path == "/health" {
            (200, r#"{"status":"Healthy"}"#.to_string())
        } else {
            (404, String::new())
        }
    });
    let api = ApiClient::new(&config_for(&server)).unwrap();

    assert!(api.health_check());
    let reqs = server.requests();
    assert_eq!(reqs[0].method, "GET");
    assert_eq!(reqs[0].path, "/health");
}

#[test]
fn health_check_fails_on_error_status() {
    let server = StubServer::start(|_| (503, String::new()));
    let api = ApiClient::new(&config_for(&server)).unwrap();
    assert!(!api.health_check());
}

#[test]
fn health_check_fails_when_unreachable() {
    let config = SimConfig {
        health_url: refused_url(),
        ..SimConfig::default()
    };
    let api = ApiClient::new(&config).unwrap();
    assert!(!api.health_check());
}

#[test]
fn health_check_uses_short_timeout() {
    let server = StubServer::start(|_| {
        thread::sleep(Duration::from_secs(2));
        (200, String::new())
    });
    let config = SimConfig {
        health_timeout: Duration::from_millis(200),
        ..config_for(&server)
    };
    let api = ApiClient::new(&config).unwrap();
    assert!(!api.health_check());
}

#[test]
fn registration_scenario_over_http() {
    let server = StubServer::start(|req| {
        let text = req.form.get("Text").cloned().unwrap_or_default();
        if text == "1*John Doe*12345678*1990-05-15" {
            json_reply("Registration successful!", true)
        } else {
            json_reply(&format!("Step for '{text}'"), false)
        }
    });
    let config = config_for(&server);
    let api = ApiClient::new(&config).unwrap();

    let report = ScriptedRunner::new(&api, &config)
        .run(&config.scenarios[0], &mut Silent)
        .unwrap();

    assert_eq!(
        server.texts(),
        [
            "",
            "1",
            "1*John Doe",
            "1*John Doe*12345678",
            "1*John Doe*12345678*1990-05-15"
        ]
    );
    let reqs = server.requests();
    assert!(reqs
        .iter()
        .all(|r| r.form["SessionId"] == report.session_id));
    assert!(report.completed);
    assert_eq!(report.final_response, UssdResponse::ended("Registration successful!"));
}

#[test]
fn scenario_against_dead_server_stops_after_dial() {
    let config = SimConfig {
        api_url: refused_url(),
        step_delay: Duration::ZERO,
        ..SimConfig::default()
    };
    let api = ApiClient::new(&config).unwrap();

    let report = ScriptedRunner::new(&api, &config)
        .run(&config.scenarios[0], &mut Silent)
        .unwrap();

    assert!(report.submitted.is_empty());
    assert!(!report.completed);
    assert!(report.final_response.message.contains("Cannot connect"));
}
