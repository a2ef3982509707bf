use mailcheck_bench::{
    api::{http::HttpVerifyApi, ApiError, VerifyApi},
    clock::ManualClock,
    config::Config,
    model::{ExpectedCategory, JobStatus, TestCase},
    poll::poll_error_message,
    runner::JobRunner,
    submit::submit,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Request line and body as received by the local server.
#[derive(Debug)]
struct Seen {
    line: String,
    body: String,
}

/// Serve the canned `(status, body)` replies in order, one connection each.
fn serve(replies: Vec<(u16, &'static str)>) -> (Config, JoinHandle<Vec<Seen>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (code, body) in replies {
            let (stream, _) = listener.accept().unwrap();
            seen.push(answer(stream, code, body));
        }
        seen
    });

    let mut cfg = Config::default();
    cfg.api.base_url = format!("http://{addr}");
    (cfg, handle)
}

fn answer(stream: TcpStream, code: u16, body: &str) -> Seen {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut req_body = vec![0u8; content_length];
    reader.read_exact(&mut req_body).unwrap();

    let mut stream = reader.into_inner();
    write!(
        stream,
        "HTTP/1.1 {code} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .unwrap();
    stream.flush().unwrap();

    Seen {
        line: line.trim_end().to_string(),
        body: String::from_utf8(req_body).unwrap(),
    }
}

#[test]
fn created_with_job_id_is_accepted() {
    let (cfg, server) = serve(vec![(201, r#"{"jobId":"j-1"}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();
    let clock = ManualClock::new();

    let sub = submit(&api, &clock, "a@example.com");
    assert_eq!(sub.job_id.as_deref(), Some("j-1"));
    assert!(sub.error.is_none());

    let seen = server.join().unwrap();
    assert_eq!(seen[0].line, "POST /api/verify HTTP/1.1");
    assert_eq!(seen[0].body, r#"["a@example.com"]"#);
}

#[test]
fn created_without_job_id_is_a_submission_error() {
    let (cfg, server) = serve(vec![(201, r#"{"id":"x"}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let sub = submit(&api, &ManualClock::new(), "a@example.com");
    assert!(sub.job_id.is_none());
    assert_eq!(sub.error.as_deref(), Some("Unexpected error: response has no jobId"));
    server.join().unwrap();
}

#[test]
fn submit_requires_created_status() {
    let (cfg, server) = serve(vec![(200, r#"{"jobId":"j"}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let sub = submit(&api, &ManualClock::new(), "a@example.com");
    assert!(sub.job_id.is_none());
    assert_eq!(sub.error.as_deref(), Some(r#"API returned 200: {"jobId":"j"}"#));
    server.join().unwrap();
}

#[test]
fn refused_port_is_connection_error() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let mut cfg = Config::default();
    cfg.api.base_url = format!("http://127.0.0.1:{port}");
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let sub = submit(&api, &ManualClock::new(), "a@example.com");
    assert_eq!(sub.error.as_deref(), Some("Connection error - is the API running?"));
}

#[test]
fn slow_service_hits_submit_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(800));
        drop(stream);
    });

    let mut cfg = Config::default();
    cfg.api.base_url = format!("http://{addr}");
    cfg.api.submit_timeout_ms = 100;
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let sub = submit(&api, &ManualClock::new(), "a@example.com");
    assert_eq!(sub.error.as_deref(), Some("API request timeout"));
    server.join().unwrap();
}

#[test]
fn empty_checks_decode_as_pending_view() {
    let (cfg, server) = serve(vec![(200, r#"{"id":"j-1","emailChecks":[]}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let view = api.job_status("j-1").unwrap();
    assert!(view.first_check().is_none());

    let seen = server.join().unwrap();
    assert_eq!(seen[0].line, "GET /api/job/j-1 HTTP/1.1");
}

#[test]
fn job_status_requires_ok() {
    let (cfg, server) = serve(vec![(404, r#"{"error":"no such job"}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let err = api.job_status("missing").unwrap_err();
    assert!(matches!(err, ApiError::Status { code: 404, .. }));
    assert_eq!(poll_error_message(&err), "Job status API returned 404");
    server.join().unwrap();
}

#[test]
fn null_status_is_a_malformed_body() {
    let (cfg, server) = serve(vec![(200, r#"{"emailChecks":[{"email":"a@example.com","status":null}]}"#)]);
    let api = HttpVerifyApi::new(&cfg).unwrap();

    let err = api.job_status("j-1").unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
    assert!(poll_error_message(&err).starts_with("Polling error: "));
    server.join().unwrap();
}

#[test]
fn full_job_over_http() {
    let (cfg, server) = serve(vec![
        (201, r#"{"jobId":"j-7"}"#),
        (200, r#"{"emailChecks":[]}"#),
        (200, r#"{"emailChecks":[{"email":"a@example.com","status":"PENDING"}]}"#),
        (
            200,
            r#"{"emailChecks":[{"email":"a@example.com","status":"VALID","smtpCode":250,"bounceReason":null}]}"#,
        ),
    ]);
    let api = HttpVerifyApi::new(&cfg).unwrap();
    let clock = ManualClock::new();

    let r = JobRunner::new(&api, &clock, &cfg).run(&TestCase::new("a@example.com", ExpectedCategory::Valid, "corp"));

    assert!(r.error.is_none(), "unexpected error: {:?}", r.error);
    assert_eq!(r.job_id.as_deref(), Some("j-7"));
    assert_eq!(r.observed_status, Some(JobStatus::Valid));
    assert_eq!(r.smtp_code, Some(250));
    assert_eq!(r.matches_expected, Some(true));
    assert_eq!(r.poll_count, 3);

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen[1..].iter().all(|s| s.line == "GET /api/job/j-7 HTTP/1.1"));
}
