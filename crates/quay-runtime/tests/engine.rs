//! End-to-end tests driving a real engine over loopback TCP

use quay_config::EngineConfig;
use quay_core::prelude::*;
use quay_core::{Bytes, StatusCode};
use quay_runtime::{Engine, RuntimeState};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

fn config(threads: usize) -> EngineConfig {
    EngineConfig {
        address: "127.0.0.1".to_string(),
        port: 0,
        num_threads: threads,
        stack_size: 256 * 1024,
        ..Default::default()
    }
}

fn engine(threads: usize) -> Engine {
    let engine = Engine::create(config(threads)).unwrap();
    engine
        .router()
        .get("/hello", |_req: Request| -> Result<Response> {
            responses::ok().text("hello")
        })
        .unwrap();
    engine
        .router()
        .get("/boom", |_req: Request| -> Result<Response> {
            Err(Error::handler("boom"))
        })
        .unwrap();
    engine
}

fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(raw.as_bytes()).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn get(addr: SocketAddr, path: &str) -> String {
    send(addr, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"))
}

fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_create_then_immediate_shutdown() {
    for threads in [1, 2, 8] {
        let engine = Engine::create(config(threads)).unwrap();
        assert_eq!(engine.state(), RuntimeState::Running);

        engine.shutdown(Duration::ZERO);
        engine.run();

        assert!(engine.is_stopped());
        assert_eq!(engine.state(), RuntimeState::Stopped);

        let stats = engine.stats();
        assert_eq!(stats.workers_spawned, threads as u64);
        assert_eq!(stats.workers_exited, threads as u64);
        assert_eq!(stats.connections_accepted, 0);
    }
}

#[test]
fn test_run_returns_after_shutdown_from_other_thread() {
    let engine = Arc::new(engine(2));

    let stopper = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.shutdown(Duration::from_millis(50)))
    };

    engine.run();
    stopper.join().unwrap();
    assert!(engine.is_stopped());
}

#[test]
fn test_serves_requests() {
    let engine = engine(2);

    let response = get(engine.address(), "/hello");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("connection: close\r\n"));
    assert!(response.ends_with("hello"));

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_error_responses() {
    let engine = engine(2);
    let addr = engine.address();

    let response = get(addr, "/missing");
    assert_eq!(
        response,
        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
    );

    let response = send(addr, "DELETE /hello HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));

    let response = get(addr, "/boom");
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    // The failing handler did not take its worker down
    assert!(get(addr, "/hello").ends_with("hello"));

    let stats = engine.stats();
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.method_not_allowed, 1);
    assert_eq!(stats.internal_errors, 1);
    assert_eq!(stats.connections_served, 1);

    engine.shutdown(Duration::ZERO);
    assert_eq!(engine.stats().workers_exited, 2);
}

#[test]
fn test_catcher_replaces_default_response() {
    let engine = engine(1);
    engine
        .catchers()
        .register(StatusCode::NOT_FOUND, |_| Response::new(Bytes::from("custom")));

    let response = get(engine.address(), "/nowhere");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.ends_with("custom"));

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_zero_byte_connection_is_discarded() {
    let engine = engine(1);
    let addr = engine.address();

    drop(TcpStream::connect(addr).unwrap());

    // A single worker must survive the empty connection and serve the next one
    assert!(get(addr, "/hello").ends_with("hello"));
    assert!(eventually(|| engine.stats().connections_discarded == 1));

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_concurrent_clients() {
    const CLIENTS: usize = 32;

    for threads in [1, 4] {
        let engine = engine(threads);
        engine
            .router()
            .get("/u/:id", |req: Request| -> Result<Response> {
                let id = RequestContext::of(&req)
                    .and_then(|ctx| ctx.param("id"))
                    .unwrap_or("none")
                    .to_string();
                responses::ok().text(format!("user {id}"))
            })
            .unwrap();
        engine
            .router()
            .post("/echo", |req: Request| -> Result<Response> {
                responses::ok().bytes("application/octet-stream", req.into_body())
            })
            .unwrap();
        let addr = engine.address();

        let clients: Vec<_> = (0..CLIENTS)
            .map(|i| {
                thread::spawn(move || {
                    let user = get(addr, &format!("/u/{i}"));
                    let body = format!("payload-{i}-").repeat(i + 1);
                    let echo = send(
                        addr,
                        &format!(
                            "POST /echo HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
                            body.len()
                        ),
                    );
                    (i, user, body, echo)
                })
            })
            .collect();

        // Every response carries only its own client's data
        for client in clients {
            let (i, user, body, echo) = client.join().unwrap();
            assert!(user.ends_with(&format!("\r\n\r\nuser {i}")), "client {i}: {user}");
            assert!(echo.ends_with(&format!("\r\n\r\n{body}")), "client {i}: {echo}");
        }

        engine.shutdown(Duration::ZERO);
        assert_eq!(engine.stats().connections_served, 2 * CLIENTS as u64);
    }
}

#[test]
fn test_concurrent_shutdown_is_idempotent() {
    let engine = Arc::new(engine(4));

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.shutdown(Duration::ZERO))
        })
        .collect();

    for caller in callers {
        caller.join().unwrap();
    }

    assert!(engine.is_stopped());
    assert_eq!(engine.stats().workers_exited, 4);

    // Later calls return immediately
    engine.shutdown(Duration::ZERO);
    engine.wait();
}

#[test]
fn test_address_and_port_survive_shutdown() {
    let engine = engine(1);
    let addr = engine.address();
    let port = engine.port();

    assert_ne!(port, 0);
    assert_eq!(addr.port(), port);

    engine.shutdown(Duration::ZERO);

    assert_eq!(engine.address(), addr);
    assert_eq!(engine.port(), port);
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_bind_conflict() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = config(1);
    config.port = taken.local_addr().unwrap().port();

    assert!(matches!(Engine::create(config), Err(Error::Bind { .. })));
}

#[test]
fn test_middleware_applies_to_requests() {
    let engine = engine(1);

    engine.use_middleware([from_fn("server-header", |req, next: Next| {
        let mut res = next.run(req)?;
        res.headers_mut()
            .insert("server", http::HeaderValue::from_static("quay"));
        Ok(res)
    })]);

    let response = get(engine.address(), "/hello");
    assert!(response.contains("server: quay\r\n"));

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_middleware_from_router_and_engine_accumulates() {
    let engine = engine(1);

    engine
        .router()
        .use_middleware(from_fn("router-header", |req, next: Next| {
            let mut res = next.run(req)?;
            res.headers_mut()
                .insert("x-a", http::HeaderValue::from_static("router"));
            Ok(res)
        }));
    assert!(get(engine.address(), "/hello").contains("x-a: router\r\n"));

    engine.use_middleware([from_fn("engine-header", |req, next: Next| {
        let mut res = next.run(req)?;
        res.headers_mut()
            .insert("x-b", http::HeaderValue::from_static("engine"));
        Ok(res)
    })]);

    let response = get(engine.address(), "/hello");
    assert!(response.contains("x-a: router\r\n"));
    assert!(response.contains("x-b: engine\r\n"));
    assert_eq!(engine.router().middleware().len(), 2);

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_static_routes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.css"), "body {}").unwrap();

    let engine = engine(1);
    engine.static_dir("/public", dir.path()).unwrap();
    engine
        .static_file("/style", dir.path().join("style.css"))
        .unwrap();

    let response = get(engine.address(), "/public/style.css");
    assert!(response.contains("content-type: text/css\r\n"));
    assert!(response.ends_with("body {}"));

    assert!(get(engine.address(), "/style").ends_with("body {}"));
    assert!(get(engine.address(), "/public/nope.css").starts_with("HTTP/1.1 404"));

    engine.shutdown(Duration::ZERO);
}

#[test]
fn test_shutdown_from_handler() {
    let engine = Arc::new(engine(2));
    let slot: Arc<OnceLock<Weak<Engine>>> = Arc::new(OnceLock::new());
    let _ = slot.set(Arc::downgrade(&engine));

    let handler_slot = Arc::clone(&slot);
    engine
        .router()
        .post("/stop", move |_req: Request| -> Result<Response> {
            if let Some(engine) = handler_slot.get().and_then(Weak::upgrade) {
                engine.shutdown(Duration::ZERO);
            }
            responses::ok().text("stopping")
        })
        .unwrap();

    let response = send(engine.address(), "POST /stop HTTP/1.1\r\n\r\n");
    assert!(response.ends_with("stopping"));

    assert!(engine.wait_timeout(Duration::from_secs(10)));
    assert!(engine.is_stopped());
}

#[test]
fn test_drop_stops_workers() {
    let engine = engine(3);
    let addr = engine.address();
    drop(engine);

    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_engine_from_built_config() {
    let config = quay_config::ConfigBuilder::new()
        .address("127.0.0.1")
        .port(0)
        .threads(2)
        .stack_size(256 * 1024)
        .buffers(512, 2048, 4096)
        .read_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let engine = Engine::create(config.engine).unwrap();
    engine
        .router()
        .post("/echo", |req: Request| -> Result<Response> {
            responses::ok().bytes("application/octet-stream", req.into_body())
        })
        .unwrap();

    // Body larger than the initial read still arrives whole
    let body = "x".repeat(1500);
    let response = send(
        engine.address(),
        &format!("POST /echo HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}", body.len()),
    );
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(&body));

    // Declared body over the limit is rejected before it is read
    let response = send(
        engine.address(),
        "POST /echo HTTP/1.1\r\nContent-Length: 5000\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    engine.shutdown(Duration::ZERO);
}
