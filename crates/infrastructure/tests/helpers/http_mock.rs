use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Scripted answer for one path. `head_status` lets a path answer HEAD and
/// GET differently.
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub location: Option<String>,
    pub head_status: Option<u16>,
}

impl Route {
    pub fn ok() -> Self {
        Self::status(200)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            location: None,
            head_status: None,
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            location: Some(location.to_string()),
            head_status: None,
        }
    }

    pub fn head_then_get(head_status: u16, get_status: u16) -> Self {
        Self {
            status: get_status,
            location: None,
            head_status: Some(head_status),
        }
    }
}

/// Minimal scripted HTTP/1.1 responder. Every response closes its
/// connection, so each hop arrives on a fresh accept.
pub struct MockHttpServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    accept_task: JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start(routes: HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let accept_task = tokio::spawn(accept_loop(listener, Arc::new(routes), requests.clone()));

        Self {
            addr,
            requests,
            accept_task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// `(method, path)` pairs in arrival order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    routes: Arc<HashMap<String, Route>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
) {
    loop {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(handle_connection(socket, routes.clone(), requests.clone()));
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    routes: Arc<HashMap<String, Route>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let mut parts = request.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return;
    };
    requests
        .lock()
        .unwrap()
        .push((method.to_string(), path.to_string()));

    let response = match routes.get(path) {
        Some(route) => {
            let status = match method {
                "HEAD" => route.head_status.unwrap_or(route.status),
                _ => route.status,
            };
            let mut response = format!("HTTP/1.1 {status} MockReply\r\n");
            if let Some(location) = &route.location {
                response.push_str(&format!("Location: {location}\r\n"));
            }
            response.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");
            response
        }
        None => "HTTP/1.1 404 MockReply\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string(),
    };

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
