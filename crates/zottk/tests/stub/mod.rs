//! A minimal in-process HTTP/1.1 server standing in for the Zotero web API.
//!
//! Every connection serves one request and is closed. Requests are recorded so tests can
//! check what the client sent.

use std::sync::Arc;

use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::{TcpListener, TcpStream},
  sync::Mutex,
};

/// A request as received by the stub.
#[derive(Debug, Clone)]
pub struct Request {
  pub method:  String,
  /// Path and query, e.g. `/users/1/collections?start=0`
  pub target:  String,
  pub headers: Vec<(String, String)>,
  pub body:    Vec<u8>,
}

impl Request {
  pub fn path(&self) -> &str { self.target.split('?').next().unwrap_or_default() }

  pub fn query(&self, key: &str) -> Option<&str> {
    let (_, query) = self.target.split_once('?')?;
    query
      .split('&')
      .filter_map(|pair| pair.split_once('='))
      .find(|(k, _)| *k == key)
      .map(|(_, value)| value)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
  }
}

/// A response to send back.
#[derive(Debug, Clone)]
pub struct Reply {
  pub status:  u16,
  pub headers: Vec<(String, String)>,
  pub body:    Vec<u8>,
}

impl Reply {
  pub fn json(value: serde_json::Value) -> Self {
    Self {
      status:  200,
      headers: vec![("Content-Type".into(), "application/json".into())],
      body:    value.to_string().into_bytes(),
    }
  }

  pub fn bytes(content_type: &str, body: Vec<u8>) -> Self {
    Self { status: 200, headers: vec![("Content-Type".into(), content_type.into())], body }
  }

  pub fn status(status: u16) -> Self { Self { status, headers: vec![], body: vec![] } }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }
}

type Handler = dyn Fn(&Request) -> Reply + Send + Sync;

pub struct StubServer {
  /// Base URL, e.g. `http://127.0.0.1:38017`
  pub url:  String,
  requests: Arc<Mutex<Vec<Request>>>,
}

impl StubServer {
  /// Binds to an ephemeral local port and serves `handler` until the runtime shuts down.
  pub async fn start(handler: impl Fn(&Request) -> Reply + Send + Sync + 'static) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler: Arc<Handler> = Arc::new(handler);

    let recorded = Arc::clone(&requests);
    tokio::spawn(async move {
      while let Ok((socket, _)) = listener.accept().await {
        let handler = Arc::clone(&handler);
        let recorded = Arc::clone(&recorded);
        tokio::spawn(async move { serve(socket, handler.as_ref(), &recorded).await });
      }
    });

    Self { url, requests }
  }

  /// Requests received so far, in arrival order.
  pub async fn requests(&self) -> Vec<Request> { self.requests.lock().await.clone() }
}

async fn serve(
  mut socket: TcpStream,
  handler: &Handler,
  recorded: &Mutex<Vec<Request>>,
) -> Option<()> {
  let mut buffer = Vec::new();
  let header_end = loop {
    let mut chunk = [0; 4096];
    let read = socket.read(&mut chunk).await.ok()?;
    if read == 0 {
      return None;
    }
    buffer.extend_from_slice(&chunk[..read]);
    if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
      break end;
    }
  };

  let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
  let mut lines = head.lines();
  let mut request_line = lines.next()?.split_whitespace();
  let method = request_line.next()?.to_string();
  let target = request_line.next()?.to_string();
  let headers: Vec<(String, String)> = lines
    .filter_map(|line| line.split_once(':'))
    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
    .collect();

  let content_length = headers
    .iter()
    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
    .and_then(|(_, value)| value.parse::<usize>().ok())
    .unwrap_or(0);
  let mut body = buffer[header_end + 4..].to_vec();
  while body.len() < content_length {
    let mut chunk = [0; 4096];
    let read = socket.read(&mut chunk).await.ok()?;
    if read == 0 {
      break;
    }
    body.extend_from_slice(&chunk[..read]);
  }

  let request = Request { method, target, headers, body };
  let reply = handler(&request);
  recorded.lock().await.push(request);

  let mut response = format!("HTTP/1.1 {} Stub\r\n", reply.status);
  for (name, value) in &reply.headers {
    response.push_str(&format!("{name}: {value}\r\n"));
  }
  response.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", reply.body.len()));
  let mut bytes = response.into_bytes();
  bytes.extend_from_slice(&reply.body);
  socket.write_all(&bytes).await.ok()?;
  socket.shutdown().await.ok()
}
