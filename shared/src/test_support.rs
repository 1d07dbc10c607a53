//! Local HTTP stub standing in for Google and Twilio in tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::secrets::ServiceAccountKey;

/// Throwaway RSA key, only ever used to sign assertions sent to the stub.
pub const TEST_PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");

/// Canned reply for requests whose path starts with `prefix`.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub prefix: &'static str,
    pub status: u16,
    pub body: &'static str,
}

/// Serve `routes` on an ephemeral port and return the base URL.
/// Unmatched paths get a 404.
pub async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|r| path.starts_with(r.prefix))
                    .map(|r| (r.status, r.body))
                    .unwrap_or((404, "{}"));

                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Read one full request (headers plus `content-length` body).
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Service-account key whose token endpoint is the stub at `base_url`.
pub fn stub_service_account(base_url: &str) -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: "rsvp@project.iam.gserviceaccount.com".to_string(),
        private_key: TEST_PRIVATE_KEY.to_string(),
        token_uri: format!("{}/token", base_url),
    }
}
