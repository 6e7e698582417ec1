use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

use super::{check_quality, check_resolution, DeviceControl};
use crate::error::AppError;

/// Parses and normalises the camera module's base address.
pub fn parse_device_url(raw: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(raw)
        .map_err(|e| AppError::Config(format!("invalid device address '{}': {}", raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Config(format!(
            "device address '{}' must use http or https",
            raw
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::Config(format!("device address '{}' has no host", raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reads the `gpio_state` field of a `/gpio_read` response.
pub fn parse_presence(body: &Value) -> Result<bool, AppError> {
    match body.get("gpio_state") {
        Some(Value::Bool(state)) => Ok(*state),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(other) => Err(AppError::DeviceResponse(format!(
            "gpio_state has unexpected value {}",
            other
        ))),
        None => Err(AppError::DeviceResponse(
            "gpio_state missing from response".to_string(),
        )),
    }
}

/// HTTP client for the camera module. One pooled connection serves every command.
#[derive(Debug, Clone)]
pub struct EspCamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EspCamClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = parse_device_url(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn control_url(&self, var: &str, val: impl Display) -> Result<Url, AppError> {
        let mut url = self.endpoint("control")?;
        url.query_pairs_mut()
            .append_pair("var", var)
            .append_pair("val", &val.to_string());
        Ok(url)
    }

    /// Address of the MJPEG stream, served on its own port.
    pub fn stream_url(&self, port: u16) -> Result<Url, AppError> {
        let mut url = self.endpoint("stream")?;
        url.set_port(Some(port))
            .map_err(|_| AppError::Config(format!("cannot set stream port on {}", url)))?;
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid endpoint '{}': {}", path, e)))
    }

    async fn send_control(&self, var: &str, val: impl Display) -> Result<(), AppError> {
        let url = self.control_url(var, val)?;
        debug!("GET {}", url);
        self.http.get(url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl DeviceControl for EspCamClient {
    async fn set_resolution(&self, index: u8) -> Result<(), AppError> {
        check_resolution(index)?;
        self.send_control("framesize", index).await
    }

    async fn set_quality(&self, quality: u8) -> Result<(), AppError> {
        check_quality(quality)?;
        self.send_control("quality", quality).await
    }

    async fn set_auto_white_balance(&self, enabled: bool) -> Result<(), AppError> {
        self.send_control("awb", u8::from(enabled)).await
    }

    async fn set_illumination(&self, intensity: u8) -> Result<(), AppError> {
        self.send_control("led_intensity", intensity).await
    }

    async fn set_digital_output(&self, pin: u8, high: bool) -> Result<(), AppError> {
        self.send_control(&format!("gpio_{}", pin), u8::from(high))
            .await
    }

    async fn read_presence(&self) -> Result<bool, AppError> {
        let url = self.endpoint("gpio_read")?;
        let body: Value = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_presence(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single canned response and hands back the request line.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let text = String::from_utf8_lossy(&request).to_string();
            text.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn client(base: &str) -> EspCamClient {
        EspCamClient::new(base, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn control_urls_follow_camera_api() {
        let client = client("http://192.168.4.1");
        assert_eq!(
            client.control_url("gpio_14", 1).unwrap().as_str(),
            "http://192.168.4.1/control?var=gpio_14&val=1"
        );
        assert_eq!(
            client.stream_url(81).unwrap().as_str(),
            "http://192.168.4.1:81/stream"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let client = client("http://10.0.0.7/cam");
        assert_eq!(
            client.control_url("quality", 12).unwrap().as_str(),
            "http://10.0.0.7/cam/control?var=quality&val=12"
        );
    }

    #[test]
    fn bad_addresses_are_configuration_errors() {
        assert!(matches!(parse_device_url("not a url"), Err(AppError::Config(_))));
        assert!(matches!(parse_device_url("ftp://camera"), Err(AppError::Config(_))));
    }

    #[test]
    fn presence_accepts_booleans_and_numbers() {
        assert!(parse_presence(&json!({"gpio_state": 1})).unwrap());
        assert!(parse_presence(&json!({"gpio_state": true})).unwrap());
        assert!(!parse_presence(&json!({"gpio_state": 0})).unwrap());
        assert!(parse_presence(&json!({"gpio_state": "high"})).is_err());
        assert!(parse_presence(&json!({})).is_err());
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_any_request() {
        // nothing listens on the discard port; validation must fail first
        let client = client("http://127.0.0.1:9");
        assert!(matches!(
            client.set_resolution(2).await,
            Err(AppError::InvalidCommand(_))
        ));
        assert!(matches!(
            client.set_quality(70).await,
            Err(AppError::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    async fn digital_output_hits_gpio_control() {
        let (base, server) = one_shot_server("200 OK", "{}").await;
        client(&base).set_digital_output(13, true).await.unwrap();
        let request_line = server.await.unwrap();
        assert_eq!(request_line, "GET /control?var=gpio_13&val=1 HTTP/1.1");
    }

    #[tokio::test]
    async fn presence_is_read_from_json() {
        let (base, server) = one_shot_server("200 OK", r#"{"gpio_state":1}"#).await;
        assert!(client(&base).read_presence().await.unwrap());
        assert!(server.await.unwrap().starts_with("GET /gpio_read"));
    }

    #[tokio::test]
    async fn http_errors_surface_as_device_errors() {
        let (base, server) = one_shot_server("500 Internal Server Error", "{}").await;
        let result = client(&base).set_illumination(150).await;
        assert!(matches!(result, Err(AppError::Device(_))));
        server.await.unwrap();
    }
}
