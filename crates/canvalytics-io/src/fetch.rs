use std::io::Read;
use std::time::Duration;

use tracing::debug;

use crate::config::LoadConfig;
use crate::error::{LoadError, LoadResult};

fn agent(config: &LoadConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
}

/// Read a response into memory, enforcing a maximum byte size.
fn read_response_bytes(response: ureq::Response, max_bytes: usize) -> LoadResult<Vec<u8>> {
    if let Some(length) = response
        .header("Content-Length")
        .and_then(|l| l.parse::<u64>().ok())
    {
        if length > max_bytes as u64 {
            return Err(LoadError::FetchError(format!("response too large: {length} bytes")));
        }
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| LoadError::FetchError(format!("reading response body: {e}")))?;
    if bytes.len() > max_bytes {
        return Err(LoadError::FetchError(format!("response exceeded {max_bytes} bytes")));
    }
    Ok(bytes)
}

/// GET `url` with bounded timeouts and body size. Non-2xx statuses fail.
pub fn fetch_bytes(url: &str, config: &LoadConfig) -> LoadResult<Vec<u8>> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(LoadError::FetchError(format!("'{url}' is not an http(s) URL")));
    }
    debug!(url, "fetching dataset");
    let response = agent(config).get(url).call().map_err(|e| match e {
        ureq::Error::Status(code, _) => LoadError::FetchError(format!("{url} returned HTTP {code}")),
        ureq::Error::Transport(t) => LoadError::FetchError(format!("{url} is unreachable: {t}")),
    })?;
    if !(200..300).contains(&response.status()) {
        return Err(LoadError::FetchError(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }
    read_response_bytes(response, config.max_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = fetch_bytes("file:///etc/passwd", &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::FetchError(_)));
    }

    #[test]
    fn test_unreachable_host() {
        let config = LoadConfig {
            connect_timeout_secs: 1,
            fetch_timeout_secs: 1,
            ..LoadConfig::default()
        };
        // port 9 on localhost is the discard service, normally closed
        let err = fetch_bytes("http://127.0.0.1:9/data.csv", &config).unwrap_err();
        assert!(matches!(err, LoadError::FetchError(_)));
    }
}
