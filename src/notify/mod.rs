use std::time::Duration;

/// Best-effort publisher of the present-names list to an external endpoint.
/// Failures are returned to the caller, which logs and drops them; nothing
/// here is retried and nothing propagates into the engine.
pub struct Notifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl Notifier {
    pub fn new(url: String, api_key: Option<String>) -> Result<Notifier, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build notify client: {}", e))?;

        Ok(Notifier {
            client,
            url,
            api_key,
        })
    }

    pub async fn publish(&self, names: &[String]) -> Result<(), String> {
        let users: Vec<serde_json::Value> = names
            .iter()
            .map(|name| serde_json::json!({ "username": name }))
            .collect();
        let body = serde_json::json!({ "users": users });

        let mut request = self.client.put(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("notify request error: {}", e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(format!("notify endpoint returned {}", status));
        }
        Ok(())
    }
}
